//! Lexical scope for template expressions.
//!
//! Scope is a value, not state: it is passed down the transform
//! recursion and extended by constructing a new value, never mutated in
//! place. This keeps the transformer reentrant and makes it impossible
//! for a deep recursion to leak bindings into a sibling subtree.

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::builtins::is_template_global;

/// An immutable ordered collection of locally bound identifier names.
///
/// A name in scope resolves as-is in the synthetic program; a free name
/// outside the scope (and outside the template-global allowlist) is
/// rewritten to an instance member access.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    names: SmallVec<[CompactString; 8]>,
}

impl Scope {
    /// The empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// A root scope seeded with configured extra globals (plugin
    /// instance members like `$t` that templates may use freely).
    pub fn root<I, S>(extra_globals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<CompactString>,
    {
        Self {
            names: extra_globals.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `name` is bound in this scope.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Whether `name` resolves without rewriting: locally bound or a
    /// template global.
    pub fn resolves(&self, name: &str) -> bool {
        self.contains(name) || is_template_global(name)
    }

    /// A new scope with `names` appended. The receiver is unchanged.
    pub fn extended<I, S>(&self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<CompactString>,
    {
        let mut next = self.clone();
        next.names.extend(names.into_iter().map(Into::into));
        next
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_persistent() {
        let outer = Scope::new();
        let inner = outer.extended(["item", "index"]);

        assert!(!outer.contains("item"));
        assert!(inner.contains("item"));
        assert!(inner.contains("index"));
        assert!(!inner.contains("other"));
    }

    #[test]
    fn binder_shadows_nothing_outside_its_scope() {
        let outer = Scope::new();
        let loop_scope = outer.extended(["item"]);
        let sibling = outer.extended(["other"]);

        assert!(loop_scope.contains("item"));
        assert!(!sibling.contains("item"));
    }

    #[test]
    fn resolves_includes_globals() {
        let scope = Scope::new();
        assert!(scope.resolves("Math"));
        assert!(!scope.resolves("msg"));
        assert!(scope.extended(["msg"]).resolves("msg"));
    }

    #[test]
    fn root_seeds_extra_globals() {
        let scope = Scope::root(["$t", "$route"]);
        assert!(scope.resolves("$t"));
        assert!(scope.resolves("$route"));
        assert!(!scope.resolves("$store"));
    }
}
