//! Per-revision validation pipeline.
//!
//! The core runs inside a single-threaded language-server event loop;
//! everything here is synchronous. For each template document the
//! checker keeps one shadow document (same logical path plus a fixed
//! suffix) whose contents are the latest transform result. Validation
//! is: transform → push the shadow to the checker session → pull
//! semantic diagnostics → map them back. Cancellation is cooperative:
//! the revision is re-checked at the two yield points, and a superseded
//! request returns `None` instead of stale diagnostics.

use compact_str::CompactString;
use rustc_hash::FxHashMap;
use thiserror::Error;
use veduta_cartone::TemplateRoot;

use crate::diagnostic::{map_diagnostics, RawDiagnostic, TemplateDiagnostic};
use crate::transform::{transform_template, TransformOptions, TransformOutput};

/// Suffix appended to a template document's path to name its shadow.
pub const SHADOW_SUFFIX: &str = ".template.ts";

/// The shadow document path for a template document path.
pub fn shadow_path(path: &str) -> String {
    let mut shadow = String::with_capacity(path.len() + SHADOW_SUFFIX.len());
    shadow.push_str(path);
    shadow.push_str(SHADOW_SUFFIX);
    shadow
}

/// Failure at the downstream checker seam. Transform and mapping never
/// fail; only the session round-trip can.
#[derive(Debug, Error)]
pub enum CheckError {
    /// The checker session rejected or lost the shadow document.
    #[error("shadow document sync failed: {0}")]
    Sync(String),
    /// The checker session failed to produce diagnostics.
    #[error("checker session failure: {0}")]
    Session(String),
}

/// The seam to the long-lived downstream type-checker session.
///
/// Implementations must only ever produce *semantic* diagnostics;
/// syntactic ones are filtered again defensively by the mapper, but a
/// session that reports them is in violation of this contract.
pub trait CheckerSession {
    /// Make the session's view of `path` match `code` exactly.
    fn sync_shadow(&mut self, path: &str, code: &str) -> Result<(), CheckError>;

    /// Semantic diagnostics for the shadow document at `path`.
    fn semantic_diagnostics(&mut self, path: &str) -> Result<Vec<RawDiagnostic>, CheckError>;
}

/// A template text-document snapshot: the template block text with
/// preserved original offsets, plus the editor's version counter.
#[derive(Debug, Clone)]
pub struct TemplateDocument {
    pub path: CompactString,
    pub version: i32,
    pub text: String,
}

#[derive(Debug)]
struct ShadowState {
    version: i32,
    output: TransformOutput,
}

/// Drives validation for a set of template documents against one
/// checker session.
#[derive(Debug, Default)]
pub struct TemplateChecker {
    options: TransformOptions,
    shadows: FxHashMap<CompactString, ShadowState>,
}

impl TemplateChecker {
    pub fn new(options: TransformOptions) -> Self {
        Self {
            options,
            shadows: FxHashMap::default(),
        }
    }

    /// The cached transform output for `path`, with its revision.
    pub fn cached(&self, path: &str) -> Option<(i32, &TransformOutput)> {
        self.shadows
            .get(path)
            .map(|state| (state.version, &state.output))
    }

    /// Drop the shadow state for a closed document.
    pub fn evict(&mut self, path: &str) {
        self.shadows.remove(path);
    }

    /// Transform `doc`, reusing the cached result when the revision is
    /// unchanged. The whole structure is recomputed on any text change;
    /// there is no incremental state between revisions.
    pub fn transform(&mut self, doc: &TemplateDocument, root: &TemplateRoot) -> TransformOutput {
        if let Some(state) = self.shadows.get(doc.path.as_str()) {
            if state.version == doc.version {
                return state.output.clone();
            }
        }
        let output = transform_template(&doc.text, root, &self.options);
        self.shadows.insert(
            doc.path.clone(),
            ShadowState {
                version: doc.version,
                output: output.clone(),
            },
        );
        output
    }

    /// Run one validation request to completion.
    ///
    /// `latest_version` reports the newest known revision of the
    /// document; when it has moved past `doc.version`, the in-flight
    /// request is abandoned at the next yield point and `Ok(None)` is
    /// returned.
    pub fn validate<S, F>(
        &mut self,
        session: &mut S,
        doc: &TemplateDocument,
        root: &TemplateRoot,
        latest_version: F,
    ) -> Result<Option<Vec<TemplateDiagnostic>>, CheckError>
    where
        S: CheckerSession,
        F: Fn(&str) -> i32,
    {
        let output = self.transform(doc, root);

        // Yield point: between transform and the checker request.
        if latest_version(doc.path.as_str()) != doc.version {
            tracing::debug!(path = doc.path.as_str(), version = doc.version, "superseded before check");
            return Ok(None);
        }

        let shadow = shadow_path(doc.path.as_str());
        session.sync_shadow(&shadow, &output.code)?;
        let raw = session.semantic_diagnostics(&shadow)?;

        // Yield point: between the checker round-trip and mapping.
        if latest_version(doc.path.as_str()) != doc.version {
            tracing::debug!(path = doc.path.as_str(), version = doc.version, "superseded after check");
            return Ok(None);
        }

        Ok(Some(map_diagnostics(
            raw,
            &output.source_map,
            doc.text.len() as u32,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veduta_cartone::{ExpressionContainer, Node, ScriptExpression, SourceRange};

    /// A scripted stand-in for the downstream checker session.
    #[derive(Default)]
    struct ScriptedSession {
        synced: Vec<(String, String)>,
        diagnostics: Vec<RawDiagnostic>,
    }

    impl CheckerSession for ScriptedSession {
        fn sync_shadow(&mut self, path: &str, code: &str) -> Result<(), CheckError> {
            self.synced.push((path.to_string(), code.to_string()));
            Ok(())
        }

        fn semantic_diagnostics(&mut self, _path: &str) -> Result<Vec<RawDiagnostic>, CheckError> {
            Ok(self.diagnostics.clone())
        }
    }

    fn doc(version: i32, text: &str) -> TemplateDocument {
        TemplateDocument {
            path: "component.sfc".into(),
            version,
            text: text.to_string(),
        }
    }

    fn interpolation_root(source: &str, needle: &str) -> TemplateRoot {
        let start = source.find(needle).unwrap() as u32;
        let range = SourceRange::new(start, start + needle.len() as u32);
        TemplateRoot {
            children: vec![Node::ExpressionContainer(ExpressionContainer {
                expression: Some(ScriptExpression::new(range)),
                range,
            })],
            range: SourceRange::new(0, source.len() as u32),
        }
    }

    #[test]
    fn shadow_path_appends_suffix() {
        assert_eq!(shadow_path("a/b.sfc"), "a/b.sfc.template.ts");
    }

    #[test]
    fn validate_syncs_shadow_and_maps_diagnostics() {
        let source = "{{ msg }}";
        let document = doc(1, source);
        let root = interpolation_root(source, "msg");

        let mut checker = TemplateChecker::default();
        let mut session = ScriptedSession::default();

        // Seed the session with an error on the rewritten identifier.
        let output = checker.transform(&document, &root);
        let ident = output.code.find("msg").unwrap() as u32;
        session.diagnostics = vec![RawDiagnostic::semantic_error(
            SourceRange::new(ident, ident + 3),
            2339,
            "Property 'msg' does not exist on type 'Component'.",
        )];

        let diags = checker
            .validate(&mut session, &document, &root, |_| 1)
            .unwrap()
            .unwrap();

        assert_eq!(session.synced.len(), 1);
        assert_eq!(session.synced[0].0, "component.sfc.template.ts");
        assert!(session.synced[0].1.contains("this.msg"));

        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].range, SourceRange::new(3, 6));
    }

    #[test]
    fn superseded_request_is_abandoned_before_sync() {
        let source = "{{ msg }}";
        let document = doc(1, source);
        let root = interpolation_root(source, "msg");

        let mut checker = TemplateChecker::default();
        let mut session = ScriptedSession::default();

        let result = checker
            .validate(&mut session, &document, &root, |_| 2)
            .unwrap();

        assert!(result.is_none());
        assert!(session.synced.is_empty());
    }

    #[test]
    fn transform_is_cached_per_revision() {
        let source = "{{ msg }}";
        let document = doc(1, source);
        let root = interpolation_root(source, "msg");

        let mut checker = TemplateChecker::default();
        let first = checker.transform(&document, &root);
        assert_eq!(checker.cached("component.sfc").unwrap().0, 1);

        // Same revision: cached output is reused as-is.
        let second = checker.transform(&document, &root);
        assert_eq!(first.code, second.code);

        // New revision: recomputed.
        let source2 = "{{ other }}";
        let document2 = doc(2, source2);
        let root2 = interpolation_root(source2, "other");
        let third = checker.transform(&document2, &root2);
        assert!(third.code.contains("this.other"));
        assert_eq!(checker.cached("component.sfc").unwrap().0, 2);
    }

    #[test]
    fn evict_drops_cached_state() {
        let source = "{{ msg }}";
        let document = doc(1, source);
        let root = interpolation_root(source, "msg");

        let mut checker = TemplateChecker::default();
        checker.transform(&document, &root);
        assert!(checker.cached("component.sfc").is_some());

        checker.evict("component.sfc");
        assert!(checker.cached("component.sfc").is_none());
    }
}
