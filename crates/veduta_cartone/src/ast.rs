//! Template AST node types.
//!
//! The tree an SFC parser produces for a template block. Every node
//! carries a `[start, end)` byte range into the template buffer; raw
//! script operands are referenced by range (`ScriptExpression`) and
//! sliced from the buffer when the transform needs their text.
//!
//! The variant sets here are closed: the interpolation transform
//! dispatches on them exhaustively, with no downcasting or duck typing.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::source_range::SourceRange;

/// Root of a parsed template block.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRoot {
    pub children: Vec<Node>,
    pub range: SourceRange,
}

/// A template child node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    ExpressionContainer(ExpressionContainer),
    Text(Text),
}

impl Node {
    pub fn range(&self) -> SourceRange {
        match self {
            Node::Element(e) => e.range,
            Node::ExpressionContainer(c) => c.range,
            Node::Text(t) => t.range,
        }
    }
}

/// An element node.
///
/// `local_variables` are the names the element introduces for its own
/// attribute expressions and subtree: iteration binders and scoped-slot
/// props, as recorded by the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: CompactString,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
    pub local_variables: Vec<CompactString>,
    pub range: SourceRange,
}

/// A `{{ ... }}` interpolation. The expression is `None` when the
/// container is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionContainer {
    pub expression: Option<ScriptExpression>,
    pub range: SourceRange,
}

/// Static text between elements and interpolations.
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub value: CompactString,
    pub range: SourceRange,
}

/// An attribute on an element: plain markup or a directive.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Plain(PlainAttribute),
    Directive(Directive),
}

impl Attribute {
    pub fn range(&self) -> SourceRange {
        match self {
            Attribute::Plain(a) => a.range,
            Attribute::Directive(d) => d.range,
        }
    }
}

/// A plain (non-directive) attribute. `value` is `None` for bare
/// boolean-style attributes (`<input disabled>`).
#[derive(Debug, Clone, PartialEq)]
pub struct PlainAttribute {
    pub name: CompactString,
    pub value: Option<CompactString>,
    pub range: SourceRange,
}

/// A directive attribute (`v-bind:x`, `@click`, `v-for`, ...), already
/// split by the parser into name, argument, and value.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    /// Canonical directive name: `bind`, `on`, `for`, `slot`, ... with
    /// shorthand (`:x`, `@x`) already resolved by the parser.
    pub name: CompactString,
    pub argument: Option<DirectiveArgument>,
    pub value: Option<DirectiveValue>,
    pub range: SourceRange,
}

impl Directive {
    /// Classify the directive by name.
    pub fn kind(&self) -> DirectiveKind {
        DirectiveKind::from_name(&self.name)
    }
}

/// Directive classification, derived from the directive name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DirectiveKind {
    /// One-way binding (`v-bind` / `:`).
    Bind,
    /// Event listener (`v-on` / `@`).
    On,
    /// Iteration (`v-for`).
    For,
    /// Named slot outlet.
    Slot,
    /// Scoped slot binder (legacy syntax).
    SlotScope,
    /// Any other directive (`v-if`, `v-model`, custom directives, ...).
    Other,
}

impl DirectiveKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "bind" => Self::Bind,
            "on" => Self::On,
            "for" => Self::For,
            "slot" => Self::Slot,
            "slot-scope" => Self::SlotScope,
            _ => Self::Other,
        }
    }
}

/// A directive argument: the `x` in `v-bind:x` or the `[k]` in
/// `v-bind:[k]`.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveArgument {
    Static {
        name: CompactString,
        range: SourceRange,
    },
    Dynamic {
        /// `None` when the brackets are empty (`v-bind:[]`).
        expression: Option<ScriptExpression>,
        range: SourceRange,
    },
}

/// A directive value.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveValue {
    /// A single script expression.
    Expression(ScriptExpression),
    /// An `item in items` iteration clause.
    Iteration(IterationExpression),
    /// A statement sequence in an event handler position.
    HandlerBody(EventHandlerBody),
}

/// The `(item, index) in source` clause of an iteration directive.
/// `left` holds the binder patterns, each a raw pattern substring.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationExpression {
    pub left: Vec<ScriptExpression>,
    pub right: ScriptExpression,
    pub range: SourceRange,
}

/// An event handler written as statements rather than a single
/// expression. Each entry is one statement's raw substring.
#[derive(Debug, Clone, PartialEq)]
pub struct EventHandlerBody {
    pub statements: Vec<ScriptExpression>,
    pub range: SourceRange,
}

/// A raw user-authored script substring, referenced by its range in the
/// template buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptExpression {
    pub range: SourceRange,
}

impl ScriptExpression {
    pub const fn new(range: SourceRange) -> Self {
        Self { range }
    }

    /// The expression's text in `source`.
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        self.range.text(source)
    }
}
