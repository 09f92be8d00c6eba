//! Template-to-synthetic-program lowering.
//!
//! Walks the template AST and emits one synthetic TypeScript expression
//! per template construct, wired together through the reserved helper
//! calls:
//!
//! ```text
//! <div :title="msg">{{ count }}</div>
//! ```
//!
//! becomes
//!
//! ```text
//! __vlsRenderHelper(this, [
//!   __vlsComponentHelper("div", { props: { "title": this.msg }, on: {}, directives: [] }, [
//!     (this.count),
//!   ]),
//! ]);
//! ```
//!
//! Iteration wraps the element call in `__vlsIterationHelper(source,
//! (binders) => ...)` so the loop binders enter scope through ordinary
//! arrow parameters; statement-bodied listeners become
//! `__vlsListenerHelper(this, function ($event: Event) { ... })` so
//! `this` and `$event` resolve inside the body. Every user-authored
//! operand passes through the scope-injecting rewrite and lands in the
//! source map.

use compact_str::CompactString;
use serde::Deserialize;
use veduta_cartone::{
    Attribute, Directive, DirectiveArgument, DirectiveKind, DirectiveValue, Element,
    IterationExpression, Node, PlainAttribute, ScriptExpression, SourceRange, TemplateRoot,
};

use crate::builtins::{COMPONENT_HELPER, EVENT_LOCALS, ITERATION_HELPER, LISTENER_HELPER, RENDER_HELPER};
use crate::rewrite::{emit_expression, pattern_bindings};
use crate::scope::Scope;
use crate::source_map::InterpolationSourceMap;
use crate::synth::SynthBuffer;

/// Transform configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransformOptions {
    /// Additional names resolvable in templates without instance
    /// rewriting, e.g. `$t` from an i18n plugin or `$route` from a
    /// router.
    pub extra_globals: Vec<CompactString>,
}

/// A transformed template revision.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    /// The synthetic TypeScript program.
    pub code: String,
    /// Synthetic-range → template-range side table.
    pub source_map: InterpolationSourceMap,
}

/// Lower a parsed template into its synthetic program.
pub fn transform_template(
    source: &str,
    root: &TemplateRoot,
    options: &TransformOptions,
) -> TransformOutput {
    let scope = Scope::root(options.extra_globals.iter().cloned());
    let mut buf = SynthBuffer::new();

    buf.raw(RENDER_HELPER);
    buf.raw("(this, [");
    if root.children.is_empty() {
        buf.raw("]);\n");
    } else {
        buf.raw("\n");
        for child in &root.children {
            buf.raw("  ");
            emit_node(&mut buf, source, child, &scope, 1);
            buf.raw(",\n");
        }
        buf.raw("]);\n");
    }

    let (code, source_map) = buf.finish();
    TransformOutput { code, source_map }
}

fn emit_node(buf: &mut SynthBuffer, source: &str, node: &Node, scope: &Scope, depth: usize) {
    match node {
        Node::Element(el) => emit_element(buf, source, el, scope, depth),
        Node::ExpressionContainer(container) => match container.expression {
            Some(expr) => {
                buf.raw("(");
                emit_expression(buf, source, expr, scope);
                buf.raw(")");
            }
            None => buf.raw("\"\""),
        },
        Node::Text(text) => {
            buf.raw(&js_quote(&text.value));
        }
    }
}

fn emit_element(buf: &mut SynthBuffer, source: &str, el: &Element, scope: &Scope, depth: usize) {
    let iteration = find_iteration(el);

    // Element locals (iteration binders, scoped-slot props) are in
    // scope for the element's own attributes and subtree, but not for
    // the iteration source expression.
    let mut locals: Vec<CompactString> = el.local_variables.clone();
    if let Some(it) = iteration {
        for pattern in &it.left {
            if let Some(names) = pattern_bindings(pattern.text(source)) {
                for name in names {
                    if !locals.contains(&name) {
                        locals.push(name);
                    }
                }
            }
        }
    }
    let element_scope = scope.extended(locals);

    match iteration {
        Some(it) => {
            buf.raw(ITERATION_HELPER);
            buf.raw("((");
            emit_expression(buf, source, it.right, scope);
            buf.raw("), (");
            for (i, pattern) in it.left.iter().enumerate() {
                if i > 0 {
                    buf.raw(", ");
                }
                let text = pattern.text(source);
                if pattern_bindings(text).is_some() {
                    buf.mapped(text, pattern.range);
                } else {
                    tracing::debug!(
                        offset = pattern.range.start,
                        text,
                        "iteration binder did not parse as a pattern; substituting a placeholder"
                    );
                    buf.raw(&format!("__vlsParam{}", i));
                }
            }
            buf.raw(") => ");
            emit_component_call(buf, source, el, &element_scope, depth);
            buf.raw(")");
        }
        None => emit_component_call(buf, source, el, &element_scope, depth),
    }
}

/// The first `for` directive carrying an iteration clause, if any.
fn find_iteration(el: &Element) -> Option<&IterationExpression> {
    el.attributes.iter().find_map(|attr| match attr {
        Attribute::Directive(d) if d.kind() == DirectiveKind::For => match &d.value {
            Some(DirectiveValue::Iteration(it)) => Some(it),
            _ => None,
        },
        _ => None,
    })
}

fn emit_component_call(
    buf: &mut SynthBuffer,
    source: &str,
    el: &Element,
    scope: &Scope,
    depth: usize,
) {
    buf.raw(COMPONENT_HELPER);
    buf.raw("(");
    buf.raw(&js_quote(&el.name));
    buf.raw(", ");
    emit_attribute_data(buf, source, el, scope, depth);
    buf.raw(", ");
    if el.children.is_empty() {
        buf.raw("[]");
    } else {
        let indent = "  ".repeat(depth);
        let child_indent = "  ".repeat(depth + 1);
        buf.raw("[\n");
        for child in &el.children {
            buf.raw(&child_indent);
            emit_node(buf, source, child, scope, depth + 1);
            buf.raw(",\n");
        }
        buf.raw(&indent);
        buf.raw("]");
    }
    buf.raw(")");
}

/// Attribute bucket entries for the data object.
enum PropEntry<'a> {
    Plain(&'a PlainAttribute),
    Bound(&'a Directive),
}

/// Emit the element's attribute data object: `{ props, on, directives }`,
/// always those three members in that order.
fn emit_attribute_data(
    buf: &mut SynthBuffer,
    source: &str,
    el: &Element,
    scope: &Scope,
    depth: usize,
) {
    let mut props: Vec<PropEntry<'_>> = Vec::new();
    let mut listeners: Vec<&Directive> = Vec::new();
    let mut operands: Vec<ScriptExpression> = Vec::new();

    for attr in &el.attributes {
        match attr {
            Attribute::Plain(plain) => {
                // A binding may target the same logical attribute; the
                // duplicate key in the synthetic object would be a
                // spurious error for class/style, which are the ones
                // routinely doubled up.
                if plain.name != "class" && plain.name != "style" {
                    props.push(PropEntry::Plain(plain));
                }
            }
            Attribute::Directive(directive) => match directive.kind() {
                DirectiveKind::Bind => props.push(PropEntry::Bound(directive)),
                DirectiveKind::On => listeners.push(directive),
                // Iteration is folded into the element emission; slot
                // operands are not checked.
                DirectiveKind::For | DirectiveKind::Slot | DirectiveKind::SlotScope => {}
                DirectiveKind::Other => {
                    if let Some(DirectiveArgument::Dynamic {
                        expression: Some(key),
                        ..
                    }) = &directive.argument
                    {
                        operands.push(*key);
                    }
                    match &directive.value {
                        Some(DirectiveValue::Expression(expr)) => operands.push(*expr),
                        Some(_) => tracing::warn!(
                            directive = directive.name.as_str(),
                            offset = directive.range.start,
                            "unexpected operand shape on directive; skipping"
                        ),
                        None => {}
                    }
                }
            },
        }
    }

    buf.raw("{ props: {");
    let mut first = true;
    for entry in &props {
        buf.raw(if first { " " } else { ", " });
        first = false;
        match entry {
            PropEntry::Plain(plain) => emit_plain_attribute(buf, plain),
            PropEntry::Bound(directive) => {
                emit_directive_key(buf, source, directive, scope, |buf| {
                    emit_bound_value(buf, source, directive, scope);
                });
            }
        }
    }
    buf.raw(if first { "}" } else { " }" });

    buf.raw(", on: {");
    let mut first = true;
    for directive in &listeners {
        buf.raw(if first { " " } else { ", " });
        first = false;
        emit_directive_key(buf, source, directive, scope, |buf| {
            emit_listener_value(buf, source, directive, scope, depth);
        });
    }
    buf.raw(if first { "}" } else { " }" });

    buf.raw(", directives: [");
    let mut first = true;
    for operand in &operands {
        if !first {
            buf.raw(", ");
        }
        first = false;
        buf.raw("(");
        emit_expression(buf, source, *operand, scope);
        buf.raw(")");
    }
    buf.raw("] }");
}

/// Emit `"name": value` for a plain attribute; the value is the raw
/// attribute text as a string literal, or `true` when absent.
fn emit_plain_attribute(buf: &mut SynthBuffer, plain: &PlainAttribute) {
    let start = buf.pos();
    buf.raw(&js_quote(&plain.name));
    buf.raw(": ");
    match &plain.value {
        Some(value) => buf.raw(&js_quote(value)),
        None => buf.raw("true"),
    }
    // Anchor duplicate-key and excess-property diagnostics on the
    // attribute itself.
    buf.spanned(SourceRange::new(start, buf.pos()), plain.range);
}

/// Emit a directive's target key per the argument-name rules, then its
/// value through `emit_value`.
///
/// - missing argument: spread the value into the target object;
/// - static argument: string-literal key;
/// - dynamic argument: computed key from the rewritten expression, or a
///   no-op spread when the key expression is absent.
fn emit_directive_key(
    buf: &mut SynthBuffer,
    source: &str,
    directive: &Directive,
    scope: &Scope,
    emit_value: impl FnOnce(&mut SynthBuffer),
) {
    match &directive.argument {
        None => {
            buf.raw("...(");
            emit_value(buf);
            buf.raw(")");
        }
        Some(DirectiveArgument::Static { name, range }) => {
            let start = buf.pos();
            buf.raw(&js_quote(name));
            buf.spanned(SourceRange::new(start, buf.pos()), *range);
            buf.raw(": ");
            emit_value(buf);
        }
        Some(DirectiveArgument::Dynamic {
            expression: Some(key),
            ..
        }) => {
            buf.raw("[");
            emit_expression(buf, source, *key, scope);
            buf.raw("]: ");
            emit_value(buf);
        }
        Some(DirectiveArgument::Dynamic {
            expression: None, ..
        }) => {
            buf.raw("...{}");
        }
    }
}

/// A binding's value expression, or `true` when the value is omitted.
fn emit_bound_value(buf: &mut SynthBuffer, source: &str, directive: &Directive, scope: &Scope) {
    match &directive.value {
        Some(DirectiveValue::Expression(expr)) => emit_expression(buf, source, *expr, scope),
        None => buf.raw("true"),
        Some(_) => {
            tracing::warn!(
                directive = directive.name.as_str(),
                offset = directive.range.start,
                "unexpected operand shape on binding directive; substituting true"
            );
            buf.raw("true");
        }
    }
}

/// A listener's value: a plain handler expression, or a statement body
/// lowered through the listener helper so `this` and `$event` resolve.
fn emit_listener_value(
    buf: &mut SynthBuffer,
    source: &str,
    directive: &Directive,
    scope: &Scope,
    depth: usize,
) {
    match &directive.value {
        Some(DirectiveValue::Expression(expr)) => emit_expression(buf, source, *expr, scope),
        Some(DirectiveValue::HandlerBody(body)) => {
            let handler_scope = scope.extended(EVENT_LOCALS);
            let indent = "  ".repeat(depth);
            let stmt_indent = "  ".repeat(depth + 1);
            buf.raw(LISTENER_HELPER);
            buf.raw("(this, function ($event: Event) {\n");
            for statement in &body.statements {
                buf.raw(&stmt_indent);
                emit_expression(buf, source, *statement, &handler_scope);
                buf.raw(";\n");
            }
            buf.raw(&indent);
            buf.raw("})");
        }
        None => buf.raw("() => { }"),
        Some(DirectiveValue::Iteration(_)) => {
            tracing::warn!(
                directive = directive.name.as_str(),
                offset = directive.range.start,
                "unexpected operand shape on listener directive; substituting a no-op handler"
            );
            buf.raw("() => { }");
        }
    }
}

/// Quote `s` as a double-quoted TypeScript string literal.
fn js_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
