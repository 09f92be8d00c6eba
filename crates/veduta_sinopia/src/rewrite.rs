//! Expression parsing and scope injection.
//!
//! A raw template expression substring is wrapped in parentheses (so a
//! brace-initial input parses as an object literal, not a block),
//! parsed as a TypeScript expression, and re-emitted with every free
//! identifier that is neither locally bound nor a template global
//! rewritten to a member access on the component instance:
//!
//! ```text
//! count + offset        =>  this.count + offset     (offset in scope)
//! { foo: true, bar }    =>  { foo: true, bar: this.bar }
//! items.map(i => i.id)  =>  this.items.map(i => i.id)
//! ```
//!
//! The rewrite is collected as a list of positional edits against the
//! original substring and applied while copying it into the synthetic
//! buffer, so everything user-authored lands verbatim and delta-mapped;
//! only the inserted `this.` prefixes and shorthand expansions are
//! synthetic text.

use compact_str::CompactString;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    ArrayExpressionElement, Argument, AssignmentTarget, AssignmentTargetMaybeDefault,
    AssignmentTargetProperty, BindingPattern, BindingPatternKind, ChainElement, Expression,
    FormalParameters, FunctionBody, ObjectPropertyKind, SimpleAssignmentTarget, Statement,
};
use oxc_parser::Parser;
use oxc_span::{SourceType, Span};
use veduta_cartone::{ScriptExpression, SourceRange};

use crate::scope::Scope;
use crate::synth::SynthBuffer;

/// The string literal substituted when an operand cannot be parsed.
/// Keeps the synthetic program well-formed so the rest of the template
/// still type-checks.
const NEUTRAL_LITERAL: &str = "\"\"";

/// A positional rewrite against the wrapped parse buffer.
///
/// Edits are leaf-level (identifier spans), so they never nest; applying
/// them in span order while copying the substring is sufficient.
#[derive(Debug, Clone, Copy)]
enum Edit {
    /// Bare identifier rewritten to `this.<name>`.
    Prefix { ident: Span },
    /// Shorthand object property `{x}` expanded to `{x: this.x}`.
    Shorthand { ident: Span },
}

impl Edit {
    fn start(&self) -> u32 {
        match self {
            Edit::Prefix { ident } | Edit::Shorthand { ident } => ident.start,
        }
    }

    fn end(&self) -> u32 {
        match self {
            Edit::Prefix { ident } | Edit::Shorthand { ident } => ident.end,
        }
    }
}

/// Parse `expr` under `scope` and emit its rewritten form into `buf`.
///
/// On a parse failure the transform must still make progress: the
/// failure is logged and an empty-string literal is emitted instead.
pub fn emit_expression(buf: &mut SynthBuffer, source: &str, expr: ScriptExpression, scope: &Scope) {
    let raw = expr.text(source);
    if raw.trim().is_empty() {
        buf.raw(NEUTRAL_LITERAL);
        return;
    }

    let wrapped = format!("({})", raw);
    let allocator = Allocator::default();
    match Parser::new(&allocator, &wrapped, SourceType::ts()).parse_expression() {
        Ok(parsed) => {
            let mut edits = Vec::new();
            collect_expression(&parsed, scope, &mut edits);
            edits.sort_by_key(Edit::start);
            apply_edits(buf, &wrapped, expr.range.start, &edits);
        }
        Err(_) => {
            tracing::debug!(
                offset = expr.range.start,
                text = raw,
                "template operand did not parse as an expression; substituting a neutral literal"
            );
            buf.raw(NEUTRAL_LITERAL);
        }
    }
}

/// Collect the names bound by an iteration binder pattern (`item`,
/// `{ id, label }`, `[a, , b]`, ...) via a parenthesized-arrow parse.
///
/// Returns `None` when the pattern does not parse as an arrow parameter
/// list; the caller substitutes a placeholder binder.
pub fn pattern_bindings(pattern_text: &str) -> Option<Vec<CompactString>> {
    let wrapped = format!("({}) => 0", pattern_text);
    let allocator = Allocator::default();
    match Parser::new(&allocator, &wrapped, SourceType::ts()).parse_expression() {
        Ok(Expression::ArrowFunctionExpression(arrow)) => {
            let mut names = Vec::new();
            collect_params(&arrow.params, &mut names);
            Some(names)
        }
        _ => None,
    }
}

/// Copy the wrapped substring into `buf`, applying edits in order.
///
/// Wrapped position `w` corresponds to template offset
/// `base + w - 1` (the added `(` shifts everything by one).
fn apply_edits(buf: &mut SynthBuffer, wrapped: &str, base: u32, edits: &[Edit]) {
    let to_src = |w: u32| base + w - 1;
    let inner_end = (wrapped.len() - 1) as u32;
    let mut cursor = 1u32;

    let flush = |buf: &mut SynthBuffer, cursor: u32, upto: u32| {
        if upto > cursor {
            buf.mapped(
                &wrapped[cursor as usize..upto as usize],
                SourceRange::new(to_src(cursor), to_src(upto)),
            );
        }
    };

    for edit in edits {
        debug_assert!(edit.start() >= cursor, "edits must be ordered and disjoint");
        flush(buf, cursor, edit.start());

        let ident = &wrapped[edit.start() as usize..edit.end() as usize];
        let src = SourceRange::new(to_src(edit.start()), to_src(edit.end()));
        let gen_start = buf.pos();
        match edit {
            Edit::Prefix { .. } => {
                buf.raw("this.");
                buf.mapped(ident, src);
            }
            Edit::Shorthand { .. } => {
                buf.mapped(ident, src);
                buf.raw(": this.");
                buf.mapped(ident, src);
            }
        }
        // The composite covers the inserted prefix too, so a diagnostic
        // anchored on `this.` still resolves to the identifier.
        buf.spanned(SourceRange::new(gen_start, buf.pos()), src);
        cursor = edit.end();
    }
    flush(buf, cursor, inner_end);
}

// =============================================================================
// Edit collection
// =============================================================================

fn collect_expression(expr: &Expression<'_>, scope: &Scope, edits: &mut Vec<Edit>) {
    match expr {
        Expression::Identifier(id) => {
            if !scope.resolves(id.name.as_str()) {
                edits.push(Edit::Prefix { ident: id.span });
            }
        }
        Expression::StaticMemberExpression(member) => {
            collect_expression(&member.object, scope, edits);
            // The property name is not a reference.
        }
        Expression::ComputedMemberExpression(member) => {
            collect_expression(&member.object, scope, edits);
            collect_expression(&member.expression, scope, edits);
        }
        Expression::PrivateFieldExpression(member) => {
            collect_expression(&member.object, scope, edits);
        }
        Expression::ParenthesizedExpression(paren) => {
            collect_expression(&paren.expression, scope, edits);
        }
        Expression::UnaryExpression(unary) => {
            collect_expression(&unary.argument, scope, edits);
        }
        Expression::UpdateExpression(update) => {
            collect_simple_assignment_target(&update.argument, scope, edits);
        }
        Expression::BinaryExpression(binary) => {
            collect_expression(&binary.left, scope, edits);
            collect_expression(&binary.right, scope, edits);
        }
        Expression::LogicalExpression(logical) => {
            collect_expression(&logical.left, scope, edits);
            collect_expression(&logical.right, scope, edits);
        }
        Expression::ConditionalExpression(cond) => {
            collect_expression(&cond.test, scope, edits);
            collect_expression(&cond.consequent, scope, edits);
            collect_expression(&cond.alternate, scope, edits);
        }
        Expression::CallExpression(call) => {
            collect_expression(&call.callee, scope, edits);
            for arg in &call.arguments {
                collect_argument(arg, scope, edits);
            }
        }
        Expression::NewExpression(new_expr) => {
            collect_expression(&new_expr.callee, scope, edits);
            for arg in &new_expr.arguments {
                collect_argument(arg, scope, edits);
            }
        }
        Expression::ObjectExpression(obj) => {
            for prop in &obj.properties {
                match prop {
                    ObjectPropertyKind::ObjectProperty(p) => {
                        if p.shorthand {
                            if let Expression::Identifier(id) = &p.value {
                                if !scope.resolves(id.name.as_str()) {
                                    edits.push(Edit::Shorthand { ident: id.span });
                                }
                            }
                        } else {
                            if p.computed {
                                if let Some(key) = p.key.as_expression() {
                                    collect_expression(key, scope, edits);
                                }
                            }
                            collect_expression(&p.value, scope, edits);
                        }
                    }
                    ObjectPropertyKind::SpreadProperty(spread) => {
                        collect_expression(&spread.argument, scope, edits);
                    }
                }
            }
        }
        Expression::ArrayExpression(arr) => {
            for elem in &arr.elements {
                match elem {
                    ArrayExpressionElement::SpreadElement(spread) => {
                        collect_expression(&spread.argument, scope, edits);
                    }
                    ArrayExpressionElement::Elision(_) => {}
                    _ => {
                        if let Some(e) = elem.as_expression() {
                            collect_expression(e, scope, edits);
                        }
                    }
                }
            }
        }
        Expression::ArrowFunctionExpression(arrow) => {
            // Parameters themselves are never rewritten; they bind.
            let mut names = Vec::new();
            collect_params(&arrow.params, &mut names);
            collect_function_body(&arrow.body, &scope.extended(names), edits);
        }
        Expression::FunctionExpression(func) => {
            let mut names = Vec::new();
            collect_params(&func.params, &mut names);
            if let Some(body) = &func.body {
                collect_function_body(body, &scope.extended(names), edits);
            }
        }
        Expression::TemplateLiteral(template) => {
            for e in &template.expressions {
                collect_expression(e, scope, edits);
            }
        }
        Expression::TaggedTemplateExpression(tagged) => {
            collect_expression(&tagged.tag, scope, edits);
            for e in &tagged.quasi.expressions {
                collect_expression(e, scope, edits);
            }
        }
        Expression::SequenceExpression(seq) => {
            for e in &seq.expressions {
                collect_expression(e, scope, edits);
            }
        }
        Expression::AssignmentExpression(assign) => {
            collect_assignment_target(&assign.left, scope, edits);
            collect_expression(&assign.right, scope, edits);
        }
        Expression::AwaitExpression(await_expr) => {
            collect_expression(&await_expr.argument, scope, edits);
        }
        Expression::YieldExpression(yield_expr) => {
            if let Some(arg) = &yield_expr.argument {
                collect_expression(arg, scope, edits);
            }
        }
        Expression::ChainExpression(chain) => match &chain.expression {
            ChainElement::CallExpression(call) => {
                collect_expression(&call.callee, scope, edits);
                for arg in &call.arguments {
                    collect_argument(arg, scope, edits);
                }
            }
            ChainElement::StaticMemberExpression(member) => {
                collect_expression(&member.object, scope, edits);
            }
            ChainElement::ComputedMemberExpression(member) => {
                collect_expression(&member.object, scope, edits);
                collect_expression(&member.expression, scope, edits);
            }
            ChainElement::PrivateFieldExpression(member) => {
                collect_expression(&member.object, scope, edits);
            }
        },
        Expression::TSAsExpression(e) => collect_expression(&e.expression, scope, edits),
        Expression::TSSatisfiesExpression(e) => collect_expression(&e.expression, scope, edits),
        Expression::TSNonNullExpression(e) => collect_expression(&e.expression, scope, edits),
        Expression::TSTypeAssertion(e) => collect_expression(&e.expression, scope, edits),
        Expression::TSInstantiationExpression(e) => collect_expression(&e.expression, scope, edits),
        // Literals, regexes, this, super, JSX and friends: unchanged.
        _ => {}
    }
}

fn collect_argument(arg: &Argument<'_>, scope: &Scope, edits: &mut Vec<Edit>) {
    if let Argument::SpreadElement(spread) = arg {
        collect_expression(&spread.argument, scope, edits);
    } else if let Some(e) = arg.as_expression() {
        collect_expression(e, scope, edits);
    }
}

/// Walk a function body's statements, threading declared names into the
/// scope in statement order.
fn collect_function_body(body: &FunctionBody<'_>, scope: &Scope, edits: &mut Vec<Edit>) {
    let mut scope = scope.clone();
    for stmt in &body.statements {
        collect_statement(stmt, &mut scope, edits);
    }
}

fn collect_statement(stmt: &Statement<'_>, scope: &mut Scope, edits: &mut Vec<Edit>) {
    match stmt {
        Statement::ExpressionStatement(s) => collect_expression(&s.expression, scope, edits),
        Statement::ReturnStatement(ret) => {
            if let Some(arg) = &ret.argument {
                collect_expression(arg, scope, edits);
            }
        }
        Statement::BlockStatement(block) => {
            let mut inner = scope.clone();
            for s in &block.body {
                collect_statement(s, &mut inner, edits);
            }
        }
        Statement::IfStatement(if_stmt) => {
            collect_expression(&if_stmt.test, scope, edits);
            collect_statement(&if_stmt.consequent, &mut scope.clone(), edits);
            if let Some(alt) = &if_stmt.alternate {
                collect_statement(alt, &mut scope.clone(), edits);
            }
        }
        Statement::VariableDeclaration(var_decl) => {
            for decl in &var_decl.declarations {
                if let Some(init) = &decl.init {
                    collect_expression(init, scope, edits);
                }
                let mut names = Vec::new();
                collect_binding_pattern(&decl.id, &mut names);
                *scope = scope.extended(names);
            }
        }
        // Other statement kinds do not occur inside template operands.
        _ => {}
    }
}

fn collect_simple_assignment_target(
    target: &SimpleAssignmentTarget<'_>,
    scope: &Scope,
    edits: &mut Vec<Edit>,
) {
    match target {
        SimpleAssignmentTarget::AssignmentTargetIdentifier(id) => {
            if !scope.resolves(id.name.as_str()) {
                edits.push(Edit::Prefix { ident: id.span });
            }
        }
        SimpleAssignmentTarget::ComputedMemberExpression(member) => {
            collect_expression(&member.object, scope, edits);
            collect_expression(&member.expression, scope, edits);
        }
        SimpleAssignmentTarget::StaticMemberExpression(member) => {
            collect_expression(&member.object, scope, edits);
        }
        SimpleAssignmentTarget::PrivateFieldExpression(member) => {
            collect_expression(&member.object, scope, edits);
        }
        SimpleAssignmentTarget::TSAsExpression(e) => {
            collect_expression(&e.expression, scope, edits);
        }
        SimpleAssignmentTarget::TSSatisfiesExpression(e) => {
            collect_expression(&e.expression, scope, edits);
        }
        SimpleAssignmentTarget::TSNonNullExpression(e) => {
            collect_expression(&e.expression, scope, edits);
        }
        SimpleAssignmentTarget::TSTypeAssertion(e) => {
            collect_expression(&e.expression, scope, edits);
        }
        SimpleAssignmentTarget::TSInstantiationExpression(e) => {
            collect_expression(&e.expression, scope, edits);
        }
    }
}

fn collect_assignment_target(target: &AssignmentTarget<'_>, scope: &Scope, edits: &mut Vec<Edit>) {
    match target {
        AssignmentTarget::AssignmentTargetIdentifier(id) => {
            if !scope.resolves(id.name.as_str()) {
                edits.push(Edit::Prefix { ident: id.span });
            }
        }
        AssignmentTarget::ComputedMemberExpression(member) => {
            collect_expression(&member.object, scope, edits);
            collect_expression(&member.expression, scope, edits);
        }
        AssignmentTarget::StaticMemberExpression(member) => {
            collect_expression(&member.object, scope, edits);
        }
        AssignmentTarget::PrivateFieldExpression(member) => {
            collect_expression(&member.object, scope, edits);
        }
        AssignmentTarget::ArrayAssignmentTarget(arr) => {
            for elem in arr.elements.iter().flatten() {
                collect_assignment_target_maybe_default(elem, scope, edits);
            }
            if let Some(rest) = &arr.rest {
                collect_assignment_target(&rest.target, scope, edits);
            }
        }
        AssignmentTarget::ObjectAssignmentTarget(obj) => {
            for prop in &obj.properties {
                match prop {
                    AssignmentTargetProperty::AssignmentTargetPropertyIdentifier(ident_prop) => {
                        if !scope.resolves(ident_prop.binding.name.as_str()) {
                            edits.push(Edit::Prefix {
                                ident: ident_prop.binding.span,
                            });
                        }
                        if let Some(init) = &ident_prop.init {
                            collect_expression(init, scope, edits);
                        }
                    }
                    AssignmentTargetProperty::AssignmentTargetPropertyProperty(prop) => {
                        collect_assignment_target_maybe_default(&prop.binding, scope, edits);
                    }
                }
            }
            if let Some(rest) = &obj.rest {
                collect_assignment_target(&rest.target, scope, edits);
            }
        }
        AssignmentTarget::TSAsExpression(e) => collect_expression(&e.expression, scope, edits),
        AssignmentTarget::TSSatisfiesExpression(e) => {
            collect_expression(&e.expression, scope, edits);
        }
        AssignmentTarget::TSNonNullExpression(e) => collect_expression(&e.expression, scope, edits),
        AssignmentTarget::TSTypeAssertion(e) => collect_expression(&e.expression, scope, edits),
        AssignmentTarget::TSInstantiationExpression(e) => {
            collect_expression(&e.expression, scope, edits);
        }
    }
}

fn collect_assignment_target_maybe_default(
    target: &AssignmentTargetMaybeDefault<'_>,
    scope: &Scope,
    edits: &mut Vec<Edit>,
) {
    match target {
        AssignmentTargetMaybeDefault::AssignmentTargetWithDefault(with_default) => {
            collect_assignment_target(&with_default.binding, scope, edits);
            collect_expression(&with_default.init, scope, edits);
        }
        _ => {
            if let Some(t) = target.as_assignment_target() {
                collect_assignment_target(t, scope, edits);
            }
        }
    }
}

fn collect_params(params: &FormalParameters<'_>, names: &mut Vec<CompactString>) {
    for param in &params.items {
        collect_binding_pattern(&param.pattern, names);
    }
    if let Some(rest) = &params.rest {
        collect_binding_pattern(&rest.argument, names);
    }
}

/// Collect the names a binding pattern introduces. A `b: c` entry
/// introduces `c`, not `b`; defaults do not change the binder set.
fn collect_binding_pattern(pattern: &BindingPattern<'_>, names: &mut Vec<CompactString>) {
    match &pattern.kind {
        BindingPatternKind::BindingIdentifier(id) => {
            names.push(CompactString::new(id.name.as_str()));
        }
        BindingPatternKind::ObjectPattern(obj) => {
            for prop in &obj.properties {
                collect_binding_pattern(&prop.value, names);
            }
            if let Some(rest) = &obj.rest {
                collect_binding_pattern(&rest.argument, names);
            }
        }
        BindingPatternKind::ArrayPattern(arr) => {
            for elem in arr.elements.iter().flatten() {
                collect_binding_pattern(elem, names);
            }
            if let Some(rest) = &arr.rest {
                collect_binding_pattern(&rest.argument, names);
            }
        }
        BindingPatternKind::AssignmentPattern(assign) => {
            collect_binding_pattern(&assign.left, names);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rewrite `raw` as if it sat at offset 0 of the template buffer.
    fn rewrite(raw: &str, scope: &Scope) -> String {
        let mut buf = SynthBuffer::new();
        emit_expression(
            &mut buf,
            raw,
            ScriptExpression::new(SourceRange::new(0, raw.len() as u32)),
            scope,
        );
        buf.finish().0
    }

    #[test]
    fn bare_identifier_is_prefixed() {
        assert_eq!(rewrite("msg", &Scope::new()), "this.msg");
    }

    #[test]
    fn scoped_identifier_is_untouched() {
        let scope = Scope::new().extended(["item"]);
        assert_eq!(rewrite("item", &scope), "item");
    }

    #[test]
    fn globals_are_untouched() {
        assert_eq!(
            rewrite("Math.max(count, 0)", &Scope::new()),
            "Math.max(this.count, 0)"
        );
        assert_eq!(rewrite("JSON.stringify(x)", &Scope::new()), "JSON.stringify(this.x)");
    }

    #[test]
    fn member_access_rewrites_object_only() {
        assert_eq!(rewrite("user.name", &Scope::new()), "this.user.name");
        assert_eq!(rewrite("a.b.c", &Scope::new()), "this.a.b.c");
    }

    #[test]
    fn computed_index_rewrites_both_sides() {
        assert_eq!(rewrite("list[idx]", &Scope::new()), "this.list[this.idx]");
    }

    #[test]
    fn operators_and_ternary() {
        assert_eq!(rewrite("a + b", &Scope::new()), "this.a + this.b");
        assert_eq!(rewrite("!done", &Scope::new()), "!this.done");
        assert_eq!(rewrite("n++", &Scope::new()), "this.n++");
        assert_eq!(
            rewrite("ok ? yes : no", &Scope::new()),
            "this.ok ? this.yes : this.no"
        );
    }

    #[test]
    fn call_rewrites_callee_and_arguments() {
        assert_eq!(
            rewrite("onClick(123, evt)", &Scope::new()),
            "this.onClick(123, this.evt)"
        );
    }

    #[test]
    fn assignment_rewrites_both_sides() {
        assert_eq!(rewrite("num = 'test'", &Scope::new()), "this.num = 'test'");
    }

    #[test]
    fn object_literal_static_keys_stay() {
        assert_eq!(
            rewrite("{ foo: true, bar: baz }", &Scope::new()),
            "{ foo: true, bar: this.baz }"
        );
    }

    #[test]
    fn object_literal_shorthand_expands() {
        assert_eq!(rewrite("{ foo }", &Scope::new()), "{ foo: this.foo }");
        let scope = Scope::new().extended(["foo"]);
        assert_eq!(rewrite("{ foo }", &scope), "{ foo }");
    }

    #[test]
    fn object_literal_computed_key_is_rewritten() {
        assert_eq!(
            rewrite("{ [key]: value }", &Scope::new()),
            "{ [this.key]: this.value }"
        );
    }

    #[test]
    fn spread_is_rewritten() {
        assert_eq!(rewrite("{ ...rest }", &Scope::new()), "{ ...this.rest }");
        assert_eq!(rewrite("[...items]", &Scope::new()), "[...this.items]");
    }

    #[test]
    fn arrow_parameters_bind_and_are_not_rewritten() {
        assert_eq!(
            rewrite("items.map(i => i.id + tag)", &Scope::new()),
            "this.items.map(i => i.id + this.tag)"
        );
        assert_eq!(
            rewrite("({ a, b: c }) => a + c + d", &Scope::new()),
            "({ a, b: c }) => a + c + this.d"
        );
    }

    #[test]
    fn template_literal_interpolations() {
        assert_eq!(
            rewrite("`hi ${name}!`", &Scope::new()),
            "`hi ${this.name}!`"
        );
    }

    #[test]
    fn optional_chain_rewrites_root() {
        assert_eq!(rewrite("user?.name", &Scope::new()), "this.user?.name");
    }

    #[test]
    fn this_access_is_untouched() {
        assert_eq!(rewrite("this.msg", &Scope::new()), "this.msg");
    }

    #[test]
    fn parse_failure_yields_neutral_literal() {
        assert_eq!(rewrite("if (x) y()", &Scope::new()), NEUTRAL_LITERAL);
        assert_eq!(rewrite("   ", &Scope::new()), NEUTRAL_LITERAL);
    }

    #[test]
    fn mapping_points_at_the_original_identifier() {
        let source = "prefix messaage suffix";
        let range = SourceRange::new(7, 15);
        let mut buf = SynthBuffer::new();
        emit_expression(&mut buf, source, ScriptExpression::new(range), &Scope::new());
        let (code, map) = buf.finish();
        assert_eq!(code, "this.messaage");

        // The identifier text itself maps by delta.
        let ident_pos = code.find("messaage").unwrap() as u32;
        let back = map
            .map_back(SourceRange::new(ident_pos, ident_pos + 8))
            .unwrap();
        assert_eq!(back, range);

        // A query on the synthetic prefix resolves via the composite.
        let back = map.map_back(SourceRange::new(0, 13)).unwrap();
        assert_eq!(back, range);
    }

    #[test]
    fn pattern_bindings_from_patterns() {
        assert_eq!(pattern_bindings("item").unwrap(), vec!["item"]);
        assert_eq!(
            pattern_bindings("{ a, b: c, ...r }").unwrap(),
            vec!["a", "c", "r"]
        );
        assert_eq!(pattern_bindings("[a, , b]").unwrap(), vec!["a", "b"]);
        assert_eq!(pattern_bindings("x = 1").unwrap(), vec!["x"]);
        assert!(pattern_bindings("4 + 4(").is_none());
    }
}
