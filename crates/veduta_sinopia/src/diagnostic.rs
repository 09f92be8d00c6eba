//! Diagnostic remapping from the synthetic program onto the template.

use compact_str::CompactString;
use serde::Serialize;
use veduta_cartone::SourceRange;

use crate::source_map::InterpolationSourceMap;

/// The `source` identifier stamped on every template diagnostic so the
/// editor groups them together.
pub const DIAGNOSTIC_SOURCE: &str = "veduta";

/// Which tier of the downstream checker a raw diagnostic came from.
///
/// The synthetic program is syntactically well-formed by construction;
/// a syntactic diagnostic against it indicates an internal bug, not a
/// user error, and is always dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RawDiagnosticKind {
    Syntactic,
    Semantic,
}

/// Severity reported by the downstream checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RawSeverity {
    Error,
    Warning,
    Message,
}

/// A diagnostic as reported by the downstream checker against the
/// synthetic program.
#[derive(Debug, Clone)]
pub struct RawDiagnostic {
    /// Span in the synthetic buffer.
    pub span: SourceRange,
    pub severity: RawSeverity,
    /// Message text; chained messages as separate entries, outermost
    /// first.
    pub message_chain: Vec<CompactString>,
    /// Numeric code from the checker.
    pub code: u32,
    pub kind: RawDiagnosticKind,
}

impl RawDiagnostic {
    /// A semantic error diagnostic; what tests and simple embedders
    /// construct most.
    pub fn semantic_error(
        span: SourceRange,
        code: u32,
        message: impl Into<CompactString>,
    ) -> Self {
        Self {
            span,
            severity: RawSeverity::Error,
            message_chain: vec![message.into()],
            code,
            kind: RawDiagnosticKind::Semantic,
        }
    }
}

/// Template diagnostic severity. The template type check has a single
/// tier: everything user-visible is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
}

/// A type diagnostic in template coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateDiagnostic {
    /// Byte range in the template buffer.
    pub range: SourceRange,
    pub severity: Severity,
    /// Flattened message; chained messages joined with newlines.
    pub message: String,
    /// Numeric code, preserved from the checker.
    pub code: u32,
    /// Always [`DIAGNOSTIC_SOURCE`].
    pub source: &'static str,
}

/// Map raw checker diagnostics back onto the template.
///
/// Syntactic diagnostics are dropped (and logged, since they indicate an
/// internal bug). Semantic diagnostics are remapped through the source
/// map; when no mapping entry matches, the diagnostic is anchored at the
/// start of the template rather than silently discarded.
pub fn map_diagnostics(
    raw: impl IntoIterator<Item = RawDiagnostic>,
    map: &InterpolationSourceMap,
    template_len: u32,
) -> Vec<TemplateDiagnostic> {
    raw.into_iter()
        .filter_map(|diag| {
            if diag.kind == RawDiagnosticKind::Syntactic {
                tracing::warn!(
                    code = diag.code,
                    start = diag.span.start,
                    "syntactic diagnostic against the synthetic program; dropping"
                );
                return None;
            }

            let range = map
                .map_back(diag.span)
                .unwrap_or(SourceRange::SENTINEL)
                .clamp_to(template_len);

            Some(TemplateDiagnostic {
                range,
                severity: Severity::Error,
                message: flatten_message(&diag.message_chain),
                code: diag.code,
                source: DIAGNOSTIC_SOURCE,
            })
        })
        .collect()
}

fn flatten_message(chain: &[CompactString]) -> String {
    let mut out = String::new();
    for (i, part) in chain.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(part);
    }
    out
}

/// A short name for the well-known downstream checker codes, for log
/// output and diagnostic grouping. Unknown codes return `None`.
pub fn code_name(code: u32) -> Option<&'static str> {
    Some(match code {
        2300 => "duplicate-identifier",
        2304 => "unknown-identifier",
        2322 => "type-not-assignable",
        2339 => "property-not-found",
        2345 => "argument-type-mismatch",
        2349 => "not-callable",
        2532 => "possibly-undefined",
        2551 => "property-not-found-suggestion",
        2554 => "expected-arguments",
        2741 => "missing-property",
        7006 => "implicit-any",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_map::{MappingEntry, MappingKind};

    fn map_with_entry() -> InterpolationSourceMap {
        let mut map = InterpolationSourceMap::new();
        map.push(MappingEntry {
            gen: SourceRange::new(100, 120),
            src: SourceRange::new(10, 30),
            kind: MappingKind::Verbatim,
        });
        map
    }

    #[test]
    fn semantic_diagnostics_are_remapped() {
        let diags = map_diagnostics(
            [RawDiagnostic::semantic_error(
                SourceRange::new(105, 110),
                2339,
                "Property 'x' does not exist on type 'C'.",
            )],
            &map_with_entry(),
            100,
        );

        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].range, SourceRange::new(15, 20));
        assert_eq!(diags[0].severity, Severity::Error);
        assert_eq!(diags[0].code, 2339);
        assert_eq!(diags[0].source, DIAGNOSTIC_SOURCE);
    }

    #[test]
    fn syntactic_diagnostics_are_dropped() {
        let mut diag =
            RawDiagnostic::semantic_error(SourceRange::new(105, 110), 1005, "';' expected.");
        diag.kind = RawDiagnosticKind::Syntactic;

        let diags = map_diagnostics([diag], &map_with_entry(), 100);
        assert!(diags.is_empty());
    }

    #[test]
    fn warnings_are_promoted_to_errors() {
        let mut diag = RawDiagnostic::semantic_error(
            SourceRange::new(101, 104),
            6133,
            "'x' is declared but its value is never read.",
        );
        diag.severity = RawSeverity::Warning;

        let diags = map_diagnostics([diag], &map_with_entry(), 100);
        assert_eq!(diags[0].severity, Severity::Error);
    }

    #[test]
    fn unmapped_diagnostics_anchor_at_template_start() {
        let diags = map_diagnostics(
            [RawDiagnostic::semantic_error(
                SourceRange::new(900, 910),
                2322,
                "mismatch",
            )],
            &map_with_entry(),
            100,
        );

        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].range, SourceRange::SENTINEL);
    }

    #[test]
    fn message_chain_is_flattened() {
        let diag = RawDiagnostic {
            span: SourceRange::new(105, 106),
            severity: RawSeverity::Error,
            message_chain: vec![
                "Type 'A' is not assignable to type 'B'.".into(),
                "Property 'x' is missing.".into(),
            ],
            code: 2322,
            kind: RawDiagnosticKind::Semantic,
        };

        let diags = map_diagnostics([diag], &map_with_entry(), 100);
        assert_eq!(
            diags[0].message,
            "Type 'A' is not assignable to type 'B'.\nProperty 'x' is missing."
        );
    }

    #[test]
    fn code_names() {
        assert_eq!(code_name(2339), Some("property-not-found"));
        assert_eq!(code_name(2345), Some("argument-type-mismatch"));
        assert_eq!(code_name(9999), None);
    }
}
