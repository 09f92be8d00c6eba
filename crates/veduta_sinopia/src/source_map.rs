//! Source map between the synthetic program and the template buffer.
//!
//! Entries are recorded as a side effect of emission (the synthetic
//! program is built by concatenating token text, so the side table is
//! keyed by buffer offsets). Two entry kinds exist:
//!
//! - **Verbatim**: a template substring copied unchanged into the
//!   synthetic buffer. Positions inside it map by delta arithmetic.
//! - **Spanned**: a composite rewrite (e.g. `this.x` produced from a
//!   bare `x`) whose whole synthetic extent maps to one fixed template
//!   range.

use veduta_cartone::SourceRange;

/// How positions inside an entry translate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingKind {
    /// Byte-for-byte copy; offsets map by delta.
    Verbatim,
    /// Any position inside maps to the full template range.
    Spanned,
}

/// A single synthetic-range → template-range entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingEntry {
    /// Range in the synthetic buffer.
    pub gen: SourceRange,
    /// Range in the template buffer.
    pub src: SourceRange,
    pub kind: MappingKind,
}

/// The transform's side table of range correspondences.
#[derive(Debug, Clone, Default)]
pub struct InterpolationSourceMap {
    entries: Vec<MappingEntry>,
}

impl InterpolationSourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: MappingEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Map a synthetic span back to a template range.
    ///
    /// Finds the innermost entry whose synthetic range contains the
    /// span's start and whose template range is non-empty. Returns
    /// `None` when nothing matches; callers decide the fallback (the
    /// diagnostic mapper anchors at the start of the template).
    pub fn map_back(&self, span: SourceRange) -> Option<SourceRange> {
        let entry = self
            .entries
            .iter()
            .filter(|e| e.gen.contains(span.start) && !e.src.is_empty())
            .min_by_key(|e| e.gen.len())?;

        match entry.kind {
            MappingKind::Spanned => Some(entry.src),
            MappingKind::Verbatim => {
                let delta = span.start - entry.gen.start;
                let start = entry.src.start + delta;
                // A span reaching past the copied text is clamped to the
                // entry; the tail belongs to synthetic scaffolding.
                let end = (start + span.len().max(1)).min(entry.src.end);
                Some(SourceRange::new(start, end))
            }
        }
    }

    /// Map a template offset into the synthetic buffer.
    ///
    /// Only verbatim entries participate: a spanned entry has no
    /// position-level correspondence. Returns the first match in
    /// emission order.
    pub fn map_to_synthetic(&self, template_offset: u32) -> Option<u32> {
        self.entries
            .iter()
            .filter(|e| e.kind == MappingKind::Verbatim)
            .find(|e| e.src.contains(template_offset))
            .map(|e| e.gen.start + (template_offset - e.src.start))
    }
}
