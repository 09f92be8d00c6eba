//! Synthetic program emission buffer.
//!
//! The transform builds the synthetic program by appending text to this
//! buffer; mapping entries are captured at the moment of emission, so
//! the source map is always consistent with the emitted offsets.

use veduta_cartone::SourceRange;

use crate::source_map::{InterpolationSourceMap, MappingEntry, MappingKind};

/// A growing synthetic buffer plus its source map.
#[derive(Debug, Default)]
pub struct SynthBuffer {
    code: String,
    map: InterpolationSourceMap,
}

impl SynthBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current emission offset.
    pub fn pos(&self) -> u32 {
        self.code.len() as u32
    }

    /// Append scaffolding text with no template counterpart.
    pub fn raw(&mut self, text: &str) {
        self.code.push_str(text);
    }

    /// Append a template substring verbatim, recording a delta-mapped
    /// entry from the emitted range back to `src`.
    pub fn mapped(&mut self, text: &str, src: SourceRange) {
        debug_assert_eq!(
            text.len() as u32,
            src.len(),
            "verbatim entry must copy exactly the template substring"
        );
        if text.is_empty() {
            return;
        }
        let gen = SourceRange::new(self.pos(), self.pos() + text.len() as u32);
        self.code.push_str(text);
        self.map.push(MappingEntry {
            gen,
            src,
            kind: MappingKind::Verbatim,
        });
    }

    /// Record a spanned entry over an already-emitted synthetic range.
    pub fn spanned(&mut self, gen: SourceRange, src: SourceRange) {
        if gen.is_empty() || src.is_empty() {
            return;
        }
        self.map.push(MappingEntry {
            gen,
            src,
            kind: MappingKind::Spanned,
        });
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn finish(self) -> (String, InterpolationSourceMap) {
        (self.code, self.map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapped_records_verbatim_entry() {
        let mut buf = SynthBuffer::new();
        buf.raw("this.");
        buf.mapped("msg", SourceRange::new(6, 9));
        let (code, map) = buf.finish();

        assert_eq!(code, "this.msg");
        let back = map.map_back(SourceRange::new(5, 8)).unwrap();
        assert_eq!(back, SourceRange::new(6, 9));
    }

    #[test]
    fn raw_text_has_no_entry() {
        let mut buf = SynthBuffer::new();
        buf.raw("[\n  ");
        let (code, map) = buf.finish();

        assert_eq!(code, "[\n  ");
        assert!(map.is_empty());
    }

    #[test]
    fn spanned_covers_composite_rewrite() {
        let mut buf = SynthBuffer::new();
        let start = buf.pos();
        buf.raw("this.");
        buf.mapped("num", SourceRange::new(20, 23));
        buf.spanned(SourceRange::new(start, buf.pos()), SourceRange::new(20, 23));
        let (_, map) = buf.finish();

        // A query landing on the synthetic prefix still resolves.
        let back = map.map_back(SourceRange::new(0, 8)).unwrap();
        assert_eq!(back, SourceRange::new(20, 23));
    }
}
