//! # veduta_sinopia
//!
//! The interpolation transform and diagnostic remapping core of Veduta.
//!
//! ## Name Origin
//!
//! A **sinopia** is the red-earth underdrawing beneath a fresco - the
//! hidden layer the finished surface is built over, revealed again when
//! the fresco is lifted from the wall. The synthetic program this crate
//! emits is exactly that: an underdrawing of the template, invisible to
//! the author, from which every type error can be traced back to the
//! painted surface.
//!
//! ## Architecture
//!
//! ```text
//! template AST + source text
//!     |
//!     v
//! +--------------------------------------------------+
//! |  transform (template walk)                        |
//! |    elements   -> __vlsComponentHelper(...)        |
//! |    iteration  -> __vlsIterationHelper(src, cb)    |
//! |    listeners  -> __vlsListenerHelper(this, fn)    |
//! |       |                                           |
//! |       v                                           |
//! |  rewrite (scope injection)                        |
//! |    free identifier x -> this.x                    |
//! +--------------------------------------------------+
//!     |                         |
//!     v                         v
//! synthetic program      InterpolationSourceMap
//!     |                         |
//!     v                         |
//! CheckerSession (external)     |
//!     |                         |
//!     v                         v
//! RawDiagnostic  -------->  TemplateDiagnostic
//! ```
//!
//! The downstream type checker is external: the core emits the
//! synthetic program, keeps the checker's shadow document in sync, and
//! remaps the checker's semantic diagnostics onto template coordinates.
//! No failure inside the transform is user-visible; unexpected operand
//! shapes degrade to neutral literals and an internal log line.

pub mod builtins;
mod diagnostic;
mod rewrite;
mod scope;
mod service;
mod source_map;
mod synth;
mod transform;

pub use diagnostic::{
    code_name, map_diagnostics, RawDiagnostic, RawDiagnosticKind, RawSeverity, Severity,
    TemplateDiagnostic, DIAGNOSTIC_SOURCE,
};
pub use rewrite::{emit_expression, pattern_bindings};
pub use scope::Scope;
pub use service::{
    shadow_path, CheckError, CheckerSession, TemplateChecker, TemplateDocument, SHADOW_SUFFIX,
};
pub use source_map::{InterpolationSourceMap, MappingEntry, MappingKind};
pub use synth::SynthBuffer;
pub use transform::{transform_template, TransformOptions, TransformOutput};
