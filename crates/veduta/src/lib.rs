//! # veduta
//!
//! Veduta - template type checking for single-file components.
//!
//! ## Name Origin
//!
//! A **veduta** (Italian, "view") is a painting of a city rendered so
//! faithfully that the scene can be surveyed from the canvas alone.
//! Veduta renders a component template into a synthetic TypeScript
//! program faithful enough that type-checking the program *is*
//! type-checking the template - and maps every finding back onto the
//! original markup.
//!
//! This facade re-exports the two workspace crates:
//!
//! - [`cartone`]: the template AST and source-range model the external
//!   SFC parser produces.
//! - [`sinopia`]: the interpolation transform, source map, diagnostic
//!   mapper, and validation service.
//!
//! ## Quick tour
//!
//! ```no_run
//! use veduta::sinopia::{transform_template, TransformOptions};
//! # fn parsed_template() -> veduta::cartone::TemplateRoot { unimplemented!() }
//!
//! let source = "<p>{{ msg }}</p>";
//! let root = parsed_template();
//! let output = transform_template(source, &root, &TransformOptions::default());
//! // output.code holds the synthetic program; output.source_map maps
//! // checker spans back into `source`.
//! ```

pub use veduta_cartone as cartone;
pub use veduta_sinopia as sinopia;
