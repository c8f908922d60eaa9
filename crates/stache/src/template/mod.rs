//! Compiling template text and rendering the result.
//!
//! [`Mustache`] is the compiled form of a template. Template text is scanned
//! with the dialect's grammar, each tag is turned into a fragment of
//! generated source, and the generated source is handed to MiniJinja, which
//! evaluates it at render time.

mod compiler;
mod engine;

pub use compiler::{precompile, precompile_with};
pub use engine::Mustache;
