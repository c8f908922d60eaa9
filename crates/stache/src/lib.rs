//! # Stache - Mustache-dialect templates with forgiving lookups
//!
//! `stache` compiles Mustache-style templates once and renders them many
//! times against arbitrary nested data. Lookups never fail: an undefined
//! name, or a dotted path broken anywhere along the way, renders as the
//! empty string.
//!
//! ## Quick Start
//!
//! ```rust
//! use stache::Mustache;
//! use serde_json::json;
//!
//! let template = Mustache::compile(
//!     "profile",
//!     "{{#user}}Hi {{user.name}}{{/user}}{{^user}}Sign in{{/user}}",
//! )
//! .unwrap();
//!
//! assert_eq!(template.render(&json!({"user": {"name": "Kim"}})).unwrap(), "Hi Kim");
//! assert_eq!(template.render(&json!({})).unwrap(), "Sign in");
//! ```
//!
//! ## Tags
//!
//! | Form | Meaning |
//! |---|---|
//! | `{{name}}` | HTML-escaped lookup |
//! | `{{{name}}}`, `{{&name}}` | unescaped lookup |
//! | `{{!comment}}` | removed from the output |
//! | `{{~code}}` | raw statement, e.g. `{{~ for x in xs }}` |
//! | `{{#name}}...{{/name}}` | rendered once when `name` is truthy |
//! | `{{^name}}...{{/name}}` | rendered once when `name` is falsy |
//! | `{{.}}` | the current section's value |
//!
//! Sections are guards, not loops. Iterate with run tags:
//!
//! ```rust
//! use stache::Mustache;
//! use serde_json::json;
//!
//! let template = Mustache::compile("list", "{{~ for x in xs }}[{{x}}]{{~ endfor }}").unwrap();
//! assert_eq!(template.render(&json!({"xs": [1, 2]})).unwrap(), "[1][2]");
//! ```
//!
//! Anything inside `{{ }}` that is not a section marker or a dotted path is
//! evaluated as a MiniJinja expression, which is how helpers are called.
//!
//! ## Modules
//!
//! - [`grammar`]: the ordered delimiter table
//! - [`transform`]: tag content to generated fragments, including context-miss resolution
//! - [`helpers`]: helper tables and the per-render helper set
//! - [`registry`]: process-wide transforms and default helpers
//! - [`template`]: compilation and rendering

pub mod error;
pub mod grammar;
pub mod helpers;
pub mod options;
pub mod registry;
pub mod template;
pub mod transform;

pub use error::{RenderError, Result};
pub use grammar::{tag_defs, TagKind};
pub use helpers::{Helper, HelperSet, Helpers};
pub use options::{EscapeMode, Options};
pub use registry::{lookup_helper, register_helper, register_transform, transform_names};
pub use template::{precompile, precompile_with, Mustache};
pub use transform::{
    guard_expression, resolve, root_reference, Builtin, Fragment, Transform, TransformTable,
};

pub use minijinja::{Error, Value};
