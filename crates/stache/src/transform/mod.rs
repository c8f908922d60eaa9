//! Content transforms.
//!
//! A transform looks at the trimmed text inside an interpolation tag and
//! decides what it means: a section opening, an inverted section, a section
//! close, or a guarded lookup. It answers with a [`Fragment`], or `None` when
//! the content is not its concern.
//!
//! Transforms are consulted in table order and the first one that answers
//! wins. When none answers, the content is emitted unchanged as a raw
//! expression.
//!
//! ```rust
//! use stache::{Builtin, Fragment, Transform};
//!
//! assert_eq!(
//!     Builtin::Section.apply("#items"),
//!     Some(Fragment::Open { name: "items".into() })
//! );
//! assert_eq!(Builtin::Section.apply("#items.first"), None);
//! ```

mod resolver;

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

pub use resolver::{guard_expression, resolve, root_reference};

/// What a piece of tag content compiles to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Opens a section guarded by `name`; an empty name guards on the
    /// current context.
    Open { name: String },
    /// Opens a section that renders when `name` is falsy.
    Inverted { name: String },
    /// Closes the innermost open section.
    Close { name: String },
    /// An expression whose value is written to the output.
    Output(String),
    /// The current context (`.`).
    Current,
    /// A statement emitted verbatim.
    Statement(String),
}

/// Turns tag content into a [`Fragment`].
///
/// Implementations must be pure: the same content always yields the same
/// answer. Closures of the matching shape implement this trait.
pub trait Transform: Send + Sync {
    fn apply(&self, content: &str) -> Option<Fragment>;
}

impl<F> Transform for F
where
    F: Fn(&str) -> Option<Fragment> + Send + Sync,
{
    fn apply(&self, content: &str) -> Option<Fragment> {
        self(content)
    }
}

static SECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#([A-Za-z0-9_]*)$").expect("section pattern is valid"));
static INVERTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\^([A-Za-z0-9_]*)$").expect("inverted pattern is valid"));
static CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/([A-Za-z0-9_]*)$").expect("close pattern is valid"));

/// The transforms every table starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `#name` opens a section.
    Section,
    /// `^name` opens an inverted section.
    Inverted,
    /// `/name` closes a section.
    Close,
    /// Dotted paths and `.` become guarded lookups.
    ContextMiss,
}

impl Builtin {
    /// Built-ins in the order they are consulted.
    pub const ALL: [Builtin; 4] = [
        Builtin::Section,
        Builtin::Inverted,
        Builtin::Close,
        Builtin::ContextMiss,
    ];

    /// Name the built-in is registered under.
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Section => "section",
            Builtin::Inverted => "inverted",
            Builtin::Close => "close",
            Builtin::ContextMiss => "context_miss",
        }
    }
}

fn marker_name(pattern: &Regex, content: &str) -> Option<String> {
    pattern
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|name| name.as_str().to_string())
}

impl Transform for Builtin {
    fn apply(&self, content: &str) -> Option<Fragment> {
        match self {
            Builtin::Section => marker_name(&SECTION, content).map(|name| Fragment::Open { name }),
            Builtin::Inverted => {
                marker_name(&INVERTED, content).map(|name| Fragment::Inverted { name })
            }
            Builtin::Close => marker_name(&CLOSE, content).map(|name| Fragment::Close { name }),
            Builtin::ContextMiss => resolve(content),
        }
    }
}

/// An ordered, named list of transforms.
#[derive(Clone)]
pub struct TransformTable {
    entries: Vec<(String, Arc<dyn Transform>)>,
}

impl TransformTable {
    /// A table holding only the built-ins.
    pub fn builtin() -> Self {
        let entries = Builtin::ALL
            .iter()
            .map(|builtin| {
                (
                    builtin.name().to_string(),
                    Arc::new(*builtin) as Arc<dyn Transform>,
                )
            })
            .collect();
        Self { entries }
    }

    /// Adds a transform at the end of the table, or replaces the entry of
    /// the same name where it stands.
    pub fn insert(&mut self, name: impl Into<String>, transform: Arc<dyn Transform>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = transform,
            None => self.entries.push((name, transform)),
        }
    }

    /// Names in consultation order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs the transforms in order and returns the first answer.
    pub fn apply(&self, content: &str) -> Option<Fragment> {
        self.entries
            .iter()
            .find_map(|(_, transform)| transform.apply(content))
    }
}

impl Default for TransformTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for TransformTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
