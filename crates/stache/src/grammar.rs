//! The tag grammar of the dialect.
//!
//! [`tag_defs`] returns the ordered delimiter table handed to the scanner.
//! Order is priority: at any position in the template the first definition
//! that matches wins, so every delimiter that shares a prefix with a shorter
//! one is listed ahead of it.
//!
//! | Literal | Kind | Notes |
//! |---|---|---|
//! | `{{$` | [`TagKind::TemplateOpen`] | reserved, rejected when used |
//! | `$}}` | [`TagKind::TemplateClose`] | reserved, rejected when used |
//! | `{{{` | [`TagKind::UnescapedOpen`] | also matches `{{&` |
//! | `{{!` | [`TagKind::CommentOpen`] | swallows the whitespace before it back to the previous non-blank line |
//! | `{{~` | [`TagKind::RunOpen`] | |
//! | `{{` | [`TagKind::EscapedOpen`] | |
//! | `}}}` | [`TagKind::UnescapedClose`] | |
//! | `}}` | [`TagKind::Close`] | |

use once_cell::sync::Lazy;
use stache_scanner::{Scanner, TagDef};

/// Every delimiter the dialect recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    TemplateOpen,
    TemplateClose,
    UnescapedOpen,
    CommentOpen,
    RunOpen,
    EscapedOpen,
    UnescapedClose,
    Close,
}

impl TagKind {
    /// Canonical spelling of the delimiter.
    pub fn literal(self) -> &'static str {
        match self {
            TagKind::TemplateOpen => "{{$",
            TagKind::TemplateClose => "$}}",
            TagKind::UnescapedOpen => "{{{",
            TagKind::CommentOpen => "{{!",
            TagKind::RunOpen => "{{~",
            TagKind::EscapedOpen => "{{",
            TagKind::UnescapedClose => "}}}",
            TagKind::Close => "}}",
        }
    }

    /// Reserved delimiters occupy a grammar slot but cannot be used.
    pub fn is_reserved(self) -> bool {
        matches!(self, TagKind::TemplateOpen | TagKind::TemplateClose)
    }
}

/// Returns the delimiter table in priority order.
pub fn tag_defs() -> Vec<TagDef<TagKind>> {
    vec![
        TagDef::open(TagKind::TemplateOpen, "{{$"),
        TagDef::close(TagKind::TemplateClose, "$}}"),
        TagDef::open(TagKind::UnescapedOpen, "{{{").with_pattern(r"\{\{[\{&]"),
        TagDef::open(TagKind::CommentOpen, "{{!").with_pattern(r"\n\s*\{\{!|\{\{!"),
        TagDef::open(TagKind::RunOpen, "{{~"),
        TagDef::open(TagKind::EscapedOpen, "{{"),
        TagDef::close(TagKind::UnescapedClose, "}}}"),
        TagDef::close(TagKind::Close, "}}"),
    ]
}

static SCANNER: Lazy<Scanner<TagKind>> =
    Lazy::new(|| Scanner::new(tag_defs()).expect("built-in tag grammar is valid"));

pub(crate) fn scanner() -> &'static Scanner<TagKind> {
    &SCANNER
}
