//! Compilation options.
//!
//! Options can be built in code or loaded from YAML:
//!
//! ```rust
//! use stache::{EscapeMode, Options};
//!
//! let options = Options::from_yaml("escape: none\nstrict_sections: false").unwrap();
//! assert_eq!(options.escape, EscapeMode::None);
//! assert!(!options.strict_sections);
//! assert!(options.keep_trailing_newline);
//!
//! let built = Options::default().with_escape(EscapeMode::None).with_strict_sections(false);
//! assert_eq!(built, options);
//! ```

use minijinja::AutoEscape;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How interpolated values are escaped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscapeMode {
    /// HTML-escape escaped interpolations.
    #[default]
    Html,
    /// Write every value as-is.
    None,
}

impl EscapeMode {
    pub(crate) fn auto_escape(self) -> AutoEscape {
        match self {
            EscapeMode::Html => AutoEscape::Html,
            EscapeMode::None => AutoEscape::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Escaping applied to `{{name}}` tags.
    pub escape: EscapeMode,
    /// Reject unbalanced or mismatched sections at compile time.
    pub strict_sections: bool,
    /// Keep a final newline of the template in the output.
    pub keep_trailing_newline: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            escape: EscapeMode::Html,
            strict_sections: true,
            keep_trailing_newline: true,
        }
    }
}

impl Options {
    /// Parses options from YAML. Missing keys keep their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn with_escape(mut self, escape: EscapeMode) -> Self {
        self.escape = escape;
        self
    }

    pub fn with_strict_sections(mut self, strict: bool) -> Self {
        self.strict_sections = strict;
        self
    }

    pub fn with_keep_trailing_newline(mut self, keep: bool) -> Self {
        self.keep_trailing_newline = keep;
        self
    }
}
