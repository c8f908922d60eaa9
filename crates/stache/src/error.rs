//! Error types for compiling and rendering templates.
//!
//! Template-level failures (bad delimiters, unbalanced sections) surface as
//! [`RenderError::Syntax`] with the template name, position and a few lines
//! of surrounding source. Failures raised while evaluating a template pass
//! through untouched as [`RenderError::Evaluation`] so the failing
//! expression stays visible.
//!
//! Missing data is never an error: it renders as the empty string.

use stache_scanner::{line_col, ScanError};
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    /// The template text is malformed.
    #[error("{}", format_syntax(name, *line, *col, message, context))]
    Syntax {
        name: String,
        line: usize,
        col: usize,
        message: String,
        context: String,
    },

    /// The generated source was rejected by the evaluator.
    #[error("template `{name}` failed to compile: {source}")]
    Compile {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    /// Evaluating the template failed.
    #[error(transparent)]
    Evaluation(#[from] minijinja::Error),

    /// Render data could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Options could not be parsed.
    #[error("invalid options: {0}")]
    Options(#[from] serde_yaml::Error),
}

impl RenderError {
    /// Builds a syntax error pointing at `offset` in `source`.
    pub(crate) fn syntax(name: &str, source: &str, offset: usize, message: impl Into<String>) -> Self {
        let (line, col) = line_col(source, offset);
        Self::Syntax {
            name: name.to_string(),
            line,
            col,
            message: message.into(),
            context: build_error_context(source, line),
        }
    }

    pub(crate) fn from_scan(name: &str, source: &str, err: ScanError) -> Self {
        let offset = err.offset().unwrap_or(0);
        Self::syntax(name, source, offset, err.to_string())
    }

    pub(crate) fn compile(name: &str, source: minijinja::Error) -> Self {
        Self::Compile {
            name: name.to_string(),
            source,
        }
    }

    /// Name of the template the error belongs to, when known.
    pub fn template_name(&self) -> Option<&str> {
        match self {
            Self::Syntax { name, .. } | Self::Compile { name, .. } => Some(name),
            Self::Evaluation(err) => err.name(),
            _ => None,
        }
    }
}

fn format_syntax(name: &str, line: usize, col: usize, message: &str, context: &str) -> String {
    let mut out = format!("syntax error in template `{name}` at {line}:{col}: {message}");
    if !context.is_empty() {
        out.push('\n');
        out.push_str(context.trim_end_matches('\n'));
    }
    out
}

/// Renders up to two lines either side of `error_line`, marking it with `>`.
fn build_error_context(source: &str, error_line: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let start = error_line.saturating_sub(3);
    let end = (error_line + 2).min(lines.len());
    let width = end.to_string().len();

    let mut ctx = String::new();
    for index in start..end {
        let marker = if index + 1 == error_line { ">" } else { " " };
        ctx.push_str(&format!(
            "  {} {:>width$} | {}\n",
            marker,
            index + 1,
            lines.get(index).unwrap_or(&""),
            width = width,
        ));
    }
    ctx
}
