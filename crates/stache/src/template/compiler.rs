//! Template text to generated source.
//!
//! The compiler walks the scanned segments once. Text is copied through,
//! comments vanish, run tags become statements, and interpolation tags go
//! through the transform table. Section opens and closes become `if` blocks
//! and are tracked on a stack so `.` knows which section it sits in.
//!
//! | Template | Generated |
//! |---|---|
//! | `{{name}}` | `{{ (name if name is defined else "") }}` |
//! | `{{{name}}}` | `{{ ((name if name is defined else ""))\|unescaped }}` |
//! | `{{none}}` | `{{ (_data["none"] if _data["none"] is defined else "") }}` |
//! | `{{#flag}}` | `{% if flag %}` |
//! | `{{^flag}}` | `{% if not flag %}` |
//! | `{{/flag}}` | `{% endif %}` |
//! | `{{.}}` | `{{ flag }}` inside `flag`, `{{ _data }}` at the top level |
//! | `{{~ code }}` | `{% code %}` |

use stache_scanner::{Segment, Tag};

use crate::error::{RenderError, Result};
use crate::grammar::{scanner, TagKind};
use crate::options::Options;
use crate::registry;
use crate::transform::{root_reference, Fragment, TransformTable};

/// Context key the whole render data is bound to.
pub(crate) const DATA: &str = "_data";

/// Filter applied to unescaped interpolations.
pub(crate) const UNESCAPED_FILTER: &str = "unescaped";

/// Returns the generated source for `text` without building a template.
///
/// The result can be stored and later turned into a template with
/// [`Mustache::from_precompiled`](crate::Mustache::from_precompiled).
///
/// ```rust
/// let source = stache::precompile("hello", "Hi {{#name}}there{{/name}}").unwrap();
/// assert_eq!(source, "Hi {% if name %}there{% endif %}");
/// ```
pub fn precompile(name: &str, text: &str) -> Result<String> {
    precompile_with(name, text, &Options::default())
}

/// [`precompile`] with explicit options.
pub fn precompile_with(name: &str, text: &str, options: &Options) -> Result<String> {
    let (transforms, _) = registry::snapshot();
    Ok(Compiler::new(name, text, &transforms, options).compile()?.source)
}

pub(crate) struct Generated {
    pub(crate) source: String,
    pub(crate) tags: usize,
}

struct OpenSection {
    name: String,
    guard: String,
    inverted: bool,
    offset: usize,
}

pub(crate) struct Compiler<'a> {
    name: &'a str,
    text: &'a str,
    table: &'a TransformTable,
    options: &'a Options,
    out: String,
    sections: Vec<OpenSection>,
}

impl<'a> Compiler<'a> {
    pub(crate) fn new(
        name: &'a str,
        text: &'a str,
        table: &'a TransformTable,
        options: &'a Options,
    ) -> Self {
        Self {
            name,
            text,
            table,
            options,
            out: String::with_capacity(text.len()),
            sections: Vec::new(),
        }
    }

    pub(crate) fn compile(mut self) -> Result<Generated> {
        let segments = scanner()
            .scan(self.text)
            .map_err(|err| RenderError::from_scan(self.name, self.text, err))?;

        let mut tags = 0;
        for segment in &segments {
            match segment {
                Segment::Text { text, .. } => self.push_text(text)?,
                Segment::Tag(tag) => {
                    tags += 1;
                    self.tag(tag)?;
                }
            }
        }

        if self.options.strict_sections {
            if let Some(open) = self.sections.last() {
                return Err(self.error(
                    open.offset,
                    format!("unclosed section `{}`", section_label(&open.name)),
                ));
            }
        }

        Ok(Generated {
            source: self.out,
            tags,
        })
    }

    fn tag(&mut self, tag: &Tag<'_, TagKind>) -> Result<()> {
        let at = tag.position();

        for kind in [tag.open, tag.close] {
            if kind.is_reserved() {
                return Err(self.error(at, format!("unsupported tag `{}`", kind.literal())));
            }
        }

        let triple = tag.open_text == TagKind::UnescapedOpen.literal();
        if triple && tag.close != TagKind::UnescapedClose {
            return Err(self.error(at, "`{{{` must be closed with `}}}`"));
        }

        match tag.open {
            TagKind::CommentOpen => {}
            TagKind::RunOpen => {
                let code = tag.content.trim();
                if !code.is_empty() {
                    self.statement(code);
                }
            }
            TagKind::EscapedOpen => self.interpolate(tag.content, false, at)?,
            TagKind::UnescapedOpen => self.interpolate(tag.content, true, at)?,
            other => {
                return Err(self.error(at, format!("unexpected `{}`", other.literal())));
            }
        }

        // `}}}` ends a non-triple tag with `}}`; the third brace is text.
        if tag.close == TagKind::UnescapedClose && !triple {
            self.push_text("}")?;
        }
        Ok(())
    }

    fn interpolate(&mut self, content: &str, unescaped: bool, at: usize) -> Result<()> {
        let content = content.trim();
        if content.is_empty() {
            return Err(self.error(at, "empty tag"));
        }

        let fragment = self
            .table
            .apply(content)
            .unwrap_or_else(|| Fragment::Output(content.to_string()));
        self.emit(fragment, unescaped, at)
    }

    fn emit(&mut self, fragment: Fragment, unescaped: bool, at: usize) -> Result<()> {
        match fragment {
            Fragment::Open { name } => {
                let guard = self.guard(&name);
                self.statement(&format!("if {}", guard));
                self.sections.push(OpenSection {
                    name,
                    guard,
                    inverted: false,
                    offset: at,
                });
            }
            Fragment::Inverted { name } => {
                let guard = self.guard(&name);
                self.statement(&format!("if not {}", guard));
                self.sections.push(OpenSection {
                    name,
                    guard,
                    inverted: true,
                    offset: at,
                });
            }
            Fragment::Close { name } => {
                self.close(&name, at)?;
                self.statement("endif");
            }
            Fragment::Output(expr) => self.output(&expr, unescaped),
            Fragment::Current => {
                let current = self.current();
                self.output(&current, unescaped);
            }
            Fragment::Statement(code) => self.statement(&code),
        }
        Ok(())
    }

    fn close(&mut self, name: &str, at: usize) -> Result<()> {
        let open = self.sections.pop();
        if !self.options.strict_sections {
            return Ok(());
        }

        match open {
            None => Err(self.error(
                at,
                format!("`{{{{/{}}}}}` closes no open section", name),
            )),
            Some(open) if !open.name.is_empty() && !name.is_empty() && open.name != name => {
                Err(self.error(
                    at,
                    format!("section `{}` closed by `{{{{/{}}}}}`", open.name, name),
                ))
            }
            Some(_) => Ok(()),
        }
    }

    fn guard(&self, name: &str) -> String {
        if name.is_empty() {
            self.current()
        } else {
            root_reference(name)
        }
    }

    /// The innermost named section's guard, or the whole data.
    fn current(&self) -> String {
        self.sections
            .iter()
            .rev()
            .find(|section| !section.inverted && !section.name.is_empty())
            .map_or_else(|| DATA.to_string(), |section| section.guard.clone())
    }

    fn output(&mut self, expr: &str, unescaped: bool) {
        if unescaped {
            self.out
                .push_str(&format!("{{{{ ({})|{} }}}}", expr, UNESCAPED_FILTER));
        } else {
            self.out.push_str(&format!("{{{{ {} }}}}", expr));
        }
    }

    fn statement(&mut self, code: &str) {
        self.out.push_str(&format!("{{% {} %}}", code));
    }

    fn push_text(&mut self, text: &str) -> Result<()> {
        if !text.contains('{') {
            self.out.push_str(text);
            return Ok(());
        }

        // Trailing newlines stay outside the raw block so newline trimming
        // treats them like plain text.
        let body = text.trim_end_matches('\n');
        let tail = &text[body.len()..];
        if body.contains("endraw") {
            let literal = serde_json::to_string(body)?;
            self.out.push_str(&format!("{{{{ {}|safe }}}}", literal));
        } else {
            self.out.push_str("{% raw %}");
            self.out.push_str(body);
            self.out.push_str("{% endraw %}");
        }
        self.out.push_str(tail);
        Ok(())
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> RenderError {
        RenderError::syntax(self.name, self.text, offset, message)
    }
}

fn section_label(name: &str) -> &str {
    if name.is_empty() {
        "{{#}}"
    } else {
        name
    }
}
