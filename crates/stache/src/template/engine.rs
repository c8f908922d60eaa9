//! Compiled templates and rendering.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use minijinja::{AutoEscape, Environment, Error, Output, State, Value};
use serde::Serialize;

use super::compiler::{Compiler, DATA, UNESCAPED_FILTER};
use crate::error::{RenderError, Result};
use crate::helpers::{HelperSet, Helpers};
use crate::options::Options;
use crate::registry;

type NativeRender = dyn Fn(&serde_json::Value, &HelperSet) -> Result<String> + Send + Sync;

#[derive(Clone)]
enum Body {
    Template(Arc<Environment<'static>>),
    Native(Arc<NativeRender>),
}

/// A compiled template.
///
/// Compile once, render many times. A `Mustache` is immutable and can be
/// shared between threads.
///
/// ```rust
/// use stache::Mustache;
/// use serde_json::json;
///
/// let template = Mustache::compile("greeting", "Hello {{name}}!").unwrap();
/// assert_eq!(template.render(&json!({"name": "World"})).unwrap(), "Hello World!");
/// assert_eq!(template.render(&json!({})).unwrap(), "Hello !");
/// ```
#[derive(Clone)]
pub struct Mustache {
    name: String,
    source: Option<String>,
    body: Body,
    helpers: Helpers,
}

impl Mustache {
    /// Compiles template text with default options.
    ///
    /// # Errors
    ///
    /// [`RenderError::Syntax`] for malformed tags or sections and
    /// [`RenderError::Compile`] when the generated source is rejected.
    pub fn compile(name: impl Into<String>, text: &str) -> Result<Self> {
        Self::compile_with(name, text, &Options::default())
    }

    /// Compiles template text with explicit options.
    pub fn compile_with(name: impl Into<String>, text: &str, options: &Options) -> Result<Self> {
        let name = name.into();
        let (transforms, helpers) = registry::snapshot();
        let generated = Compiler::new(&name, text, &transforms, options).compile()?;
        tracing::debug!(
            template = %name,
            tags = generated.tags,
            source_len = generated.source.len(),
            "compiled template"
        );
        Self::build(name, generated.source, helpers, options)
    }

    /// Builds a template from source returned by [`precompile`](crate::precompile).
    pub fn from_precompiled(name: impl Into<String>, source: impl Into<String>) -> Result<Self> {
        Self::from_precompiled_with(name, source, &Options::default())
    }

    /// [`Mustache::from_precompiled`] with explicit options.
    pub fn from_precompiled_with(
        name: impl Into<String>,
        source: impl Into<String>,
        options: &Options,
    ) -> Result<Self> {
        let name = name.into();
        let (_, helpers) = registry::snapshot();
        tracing::debug!(template = %name, "loading precompiled template");
        Self::build(name, source.into(), helpers, options)
    }

    /// Wraps a native render function.
    ///
    /// The function receives the render data (an empty object when none was
    /// given) and the helpers for that call. Such templates have no source.
    ///
    /// ```rust
    /// use stache::Mustache;
    ///
    /// let template = Mustache::from_fn("count", |data, helpers| {
    ///     Ok(format!("{} keys, {} helpers", data.as_object().map_or(0, |m| m.len()), helpers.names().count()))
    /// });
    /// assert!(template.source().is_none());
    /// ```
    pub fn from_fn<F>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&serde_json::Value, &HelperSet) -> Result<String> + Send + Sync + 'static,
    {
        let (_, helpers) = registry::snapshot();
        Self {
            name: name.into(),
            source: None,
            body: Body::Native(Arc::new(render)),
            helpers,
        }
    }

    fn build(name: String, source: String, helpers: Helpers, options: &Options) -> Result<Self> {
        let env = environment(&name, source.clone(), options)?;
        Ok(Self {
            name,
            source: Some(source),
            body: Body::Template(Arc::new(env)),
            helpers,
        })
    }

    /// Name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Generated source, if the template was built from text.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Default helpers captured when the template was built.
    pub fn helpers(&self) -> &Helpers {
        &self.helpers
    }

    /// Renders with the given data.
    pub fn render<T: Serialize + ?Sized>(&self, data: &T) -> Result<String> {
        let value = serde_json::to_value(data)?;
        self.render_value(Some(&value), None)
    }

    /// Renders with the given data and extra helpers for this call only.
    pub fn render_with_helpers<T: Serialize + ?Sized>(
        &self,
        data: &T,
        extras: &Helpers,
    ) -> Result<String> {
        let value = serde_json::to_value(data)?;
        self.render_value(Some(&value), Some(extras))
    }

    /// Renders already-serialized data.
    ///
    /// Missing or `null` data renders against an empty object.
    pub fn render_value(
        &self,
        data: Option<&serde_json::Value>,
        extras: Option<&Helpers>,
    ) -> Result<String> {
        let empty = serde_json::Value::Object(serde_json::Map::new());
        let data = match data {
            None | Some(serde_json::Value::Null) => &empty,
            Some(data) => data,
        };

        let helpers = HelperSet::new(Value::from_serialize(data), &self.helpers, extras);
        match &self.body {
            Body::Template(env) => {
                let template = env.get_template(&self.name)?;
                Ok(template.render(context(data, &helpers))?)
            }
            Body::Native(render) => render(data, &helpers),
        }
    }
}

impl fmt::Debug for Mustache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mustache")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("helpers", &self.helpers)
            .finish_non_exhaustive()
    }
}

fn environment(name: &str, source: String, options: &Options) -> Result<Environment<'static>> {
    let mut env = Environment::new();
    // Root names resolve from the render data only.
    let globals: Vec<String> = env.globals().map(|(name, _)| name.to_string()).collect();
    for name in globals {
        env.remove_global(&name);
    }
    env.set_keep_trailing_newline(options.keep_trailing_newline);
    let escape = options.escape;
    env.set_auto_escape_callback(move |_name: &str| escape.auto_escape());
    env.set_formatter(format_value);
    env.add_filter(UNESCAPED_FILTER, unescaped);
    env.add_template_owned(name.to_string(), source)
        .map_err(|err| RenderError::compile(name, err))?;
    Ok(env)
}

/// Helpers first, then `_data`, then the top-level data keys, so data wins
/// over a helper of the same name.
fn context(data: &serde_json::Value, helpers: &HelperSet) -> Value {
    let mut ctx: HashMap<String, Value> = helpers
        .functions()
        .map(|(name, function)| (name.to_string(), function))
        .collect();
    ctx.insert(DATA.to_string(), helpers.data().clone());
    if let serde_json::Value::Object(map) = data {
        for (key, value) in map {
            ctx.insert(key.clone(), Value::from_serialize(value));
        }
    }
    Value::from(ctx)
}

/// `none` renders as nothing. Under HTML escaping only `& < > " '` are
/// replaced; other modes go through the stock formatter.
fn format_value(
    out: &mut Output<'_>,
    state: &State<'_, '_>,
    value: &Value,
) -> std::result::Result<(), Error> {
    if value.is_none() || value.is_undefined() {
        return Ok(());
    }
    if state.auto_escape() != AutoEscape::Html || value.is_safe() {
        return minijinja::escape_formatter(out, state, value);
    }
    out.write_str(&escape_html(&value.to_string()))?;
    Ok(())
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn unescaped(value: Value) -> Value {
    if value.is_none() || value.is_undefined() {
        return Value::from("");
    }
    match value.as_str() {
        Some(text) => Value::from_safe_string(text.to_string()),
        None => Value::from_safe_string(value.to_string()),
    }
}
