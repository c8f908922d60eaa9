//! Helpers callable from templates.
//!
//! A helper is a named function templates call like any expression:
//! `{{ shout(name) }}`. Each render builds a fresh [`HelperSet`] from the
//! default helpers captured when the template was compiled and the extras
//! passed to that render call. Extras win on a name collision, for that call
//! only.
//!
//! Every helper also receives the data the template is being rendered with,
//! so it can look at more than its arguments.
//!
//! ```rust
//! use stache::{Error, Helpers, Mustache, Value};
//! use serde_json::json;
//!
//! let extras = Helpers::new().with("shout", |_data: &Value, args: &[Value]| -> Result<Value, Error> {
//!     Ok(Value::from(args[0].to_string().to_uppercase()))
//! });
//!
//! let template = Mustache::compile("greeting", "{{ shout(name) }}!").unwrap();
//! let out = template.render_with_helpers(&json!({"name": "ann"}), &extras).unwrap();
//! assert_eq!(out, "ANN!");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use minijinja::{Error, ErrorKind, Value};

/// A named callable available to templates.
pub trait Helper: Send + Sync {
    /// Invokes the helper with the bound render data and call arguments.
    fn call(&self, data: &Value, args: &[Value]) -> Result<Value, Error>;
}

impl<F> Helper for F
where
    F: Fn(&Value, &[Value]) -> Result<Value, Error> + Send + Sync,
{
    fn call(&self, data: &Value, args: &[Value]) -> Result<Value, Error> {
        self(data, args)
    }
}

/// A name → helper table.
///
/// Used both for the process-wide defaults and for per-render extras.
#[derive(Clone, Default)]
pub struct Helpers {
    map: BTreeMap<String, Arc<dyn Helper>>,
}

impl Helpers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a helper, builder style.
    pub fn with(mut self, name: impl Into<String>, helper: impl Helper + 'static) -> Self {
        self.insert(name, helper);
        self
    }

    /// Adds or replaces a helper.
    pub fn insert(&mut self, name: impl Into<String>, helper: impl Helper + 'static) {
        self.map.insert(name.into(), Arc::new(helper));
    }

    pub(crate) fn insert_shared(&mut self, name: String, helper: Arc<dyn Helper>) {
        self.map.insert(name, helper);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Helper>> {
        self.map.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Helper names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Helper>)> {
        self.map.iter().map(|(name, helper)| (name.as_str(), helper))
    }
}

impl fmt::Debug for Helpers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// The helpers visible to one render call, bound to that call's data.
pub struct HelperSet {
    data: Value,
    helpers: Helpers,
}

impl HelperSet {
    /// Merges `defaults` with `extras`; extras take precedence.
    pub fn new(data: Value, defaults: &Helpers, extras: Option<&Helpers>) -> Self {
        let mut helpers = defaults.clone();
        if let Some(extras) = extras {
            for (name, helper) in extras.iter() {
                helpers.insert_shared(name.to_string(), Arc::clone(helper));
            }
        }
        Self { data, helpers }
    }

    /// The data the current render is bound to.
    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Helper>> {
        self.helpers.get(name)
    }

    /// Calls a helper by name with the bound data.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, Error> {
        match self.helpers.get(name) {
            Some(helper) => helper.call(&self.data, args),
            None => Err(Error::new(
                ErrorKind::UnknownFunction,
                format!("helper `{}` is not defined", name),
            )),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.helpers.names()
    }

    /// Each helper as a template function closed over the bound data.
    pub(crate) fn functions(&self) -> impl Iterator<Item = (&str, Value)> + '_ {
        self.helpers.iter().map(|(name, helper)| {
            let data = self.data.clone();
            let helper = Arc::clone(helper);
            let function = Value::from_function(move |args: minijinja::value::Rest<Value>| {
                helper.call(&data, &args.0)
            });
            (name, function)
        })
    }
}

impl fmt::Debug for HelperSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelperSet")
            .field("data", &self.data)
            .field("helpers", &self.helpers)
            .finish()
    }
}
