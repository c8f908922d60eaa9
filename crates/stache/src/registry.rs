//! Process-wide transform and helper registry.
//!
//! The registry holds the transform table every compilation starts from and
//! the default helpers every compiled template captures. It supports
//! registration and lookup only; there is no reset.
//!
//! Register everything during initialization, before templates are compiled.
//! A template snapshots both tables when it is compiled, so later
//! registrations never reach templates that already exist. Registering while
//! other threads are compiling is memory safe but gives no guarantee about
//! which templates see the new entry.
//!
//! ```rust
//! use stache::{register_helper, Error, Mustache, Value};
//!
//! register_helper("twice", |_data: &Value, args: &[Value]| -> Result<Value, Error> {
//!     Ok(Value::from(format!("{0}{0}", args[0])))
//! });
//!
//! let template = Mustache::compile("echo", "{{ twice(word) }}").unwrap();
//! assert_eq!(template.render(&serde_json::json!({"word": "ab"})).unwrap(), "abab");
//! ```

use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;

use crate::helpers::{Helper, Helpers};
use crate::transform::{Transform, TransformTable};

#[derive(Default)]
struct Registry {
    transforms: TransformTable,
    helpers: Helpers,
}

static REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(Registry::default()));

/// Adds a transform after the existing ones, or replaces the transform
/// registered under the same name in its current position.
///
/// Built-ins are registered as `section`, `inverted`, `close` and
/// `context_miss`.
pub fn register_transform(name: impl Into<String>, transform: impl Transform + 'static) {
    let name = name.into();
    tracing::trace!(name = %name, "registering transform");
    let mut registry = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    registry.transforms.insert(name, Arc::new(transform));
}

/// Adds or replaces a default helper.
pub fn register_helper(name: impl Into<String>, helper: impl Helper + 'static) {
    let name = name.into();
    tracing::trace!(name = %name, "registering helper");
    let mut registry = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    registry.helpers.insert(name, helper);
}

/// Looks up a default helper by name.
pub fn lookup_helper(name: &str) -> Option<Arc<dyn Helper>> {
    let registry = REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
    registry.helpers.get(name).cloned()
}

/// Names of the registered transforms, in the order they are consulted.
pub fn transform_names() -> Vec<String> {
    let registry = REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
    registry
        .transforms
        .names()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Copies of both tables, taken when a template is compiled.
pub(crate) fn snapshot() -> (TransformTable, Helpers) {
    let registry = REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
    (registry.transforms.clone(), registry.helpers.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Fragment;
    use minijinja::{Error, Value};
    use serial_test::serial;

    #[test]
    #[serial]
    fn builtins_come_first() {
        let names = transform_names();
        assert_eq!(
            &names[..4],
            &["section", "inverted", "close", "context_miss"]
        );
    }

    #[test]
    #[serial]
    fn registered_transform_is_appended_once() {
        let shout = |content: &str| {
            content
                .strip_prefix("registry_test!")
                .map(|name| Fragment::Output(format!("{}|upper", name)))
        };
        register_transform("registry_test_shout", shout);
        register_transform("registry_test_shout", shout);

        let names = transform_names();
        let count = names
            .iter()
            .filter(|name| *name == "registry_test_shout")
            .count();
        assert_eq!(count, 1);

        let (table, _) = snapshot();
        assert_eq!(
            table.apply("registry_test!name"),
            Some(Fragment::Output("name|upper".into()))
        );
    }

    #[test]
    #[serial]
    fn helper_lookup() {
        assert!(lookup_helper("registry_test_missing").is_none());
        register_helper(
            "registry_test_one",
            |_: &Value, _: &[Value]| -> Result<Value, Error> { Ok(Value::from(1)) },
        );
        let helper = lookup_helper("registry_test_one").unwrap();
        assert_eq!(helper.call(&Value::UNDEFINED, &[]).unwrap(), Value::from(1));
    }

    #[test]
    #[serial]
    fn snapshot_is_detached() {
        let (_, before) = snapshot();
        register_helper(
            "registry_test_late",
            |_: &Value, _: &[Value]| -> Result<Value, Error> { Ok(Value::from(true)) },
        );
        assert!(!before.contains("registry_test_late"));
        let (_, after) = snapshot();
        assert!(after.contains("registry_test_late"));
    }
}
