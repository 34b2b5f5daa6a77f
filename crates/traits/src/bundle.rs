//! Localized resource bundles consulted for `%key` attribute values.

use crate::resource::ResourceError;
use indexmap::IndexMap;
use std::fmt::Debug;
use std::rc::Rc;
use trellis_types::Value;

/// A key → value lookup, typically holding localized strings.
pub trait ResourceBundle: Debug {
    /// Returns the value for `key`, or `None` if neither this bundle nor
    /// any parent defines it.
    fn lookup(&self, key: &str) -> Option<Value>;
}

/// Builds bundles from base names, used by include `resources` overrides.
pub trait ResourceBundleLoader: Debug {
    /// Loads the bundle named `base_name`, chained onto `parent`.
    fn load_bundle(
        &self,
        base_name: &str,
        parent: Option<Rc<dyn ResourceBundle>>,
    ) -> Result<Rc<dyn ResourceBundle>, ResourceError>;
}

/// A bundle backed by an in-memory map.
#[derive(Debug, Default)]
pub struct MapResourceBundle {
    values: IndexMap<String, Value>,
    parent: Option<Rc<dyn ResourceBundle>>,
}

impl MapResourceBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(parent: Rc<dyn ResourceBundle>) -> Self {
        Self {
            values: IndexMap::new(),
            parent: Some(parent),
        }
    }

    pub fn insert(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl ResourceBundle for MapResourceBundle {
    fn lookup(&self, key: &str) -> Option<Value> {
        self.values
            .get(key)
            .cloned()
            .or_else(|| self.parent.as_ref().and_then(|p| p.lookup(key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_falls_back_to_parent() {
        let parent: Rc<dyn ResourceBundle> =
            Rc::new(MapResourceBundle::new().insert("title", "Parent").insert("ok", "OK"));
        let child = MapResourceBundle::with_parent(parent).insert("title", "Child");

        assert_eq!(child.lookup("title"), Some(Value::from("Child")));
        assert_eq!(child.lookup("ok"), Some(Value::from("OK")));
        assert_eq!(child.lookup("cancel"), None);
    }
}
