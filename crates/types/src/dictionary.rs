use crate::notify::ChangeNotifier;
use crate::object::{HostObject, PropertyError, PropertyKind};
use crate::value::{Value, ValueType};
use indexmap::IndexMap;
use std::any::Any;
use std::cell::RefCell;

pub const DICTIONARY_TYPE: &str = "Dictionary";

/// A dictionary-shaped object: every key is a writable property.
///
/// Property elements nested in a dictionary always store under their name,
/// and `put` publishes a change for the key unless the value is unchanged.
#[derive(Debug)]
pub struct Dictionary {
    type_name: String,
    entries: RefCell<IndexMap<String, Value>>,
    notifier: ChangeNotifier,
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl Dictionary {
    pub fn new() -> Self {
        Self::with_type_name(DICTIONARY_TYPE)
    }

    /// Creates a dictionary that reports `type_name`, used for schemaless loading.
    pub fn with_type_name(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            entries: RefCell::new(IndexMap::new()),
            notifier: ChangeNotifier::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.borrow().get(key).cloned()
    }

    /// Stores `value` under `key` and returns the previous value. Publishes
    /// unless the key already held an equal value.
    pub fn put(&self, key: &str, value: Value) -> Option<Value> {
        let previous = self
            .entries
            .borrow_mut()
            .insert(key.to_string(), value.clone());
        let unchanged = previous.as_ref().is_some_and(|p| *p == value);
        if !unchanged {
            self.notifier
                .publish(key, previous.as_ref().unwrap_or(&Value::Null));
        }
        previous
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl HostObject for Dictionary {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn property_kind(&self, _name: &str) -> Option<PropertyKind> {
        Some(PropertyKind::Writable(ValueType::Any))
    }

    fn get_property(&self, name: &str) -> Result<Value, PropertyError> {
        Ok(self.get(name).unwrap_or_default())
    }

    fn set_property(&self, name: &str, value: Value) -> Result<(), PropertyError> {
        self.put(name, value);
        Ok(())
    }

    fn has_property(&self, name: &str) -> bool {
        self.contains_key(name)
    }

    fn property_names(&self) -> Vec<String> {
        self.keys()
    }

    fn as_dictionary(&self) -> Option<&Dictionary> {
        Some(self)
    }

    fn notifier(&self) -> Option<&ChangeNotifier> {
        Some(&self.notifier)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
