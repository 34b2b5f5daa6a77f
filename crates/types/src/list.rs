use crate::object::{HostObject, PropertyError, PropertyKind, Sequence};
use crate::value::{Value, ValueType};
use std::any::Any;
use std::cell::RefCell;

pub const LIST_TYPE: &str = "List";

/// A growable container of values; children composed into it are appended.
#[derive(Debug, Default)]
pub struct ObjectList {
    items: RefCell<Vec<Value>>,
}

impl ObjectList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> Vec<Value> {
        self.items.borrow().clone()
    }
}

impl Sequence for ObjectList {
    fn append(&self, value: Value) -> Result<(), PropertyError> {
        self.items.borrow_mut().push(value);
        Ok(())
    }

    fn len(&self) -> usize {
        self.items.borrow().len()
    }

    fn get(&self, index: usize) -> Option<Value> {
        self.items.borrow().get(index).cloned()
    }
}

impl HostObject for ObjectList {
    fn type_name(&self) -> &str {
        LIST_TYPE
    }

    // Indices resolve in dotted paths, e.g. `form.rows.0`.
    fn property_kind(&self, name: &str) -> Option<PropertyKind> {
        if name == "length" {
            return Some(PropertyKind::ReadOnly);
        }
        let index = name.parse::<usize>().ok()?;
        (index < self.len()).then_some(PropertyKind::Writable(ValueType::Any))
    }

    fn get_property(&self, name: &str) -> Result<Value, PropertyError> {
        if name == "length" {
            return Ok(Value::Int(self.len() as i64));
        }
        name.parse::<usize>()
            .ok()
            .and_then(|index| Sequence::get(self, index))
            .ok_or_else(|| PropertyError::NoSuchProperty {
                type_name: LIST_TYPE.to_string(),
                property: name.to_string(),
            })
    }

    fn set_property(&self, name: &str, value: Value) -> Result<(), PropertyError> {
        let mut items = self.items.borrow_mut();
        match name.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(PropertyError::ReadOnly {
                type_name: LIST_TYPE.to_string(),
                property: name.to_string(),
            }),
        }
    }

    fn as_sequence(&self) -> Option<&dyn Sequence> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
