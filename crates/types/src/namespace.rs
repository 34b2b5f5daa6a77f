//! The id → value symbol table built during a document load.

use crate::object::{HostObject, PropertyError};
use crate::value::Value;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use thiserror::Error;

pub const PATH_SEPARATOR: char = '.';

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NamespaceError {
    #[error("ID \"{0}\" is already in use")]
    DuplicateId(String),

    #[error("Value \"{0}\" is not defined")]
    Undefined(String),

    #[error(transparent)]
    Property(#[from] PropertyError),
}

/// An append-only map from ids to values.
///
/// Cloning a `Namespace` shares the underlying table; this is how an inline
/// include sees and extends its includer's ids. Entries are never removed or
/// replaced.
#[derive(Clone, Default)]
pub struct Namespace {
    entries: Rc<RefCell<IndexMap<String, Value>>>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Value> {
        self.entries.borrow().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.borrow().contains_key(id)
    }

    /// Binds `id` to `value`. An id that is already bound keeps its value.
    pub fn put(&self, id: impl Into<String>, value: Value) -> Result<(), NamespaceError> {
        let id = id.into();
        let mut entries = self.entries.borrow_mut();
        if entries.contains_key(&id) {
            return Err(NamespaceError::DuplicateId(id));
        }
        entries.insert(id, value);
        Ok(())
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Whether both handles refer to the same table.
    pub fn shares_scope_with(&self, other: &Namespace) -> bool {
        Rc::ptr_eq(&self.entries, &other.entries)
    }

    /// A handle that does not keep the table alive, for objects that live
    /// inside the namespace they refer back to.
    pub fn downgrade(&self) -> WeakNamespace {
        WeakNamespace {
            entries: Rc::downgrade(&self.entries),
        }
    }

    /// A new, unshared table holding the same entries.
    pub fn snapshot(&self) -> Namespace {
        Namespace {
            entries: Rc::new(RefCell::new(self.entries.borrow().clone())),
        }
    }

    /// Resolves a dotted path such as `form.nameField.text`.
    ///
    /// The first segment is an id; later segments are properties of the
    /// value reached so far.
    pub fn resolve_path(&self, path: &str) -> Result<Value, NamespaceError> {
        let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
        self.resolve_segments(&segments)
    }

    pub fn resolve_segments(&self, segments: &[&str]) -> Result<Value, NamespaceError> {
        let undefined = || NamespaceError::Undefined(segments.join("."));

        let (first, rest) = segments.split_first().ok_or_else(undefined)?;
        let mut value = self.get(first).ok_or_else(undefined)?;

        for segment in rest {
            let object = value.as_object().ok_or_else(undefined)?.clone();
            if !object.has_property(segment) {
                return Err(undefined());
            }
            value = object.get_property(segment)?;
        }

        Ok(value)
    }
}

#[derive(Clone, Default)]
pub struct WeakNamespace {
    entries: Weak<RefCell<IndexMap<String, Value>>>,
}

impl WeakNamespace {
    pub fn upgrade(&self) -> Option<Namespace> {
        self.entries.upgrade().map(|entries| Namespace { entries })
    }
}

impl fmt::Debug for WeakNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakNamespace")
            .field("alive", &(self.entries.strong_count() > 0))
            .finish()
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.borrow().iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Dictionary;
    use crate::object::ObjectRef;

    #[test]
    fn test_duplicate_id_keeps_first_binding() {
        let ns = Namespace::new();
        ns.put("a", Value::Int(1)).unwrap();

        let err = ns.put("a", Value::Int(2)).unwrap_err();
        assert_eq!(err, NamespaceError::DuplicateId("a".into()));
        assert_eq!(ns.get("a"), Some(Value::Int(1)));
    }

    #[test]
    fn test_clones_share_the_table() {
        let parent = Namespace::new();
        let shared = parent.clone();
        let isolated = Namespace::new();

        shared.put("child", Value::from("x")).unwrap();
        assert!(parent.contains("child"));
        assert!(parent.shares_scope_with(&shared));
        assert!(!parent.shares_scope_with(&isolated));
    }

    #[test]
    fn test_resolve_dotted_path() {
        let ns = Namespace::new();
        let inner: ObjectRef = std::rc::Rc::new(Dictionary::new());
        inner.set_property("text", Value::from("hi")).unwrap();
        let outer: ObjectRef = std::rc::Rc::new(Dictionary::new());
        outer.set_property("inner", Value::Object(inner)).unwrap();
        ns.put("outer", Value::Object(outer)).unwrap();

        assert_eq!(ns.resolve_path("outer.inner.text").unwrap(), Value::from("hi"));
        assert!(matches!(
            ns.resolve_path("outer.missing"),
            Err(NamespaceError::Undefined(_))
        ));
        assert!(matches!(
            ns.resolve_path("outer.inner.text.deeper"),
            Err(NamespaceError::Undefined(_))
        ));
        assert!(matches!(ns.resolve_path("nobody"), Err(NamespaceError::Undefined(_))));
    }

    #[test]
    fn test_weak_handle_and_snapshot() {
        let ns = Namespace::new();
        ns.put("a", Value::Int(1)).unwrap();
        let weak = ns.downgrade();

        let copy = ns.snapshot();
        copy.put("b", Value::Int(2)).unwrap();
        assert!(!ns.contains("b"));
        assert!(!copy.shares_scope_with(&ns));

        assert!(weak.upgrade().unwrap().shares_scope_with(&ns));
        drop(ns);
        assert!(weak.upgrade().is_none());
        assert_eq!(copy.get("a"), Some(Value::Int(1)));
    }
}
