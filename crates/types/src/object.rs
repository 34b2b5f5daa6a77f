//! The property-access contract every host object fulfils.
//!
//! The loader never inspects concrete Rust types. It classifies property
//! elements through [`HostObject::property_kind`], composes children through
//! the default property or [`Sequence`], and observes changes through the
//! object's [`ChangeNotifier`].

use crate::dictionary::Dictionary;
use crate::listener::{ListenerInterface, ListenerList};
use crate::namespace::Namespace;
use crate::notify::ChangeNotifier;
use crate::value::{Value, ValueType};
use std::any::Any;
use std::rc::Rc;
use thiserror::Error;
use url::Url;

/// A shared reference to a host object. Identity is pointer identity.
pub type ObjectRef = Rc<dyn HostObject>;

/// Errors raised while reading or writing object properties.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropertyError {
    #[error("'{property}' is not a property of {type_name}")]
    NoSuchProperty { type_name: String, property: String },

    #[error("Property '{property}' of {type_name} is read-only")]
    ReadOnly { type_name: String, property: String },

    #[error("Cannot convert '{found}' to {expected} for property '{property}'")]
    Coercion {
        property: String,
        expected: ValueType,
        found: String,
    },

    #[error("{0}")]
    Custom(String),
}

/// How a named property of an object may be used from markup.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKind {
    /// A settable property holding values of the given type.
    Writable(ValueType),
    /// A property that can only be read; nested markup configures its value.
    ReadOnly,
    /// A collection of listeners implementing the given interface.
    Listeners(Rc<ListenerInterface>),
}

/// An object the loader can construct, configure and compose.
///
/// Setters take `&self`: objects are shared through [`ObjectRef`] and use
/// interior mutability.
pub trait HostObject: Any {
    /// The registered type name of this object.
    fn type_name(&self) -> &str;

    /// The capability of the named property, or `None` if it does not exist.
    fn property_kind(&self, name: &str) -> Option<PropertyKind>;

    fn get_property(&self, name: &str) -> Result<Value, PropertyError>;

    fn set_property(&self, name: &str, value: Value) -> Result<(), PropertyError>;

    /// Whether `name` resolves to a value on this object, used for path lookup.
    fn has_property(&self, name: &str) -> bool {
        matches!(
            self.property_kind(name),
            Some(PropertyKind::Writable(_) | PropertyKind::ReadOnly)
        )
    }

    /// Names of the value-holding properties, in declaration order.
    fn property_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// The property that receives nested child content.
    fn default_property(&self) -> Option<&str> {
        None
    }

    /// The property that is set to the element id when one is assigned.
    fn id_property(&self) -> Option<&str> {
        None
    }

    /// Returns the dictionary view if this object is dictionary-shaped.
    fn as_dictionary(&self) -> Option<&Dictionary> {
        None
    }

    /// Returns the sequence view if children can be appended directly.
    fn as_sequence(&self) -> Option<&dyn Sequence> {
        None
    }

    /// The listener collection behind a `Listeners` property.
    fn listeners(&self, _name: &str) -> Option<&ListenerList> {
        None
    }

    /// The change channel for this object, if it publishes property changes.
    fn notifier(&self) -> Option<&ChangeNotifier> {
        None
    }

    /// Called on the root object once the whole document is loaded and bound.
    fn initialize(&self, _namespace: &Namespace, _location: Option<&Url>) -> Result<(), PropertyError> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;
}

/// An ordered container that children can be appended to.
pub trait Sequence {
    fn append(&self, value: Value) -> Result<(), PropertyError>;

    fn len(&self) -> usize;

    fn get(&self, index: usize) -> Option<Value>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Returns an identity key for an object, stable for the object's lifetime.
pub fn object_id(object: &ObjectRef) -> usize {
    Rc::as_ptr(object) as *const () as usize
}

pub fn same_object(a: &ObjectRef, b: &ObjectRef) -> bool {
    object_id(a) == object_id(b)
}

/// Downcasts a shared object to a concrete type.
pub fn downcast<T: HostObject>(object: &ObjectRef) -> Option<&T> {
    object.as_any().downcast_ref::<T>()
}
