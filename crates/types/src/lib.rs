//! Object model for the trellis markup loader.
//!
//! Host applications expose their objects to the loader through
//! [`HostObject`]. Generic objects can be declared with a [`TypeDescriptor`]
//! and instantiated as [`Bean`]s; [`Dictionary`] and [`ObjectList`] cover
//! dictionary-shaped and list-shaped content. [`Namespace`] is the id table
//! a load produces.

pub mod bean;
pub mod dictionary;
pub mod list;
pub mod listener;
pub mod namespace;
pub mod notify;
pub mod object;
pub mod value;

pub use bean::{Bean, TypeDescriptor};
pub use dictionary::{DICTIONARY_TYPE, Dictionary};
pub use list::{LIST_TYPE, ObjectList};
pub use listener::{
    Listener, ListenerError, ListenerInterface, ListenerList, ListenerMethod, ReturnKind, Vote,
};
pub use namespace::{Namespace, NamespaceError, PATH_SEPARATOR, WeakNamespace};
pub use notify::{ChangeCallback, ChangeNotifier};
pub use object::{
    HostObject, ObjectRef, PropertyError, PropertyKind, Sequence, downcast, object_id, same_object,
};
pub use value::{Value, ValueType};
