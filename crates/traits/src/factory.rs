//! Type construction for instance elements.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;
use trellis_types::{Bean, Dictionary, ObjectRef, PropertyError, TypeDescriptor, Value};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FactoryError {
    #[error("Unknown type '{0}'")]
    UnknownType(String),

    #[error("Failed to construct '{type_name}': {message}")]
    Construction { type_name: String, message: String },

    #[error("'{owner_type}' has no attached property '{property}'")]
    UnknownAttachedProperty { owner_type: String, property: String },

    #[error(transparent)]
    Property(#[from] PropertyError),
}

/// Constructs objects for instance elements by qualified type name.
///
/// Hosts plug in their own factory to perform dependency-injected
/// construction.
pub trait TypeFactory {
    fn construct(&self, type_name: &str) -> Result<ObjectRef, FactoryError>;

    /// Sets `property`, a property defined by `owner_type`, on `target`.
    ///
    /// Attached properties are stored on behalf of another type, typically a
    /// container that reads them when laying out its children.
    fn set_attached(
        &self,
        owner_type: &str,
        property: &str,
        target: &ObjectRef,
        value: Value,
    ) -> Result<(), FactoryError> {
        let _ = (target, value);
        Err(FactoryError::UnknownAttachedProperty {
            owner_type: owner_type.to_string(),
            property: property.to_string(),
        })
    }
}

type Constructor = Rc<dyn Fn() -> Result<ObjectRef, FactoryError>>;
type AttachedSetter = Rc<dyn Fn(&ObjectRef, Value) -> Result<(), PropertyError>>;

/// The default factory: an explicit map from type names to constructors.
#[derive(Default)]
pub struct TypeRegistry {
    constructors: HashMap<String, Constructor>,
    descriptors: HashMap<String, Rc<TypeDescriptor>>,
    attached: HashMap<(String, String), AttachedSetter>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor; instances are [`Bean`]s.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> &mut Self {
        let descriptor = Rc::new(descriptor);
        let name = descriptor.name().to_string();
        let shared = descriptor.clone();
        self.constructors.insert(
            name.clone(),
            Rc::new(move || Ok(Rc::new(Bean::new(shared.clone())) as ObjectRef)),
        );
        self.descriptors.insert(name, descriptor);
        self
    }

    /// Registers an arbitrary constructor for `type_name`.
    pub fn register_factory(
        &mut self,
        type_name: impl Into<String>,
        constructor: impl Fn() -> Result<ObjectRef, FactoryError> + 'static,
    ) -> &mut Self {
        self.constructors
            .insert(type_name.into(), Rc::new(constructor));
        self
    }

    /// Registers the setter for the attached property `owner_type.property`.
    pub fn register_attached(
        &mut self,
        owner_type: impl Into<String>,
        property: impl Into<String>,
        setter: impl Fn(&ObjectRef, Value) -> Result<(), PropertyError> + 'static,
    ) -> &mut Self {
        self.attached
            .insert((owner_type.into(), property.into()), Rc::new(setter));
        self
    }

    pub fn has_attached(&self, owner_type: &str, property: &str) -> bool {
        self.attached
            .contains_key(&(owner_type.to_string(), property.to_string()))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }

    pub fn descriptor(&self, type_name: &str) -> Option<&Rc<TypeDescriptor>> {
        self.descriptors.get(type_name)
    }
}

impl TypeFactory for TypeRegistry {
    fn construct(&self, type_name: &str) -> Result<ObjectRef, FactoryError> {
        let constructor = self
            .constructors
            .get(type_name)
            .ok_or_else(|| FactoryError::UnknownType(type_name.to_string()))?;
        constructor()
    }

    fn set_attached(
        &self,
        owner_type: &str,
        property: &str,
        target: &ObjectRef,
        value: Value,
    ) -> Result<(), FactoryError> {
        let setter = self
            .attached
            .get(&(owner_type.to_string(), property.to_string()))
            .ok_or_else(|| FactoryError::UnknownAttachedProperty {
                owner_type: owner_type.to_string(),
                property: property.to_string(),
            })?;
        setter(target, value)?;
        Ok(())
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.constructors.keys().collect();
        names.sort();
        let mut attached: Vec<String> = self
            .attached
            .keys()
            .map(|(owner, property)| format!("{owner}.{property}"))
            .collect();
        attached.sort();
        f.debug_struct("TypeRegistry")
            .field("types", &names)
            .field("attached", &attached)
            .finish()
    }
}

/// Constructs a [`Dictionary`] tagged with the requested type name for any
/// instance element. Used to inspect documents without registered types.
///
/// Attached properties are stored on dictionary targets under their
/// qualified `Owner.property` name.
#[derive(Debug, Default, Clone, Copy)]
pub struct DictionaryFactory;

impl TypeFactory for DictionaryFactory {
    fn construct(&self, type_name: &str) -> Result<ObjectRef, FactoryError> {
        Ok(Rc::new(Dictionary::with_type_name(type_name)))
    }

    fn set_attached(
        &self,
        owner_type: &str,
        property: &str,
        target: &ObjectRef,
        value: Value,
    ) -> Result<(), FactoryError> {
        let dictionary = target
            .as_dictionary()
            .ok_or_else(|| FactoryError::UnknownAttachedProperty {
                owner_type: owner_type.to_string(),
                property: property.to_string(),
            })?;
        dictionary.put(&format!("{owner_type}.{property}"), value);
        Ok(())
    }
}
