//! Declarative object types.
//!
//! A [`TypeDescriptor`] lists a type's properties and their capabilities up
//! front, so classification never needs runtime reflection. [`Bean`] is the
//! generic object built from a descriptor.

use crate::list::ObjectList;
use crate::listener::{ListenerInterface, ListenerList};
use crate::notify::ChangeNotifier;
use crate::object::{HostObject, PropertyError, PropertyKind};
use crate::value::{Value, ValueType};
use indexmap::IndexMap;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type Initializer = Rc<dyn Fn() -> Value>;

#[derive(Clone)]
enum PropertySpec {
    Writable { ty: ValueType, initial: Value },
    ReadOnly(Initializer),
    Listeners(Rc<ListenerInterface>),
}

/// The registered shape of an object type.
#[derive(Clone)]
pub struct TypeDescriptor {
    name: String,
    properties: IndexMap<String, PropertySpec>,
    default_property: Option<String>,
    id_property: Option<String>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: IndexMap::new(),
            default_property: None,
            id_property: None,
        }
    }

    /// Declares a writable property that starts out null.
    pub fn writable(self, name: impl Into<String>, ty: ValueType) -> Self {
        self.writable_with(name, ty, Value::Null)
    }

    pub fn writable_with(mut self, name: impl Into<String>, ty: ValueType, initial: Value) -> Self {
        self.properties
            .insert(name.into(), PropertySpec::Writable { ty, initial });
        self
    }

    /// Declares a read-only property whose per-instance value comes from `init`.
    pub fn read_only(mut self, name: impl Into<String>, init: impl Fn() -> Value + 'static) -> Self {
        self.properties
            .insert(name.into(), PropertySpec::ReadOnly(Rc::new(init)));
        self
    }

    /// Declares a read-only property holding a fresh [`ObjectList`] per instance.
    pub fn read_only_list(self, name: impl Into<String>) -> Self {
        self.read_only(name, || Value::Object(Rc::new(ObjectList::new())))
    }

    pub fn listeners(mut self, name: impl Into<String>, interface: ListenerInterface) -> Self {
        self.properties
            .insert(name.into(), PropertySpec::Listeners(Rc::new(interface)));
        self
    }

    pub fn default_property(mut self, name: impl Into<String>) -> Self {
        self.default_property = Some(name.into());
        self
    }

    pub fn id_property(mut self, name: impl Into<String>) -> Self {
        self.id_property = Some(name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn property_kind(&self, name: &str) -> Option<PropertyKind> {
        self.properties.get(name).map(|spec| match spec {
            PropertySpec::Writable { ty, .. } => PropertyKind::Writable(*ty),
            PropertySpec::ReadOnly(_) => PropertyKind::ReadOnly,
            PropertySpec::Listeners(iface) => PropertyKind::Listeners(iface.clone()),
        })
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .field("default_property", &self.default_property)
            .field("id_property", &self.id_property)
            .finish()
    }
}

/// A generic object whose properties are described by a [`TypeDescriptor`].
///
/// A `set_property` that changes a value publishes on the bean's notifier.
pub struct Bean {
    descriptor: Rc<TypeDescriptor>,
    values: RefCell<IndexMap<String, Value>>,
    listeners: IndexMap<String, ListenerList>,
    notifier: ChangeNotifier,
}

impl Bean {
    pub fn new(descriptor: Rc<TypeDescriptor>) -> Self {
        let mut values = IndexMap::new();
        let mut listeners = IndexMap::new();
        for (name, spec) in &descriptor.properties {
            match spec {
                PropertySpec::Writable { initial, .. } => {
                    values.insert(name.clone(), initial.clone());
                }
                PropertySpec::ReadOnly(init) => {
                    values.insert(name.clone(), init());
                }
                PropertySpec::Listeners(iface) => {
                    listeners.insert(name.clone(), ListenerList::new(iface.clone()));
                }
            }
        }

        Self {
            descriptor,
            values: RefCell::new(values),
            listeners,
            notifier: ChangeNotifier::new(),
        }
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    fn no_such_property(&self, name: &str) -> PropertyError {
        PropertyError::NoSuchProperty {
            type_name: self.descriptor.name.clone(),
            property: name.to_string(),
        }
    }
}

impl HostObject for Bean {
    fn type_name(&self) -> &str {
        &self.descriptor.name
    }

    fn property_kind(&self, name: &str) -> Option<PropertyKind> {
        self.descriptor.property_kind(name)
    }

    fn get_property(&self, name: &str) -> Result<Value, PropertyError> {
        self.values
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| self.no_such_property(name))
    }

    fn set_property(&self, name: &str, value: Value) -> Result<(), PropertyError> {
        let ty = match self.descriptor.properties.get(name) {
            Some(PropertySpec::Writable { ty, .. }) => *ty,
            Some(_) => {
                return Err(PropertyError::ReadOnly {
                    type_name: self.descriptor.name.clone(),
                    property: name.to_string(),
                });
            }
            None => return Err(self.no_such_property(name)),
        };

        let value = ty.coerce(name, value)?;
        let previous = self
            .values
            .borrow_mut()
            .insert(name.to_string(), value.clone())
            .unwrap_or_default();
        if previous != value {
            self.notifier.publish(name, &previous);
        }
        Ok(())
    }

    fn property_names(&self) -> Vec<String> {
        self.values.borrow().keys().cloned().collect()
    }

    fn default_property(&self) -> Option<&str> {
        self.descriptor.default_property.as_deref()
    }

    fn id_property(&self) -> Option<&str> {
        self.descriptor.id_property.as_deref()
    }

    fn listeners(&self, name: &str) -> Option<&ListenerList> {
        self.listeners.get(name)
    }

    fn notifier(&self) -> Option<&ChangeNotifier> {
        Some(&self.notifier)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for Bean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bean")
            .field("type", &self.descriptor.name)
            .field("values", &self.values.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::ReturnKind;
    use crate::object::Sequence;
    use std::cell::Cell;

    fn label() -> Rc<TypeDescriptor> {
        Rc::new(
            TypeDescriptor::new("org.example.Label")
                .writable("text", ValueType::String)
                .writable_with("width", ValueType::Int, Value::Int(0))
                .read_only_list("styles")
                .listeners(
                    "labelListeners",
                    ListenerInterface::new("LabelListener").method("textChanged", ReturnKind::Unit),
                )
                .default_property("text")
                .id_property("name"),
        )
    }

    #[test]
    fn test_set_coerces_to_declared_type() {
        let bean = Bean::new(label());
        bean.set_property("width", Value::from("120")).unwrap();
        assert_eq!(bean.get_property("width").unwrap(), Value::Int(120));
    }

    #[test]
    fn test_capabilities_come_from_descriptor() {
        let bean = Bean::new(label());
        assert_eq!(
            bean.property_kind("text"),
            Some(PropertyKind::Writable(ValueType::String))
        );
        assert_eq!(bean.property_kind("styles"), Some(PropertyKind::ReadOnly));
        assert!(matches!(
            bean.property_kind("labelListeners"),
            Some(PropertyKind::Listeners(_))
        ));
        assert_eq!(bean.property_kind("nope"), None);
        assert_eq!(bean.default_property(), Some("text"));
    }

    #[test]
    fn test_read_only_values_are_per_instance() {
        let a = Bean::new(label());
        let b = Bean::new(label());
        let a_styles = a.get_property("styles").unwrap();
        a_styles
            .as_object()
            .and_then(|o| o.as_sequence())
            .unwrap()
            .append(Value::from("bold"))
            .unwrap();

        let b_styles = b.get_property("styles").unwrap();
        assert_eq!(b_styles.as_object().unwrap().as_sequence().unwrap().len(), 0);
        assert!(matches!(
            a.set_property("styles", Value::Null),
            Err(PropertyError::ReadOnly { .. })
        ));
    }

    #[test]
    fn test_set_publishes_only_changes() {
        let bean = Bean::new(label());
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        bean.notifier()
            .unwrap()
            .subscribe("text", move |_, _| h.set(h.get() + 1));

        bean.set_property("text", Value::from("a")).unwrap();
        bean.set_property("text", Value::from("a")).unwrap();
        assert_eq!(hits.get(), 1);
        bean.set_property("text", Value::from("b")).unwrap();
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_unknown_property_is_rejected() {
        let bean = Bean::new(label());
        assert!(matches!(
            bean.set_property("colour", Value::Null),
            Err(PropertyError::NoSuchProperty { .. })
        ));
    }
}
