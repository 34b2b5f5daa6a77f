//! A small widget toolkit registered as generic beans.

use std::rc::Rc;
use trellis::{
    Dictionary, HostObject, ListenerInterface, ObjectRef, PropertyError, ReturnKind,
    TypeDescriptor, TypeRegistry, Value, ValueType,
};

pub const UI_NAMESPACE: &str = "org.example.ui";

pub fn window() -> TypeDescriptor {
    TypeDescriptor::new("Window")
        .writable("title", ValueType::String)
        .writable("name", ValueType::String)
        .read_only_list("content")
        .listeners(
            "windowListeners",
            ListenerInterface::new("WindowListener")
                .method("previewClose", ReturnKind::Vote)
                .method("closed", ReturnKind::Unit),
        )
        .default_property("content")
        .id_property("name")
}

/// Holds the properties containers attach to a child.
fn layout_attributes() -> Value {
    Value::Object(Rc::new(Dictionary::new()))
}

pub fn label() -> TypeDescriptor {
    TypeDescriptor::new("Label")
        .writable("text", ValueType::String)
        .writable("name", ValueType::String)
        .read_only("attributes", layout_attributes)
        .default_property("text")
        .id_property("name")
}

pub fn button() -> TypeDescriptor {
    TypeDescriptor::new("Button")
        .writable("buttonData", ValueType::Any)
        .writable("enabled", ValueType::Bool)
        .writable("width", ValueType::Int)
        .writable("name", ValueType::String)
        .read_only("attributes", layout_attributes)
        .listeners(
            "buttonPressListeners",
            ListenerInterface::new("ButtonPressListener")
                .method("buttonPressed", ReturnKind::Unit)
                .method("isRepeatable", ReturnKind::Bool),
        )
        .id_property("name")
}

pub fn panel() -> TypeDescriptor {
    TypeDescriptor::new("Panel")
        .writable("name", ValueType::String)
        .read_only_list("children")
        .default_property("children")
        .id_property("name")
}

/// A container whose default property holds a single child.
pub fn border() -> TypeDescriptor {
    TypeDescriptor::new("Border")
        .writable("content", ValueType::Object)
        .writable("image", ValueType::Url)
        .default_property("content")
}

pub fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .register(window())
        .register(label())
        .register(button())
        .register(panel())
        .register(border());

    let namespaced = TypeDescriptor::new(format!("{UI_NAMESPACE}.Window"))
        .writable("title", ValueType::String)
        .read_only_list("content")
        .default_property("content");
    registry.register(namespaced);

    registry.register_attached("Panel", "column", |target, value| {
        let column = ValueType::Int.coerce("column", value)?;
        let attributes = target.get_property("attributes")?;
        let dictionary = attributes
            .as_object()
            .and_then(|attributes| attributes.as_dictionary())
            .ok_or_else(|| {
                PropertyError::Custom(format!("{} cannot hold attached properties", target.type_name()))
            })?;
        dictionary.put("Panel.column", column);
        Ok(())
    });
    registry
}

/// A property a container attached to `value`.
pub fn attached(value: &Value, name: &str) -> Option<Value> {
    let attributes = prop(value, "attributes");
    object(&attributes).as_dictionary()?.get(name)
}

pub fn prop(value: &Value, name: &str) -> Value {
    object(value).get_property(name).unwrap()
}

pub fn object(value: &Value) -> &ObjectRef {
    value.as_object().expect("value is not an object")
}

/// The items of a list-valued property.
pub fn items(value: &Value, name: &str) -> Vec<Value> {
    let list = prop(value, name);
    let sequence = object(&list).as_sequence().expect("not a sequence");
    (0..sequence.len()).filter_map(|i| sequence.get(i)).collect()
}
