use crate::error::Location;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use trellis_types::Value;

/// How an element participates in building the object graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ElementKind {
    Instance,
    ReadOnlyProperty,
    WritableProperty,
    /// `<Owner.property>`: a property `Owner` attaches to the parent object.
    AttachedProperty,
    ListenerProperty,
    Include,
    Script,
    Define,
    Reference,
}

impl ElementKind {
    pub fn accepts_id(self) -> bool {
        matches!(self, ElementKind::Instance | ElementKind::Include)
    }

    /// Whether `Owner.member` attributes may be applied to the value.
    pub fn accepts_attached(self) -> bool {
        matches!(self, ElementKind::Instance | ElementKind::Include)
    }

    pub fn accepts_bindings(self) -> bool {
        matches!(
            self,
            ElementKind::Instance | ElementKind::Include | ElementKind::ReadOnlyProperty
        )
    }

    /// Attribute names stored raw as control properties for this kind.
    pub fn control_properties(self) -> &'static [&'static str] {
        match self {
            ElementKind::Include => &[
                crate::INCLUDE_SRC_ATTRIBUTE,
                crate::INCLUDE_RESOURCES_ATTRIBUTE,
                crate::INCLUDE_INLINE_ATTRIBUTE,
                crate::INCLUDE_CHARSET_ATTRIBUTE,
            ],
            ElementKind::Script => &[crate::SCRIPT_SRC_ATTRIBUTE],
            ElementKind::Reference => &[crate::REFERENCE_ID_ATTRIBUTE],
            _ => &[],
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementKind::Instance => "instance",
            ElementKind::ReadOnlyProperty => "read-only property",
            ElementKind::WritableProperty => "writable property",
            ElementKind::AttachedProperty => "attached property",
            ElementKind::ListenerProperty => "listener list property",
            ElementKind::Include => "include",
            ElementKind::Script => "script",
            ElementKind::Define => "define",
            ElementKind::Reference => "reference",
        };
        f.write_str(name)
    }
}

/// An `Owner.member` attribute, applied once the element's value has been
/// composed into its parent.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AttachedAttribute {
    /// `Owner` qualified by the element's namespace.
    pub owner_type: String,
    /// `Owner` as written.
    pub owner: String,
    pub member: String,
    pub value: String,
}

/// The parse-time record of an open element.
#[derive(Debug)]
pub(crate) struct Element {
    pub kind: ElementKind,
    /// The tag for instances and control elements, the property name otherwise.
    pub name: String,
    pub value: Value,
    pub id: Option<String>,
    pub control: HashMap<String, String>,
    /// Resolved attributes, applied in order when the element closes.
    pub attributes: IndexMap<String, Value>,
    pub attached: Vec<AttachedAttribute>,
    pub text: Option<String>,
    pub location: Location,
}

impl Element {
    pub fn new(kind: ElementKind, name: String, value: Value, location: Location) -> Self {
        Self {
            kind,
            name,
            value,
            id: None,
            control: HashMap::new(),
            attributes: IndexMap::new(),
            attached: Vec::new(),
            text: None,
            location,
        }
    }

    pub fn control(&self, name: &str) -> Option<&str> {
        self.control.get(name).map(String::as_str)
    }

    /// Records an attribute; a repeated name keeps its position but takes
    /// the new value.
    pub fn set_attribute(&mut self, name: String, value: Value) {
        self.attributes.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_attribute_write_wins_in_first_position() {
        let mut element = Element::new(
            ElementKind::Instance,
            "Label".into(),
            Value::Null,
            Location::default(),
        );
        element.set_attribute("text".into(), Value::from("a"));
        element.set_attribute("width".into(), Value::from("10"));
        element.set_attribute("text".into(), Value::from("b"));

        let applied: Vec<(&String, &Value)> = element.attributes.iter().collect();
        assert_eq!(applied[0], (&"text".to_string(), &Value::from("b")));
        assert_eq!(applied.len(), 2);
    }

    #[test]
    fn test_kind_capabilities() {
        assert!(ElementKind::Include.accepts_id());
        assert!(!ElementKind::Reference.accepts_id());
        assert!(ElementKind::ReadOnlyProperty.accepts_bindings());
        assert!(!ElementKind::WritableProperty.accepts_bindings());
        assert!(ElementKind::Include.accepts_attached());
        assert!(!ElementKind::AttachedProperty.accepts_attached());
        assert!(!ElementKind::AttachedProperty.accepts_id());
        assert_eq!(ElementKind::Script.control_properties(), &["src"]);
    }
}
