//! Dynamically typed values flowing between markup, objects and scripts.

use crate::listener::Vote;
use crate::object::{ObjectRef, PropertyError, same_object};
use std::fmt;
use std::rc::Rc;
use url::Url;

/// A value that can be stored in a property, a dictionary or the symbol table.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Url(Url),
    Vote(Vote),
    Object(ObjectRef),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// A short label for the kind of value, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Url(_) => "url",
            Value::Vote(_) => "vote",
            Value::Object(_) => "object",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Url(a), Value::Url(b)) => a == b,
            (Value::Vote(a), Value::Vote(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => same_object(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Url(u) => write!(f, "Url({u})"),
            Value::Vote(v) => write!(f, "Vote({v:?})"),
            Value::Object(o) => write!(f, "Object({} @ {:p})", o.type_name(), Rc::as_ptr(o)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => f.write_str(s),
            Value::Url(u) => write!(f, "{u}"),
            Value::Vote(v) => write!(f, "{v:?}"),
            Value::Object(o) => write!(f, "[{}]", o.type_name()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<Url> for Value {
    fn from(u: Url) -> Self {
        Value::Url(u)
    }
}

impl From<Vote> for Value {
    fn from(v: Vote) -> Self {
        Value::Vote(v)
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}

/// The declared type of a writable property.
///
/// Markup attributes arrive as strings; `coerce` converts them to the
/// declared type when the property is set. `Null` is accepted by every type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueType {
    #[default]
    Any,
    Bool,
    Int,
    Float,
    String,
    Url,
    Object,
}

impl ValueType {
    pub fn coerce(self, property: &str, value: Value) -> Result<Value, PropertyError> {
        let mismatch = |value: &Value| PropertyError::Coercion {
            property: property.to_string(),
            expected: self,
            found: value.to_string(),
        };

        match (self, value) {
            (ValueType::Any, v) | (_, v @ Value::Null) => Ok(v),
            (ValueType::Bool, v @ Value::Bool(_)) => Ok(v),
            (ValueType::Bool, Value::String(s)) => match s.trim() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(mismatch(&Value::String(s))),
            },
            (ValueType::Int, v @ Value::Int(_)) => Ok(v),
            (ValueType::Int, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| mismatch(&Value::String(s))),
            (ValueType::Float, v @ Value::Float(_)) => Ok(v),
            (ValueType::Float, Value::Int(i)) => Ok(Value::Float(i as f64)),
            (ValueType::Float, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| mismatch(&Value::String(s))),
            (ValueType::String, Value::Object(o)) => Err(mismatch(&Value::Object(o))),
            (ValueType::String, v @ Value::String(_)) => Ok(v),
            (ValueType::String, v) => Ok(Value::String(v.to_string())),
            (ValueType::Url, v @ Value::Url(_)) => Ok(v),
            (ValueType::Url, Value::String(s)) => Url::parse(s.trim())
                .map(Value::Url)
                .map_err(|_| mismatch(&Value::String(s))),
            (ValueType::Object, v @ Value::Object(_)) => Ok(v),
            (_, v) => Err(mismatch(&v)),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Any => "any",
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::Url => "url",
            ValueType::Object => "object",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Dictionary;

    #[test]
    fn test_coerce_strings_to_declared_types() {
        assert_eq!(
            ValueType::Int.coerce("width", Value::from("42")).unwrap(),
            Value::Int(42)
        );
        assert_eq!(
            ValueType::Float.coerce("ratio", Value::from(" 0.5 ")).unwrap(),
            Value::Float(0.5)
        );
        assert_eq!(
            ValueType::Bool.coerce("enabled", Value::from("false")).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            ValueType::String.coerce("text", Value::Int(7)).unwrap(),
            Value::from("7")
        );
    }

    #[test]
    fn test_coerce_rejects_malformed_input() {
        let err = ValueType::Int.coerce("width", Value::from("wide")).unwrap_err();
        assert!(err.to_string().contains("width"));
        assert!(ValueType::Bool.coerce("enabled", Value::from("yes")).is_err());
    }

    #[test]
    fn test_null_is_accepted_by_every_type() {
        for ty in [ValueType::Bool, ValueType::Int, ValueType::Url, ValueType::Object] {
            assert!(ty.coerce("p", Value::Null).unwrap().is_null());
        }
    }

    #[test]
    fn test_object_equality_is_identity() {
        let a: ObjectRef = Rc::new(Dictionary::new());
        let b: ObjectRef = Rc::new(Dictionary::new());
        assert_eq!(Value::Object(a.clone()), Value::Object(a.clone()));
        assert_ne!(Value::Object(a), Value::Object(b));
    }

    #[test]
    fn test_int_widens_to_float() {
        assert_eq!(
            ValueType::Float.coerce("x", Value::Int(3)).unwrap(),
            Value::Float(3.0)
        );
        assert_eq!(Value::Int(3).as_float(), Some(3.0));
    }
}
