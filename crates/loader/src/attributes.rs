//! Attribute value syntax.
//!
//! | form        | meaning                                   |
//! |-------------|-------------------------------------------|
//! | `${a.b}`    | binding to `b` of the object `a`, deferred |
//! | `@path`     | URL relative to the document location     |
//! | `%key`      | resource bundle lookup                    |
//! | `$a.b`      | symbol table lookup, `$bxml:null` is null |
//! | `@@`, `%%`, `$$` | the literal text minus one sentinel  |

use crate::error::{LoadError, Location};
use crate::{
    BINDING_PREFIX, BINDING_SUFFIX, BXML_PREFIX, NULL_KEYWORD, OBJECT_REFERENCE_PREFIX,
    RESOURCE_KEY_PREFIX, URL_PREFIX,
};
use trellis_traits::ResourceBundle;
use trellis_types::{Namespace, Value};
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AttributeValue {
    Resolved(Value),
    /// The source path of a deferred binding, without the markers.
    Binding(String),
}

/// What a raw attribute value may refer to.
pub(crate) struct AttributeScope<'a> {
    pub location: Option<&'a Url>,
    pub resources: Option<&'a dyn ResourceBundle>,
    pub namespace: &'a Namespace,
}

pub(crate) fn resolve_attribute(
    raw: &str,
    scope: &AttributeScope<'_>,
    at: Location,
) -> Result<AttributeValue, LoadError> {
    if let Some(path) = raw
        .strip_prefix(BINDING_PREFIX)
        .and_then(|rest| rest.strip_suffix(BINDING_SUFFIX))
    {
        let path = path.trim();
        if path.is_empty() {
            return Err(LoadError::structure("Invalid binding expression.", at));
        }
        return Ok(AttributeValue::Binding(path.to_string()));
    }

    let value = if let Some(rest) = raw.strip_prefix(URL_PREFIX) {
        resolve_url(rest, scope, at)?
    } else if let Some(rest) = raw.strip_prefix(RESOURCE_KEY_PREFIX) {
        resolve_resource(rest, scope, at)?
    } else if let Some(rest) = raw.strip_prefix(OBJECT_REFERENCE_PREFIX) {
        resolve_reference(rest, scope, at)?
    } else {
        Value::String(raw.to_string())
    };
    Ok(AttributeValue::Resolved(value))
}

fn resolve_url(rest: &str, scope: &AttributeScope<'_>, at: Location) -> Result<Value, LoadError> {
    if rest.is_empty() {
        return Err(LoadError::structure("Invalid URL resolution argument.", at));
    }
    if rest.starts_with(URL_PREFIX) {
        return Ok(Value::String(rest.to_string()));
    }
    let base = scope.location.ok_or(LoadError::NoBaseLocation)?;
    base.join(rest)
        .map(Value::Url)
        .map_err(|source| LoadError::Url {
            url: rest.to_string(),
            source,
        })
}

fn resolve_resource(
    rest: &str,
    scope: &AttributeScope<'_>,
    at: Location,
) -> Result<Value, LoadError> {
    if rest.is_empty() {
        return Err(LoadError::structure("Invalid resource resolution argument.", at));
    }
    if rest.starts_with(RESOURCE_KEY_PREFIX) {
        return Ok(Value::String(rest.to_string()));
    }
    let found = scope.resources.and_then(|bundle| bundle.lookup(rest));
    if found.is_none() {
        log::debug!("Resource key '{rest}' is undefined, using it literally");
    }
    Ok(found.unwrap_or_else(|| Value::String(rest.to_string())))
}

fn resolve_reference(
    rest: &str,
    scope: &AttributeScope<'_>,
    at: Location,
) -> Result<Value, LoadError> {
    if rest.is_empty() {
        return Err(LoadError::structure("Invalid object resolution argument.", at));
    }
    if rest.starts_with(OBJECT_REFERENCE_PREFIX) {
        return Ok(Value::String(rest.to_string()));
    }
    if rest.strip_prefix(BXML_PREFIX).and_then(|r| r.strip_prefix(':')) == Some(NULL_KEYWORD) {
        return Ok(Value::Null);
    }
    Ok(scope.namespace.resolve_path(rest)?)
}
