//! JSON-backed resource bundles.
//!
//! A bundle named `com.example.Strings` lives at `com/example/Strings.json`
//! below the loader's root location. Locale overlays such as
//! `Strings_fr.json` and `Strings_fr_CA.json` are applied on top, but only
//! replace keys the base bundle already defines.

use crate::locale::Locale;
use serde_json::{Map, Value as Json};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use trellis_traits::{ResourceBundle, ResourceBundleLoader, ResourceError, ResourceProvider};
use trellis_types::{Dictionary, ObjectList, ObjectRef, PATH_SEPARATOR, Sequence, Value};
use url::Url;

pub struct JsonResourceBundle {
    values: Map<String, Json>,
    parent: Option<Rc<dyn ResourceBundle>>,
}

impl JsonResourceBundle {
    /// Parses a bundle whose top level must be a JSON object.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ResourceError> {
        Ok(Self {
            values: parse_object(bytes, "bundle")?,
            parent: None,
        })
    }

    pub fn with_parent(mut self, parent: Option<Rc<dyn ResourceBundle>>) -> Self {
        self.parent = parent;
        self
    }

    /// Applies `overrides`, replacing only keys already present.
    /// Nested objects are merged key by key.
    pub fn overlay(&mut self, overrides: Map<String, Json>) {
        apply_overrides(&mut self.values, overrides);
    }

    fn find(&self, key: &str) -> Option<&Json> {
        if let Some(value) = self.values.get(key) {
            return Some(value);
        }
        let mut segments = key.split(PATH_SEPARATOR);
        let mut current = self.values.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }
}

fn parse_object(bytes: &[u8], what: &str) -> Result<Map<String, Json>, ResourceError> {
    match serde_json::from_slice::<Json>(bytes) {
        Ok(Json::Object(map)) => Ok(map),
        Ok(other) => Err(ResourceError::InvalidFormat(format!(
            "{what} must be a JSON object, found {}",
            json_kind(&other)
        ))),
        Err(e) => Err(ResourceError::InvalidFormat(format!("{what}: {e}"))),
    }
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

fn apply_overrides(target: &mut Map<String, Json>, overrides: Map<String, Json>) {
    for (key, replacement) in overrides {
        let Some(existing) = target.get_mut(&key) else {
            log::debug!("Ignoring override for undefined bundle key '{key}'");
            continue;
        };
        match (existing, replacement) {
            (Json::Object(inner), Json::Object(nested)) => apply_overrides(inner, nested),
            (slot, replacement) => *slot = replacement,
        }
    }
}

/// Converts JSON into loader values; objects and arrays become host objects.
pub fn json_to_value(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => {
            let list = ObjectList::new();
            for item in items {
                // ObjectList accepts any value
                let _ = list.append(json_to_value(item));
            }
            Value::Object(Rc::new(list) as ObjectRef)
        }
        Json::Object(map) => {
            let dictionary = Dictionary::new();
            for (key, value) in map {
                dictionary.put(key, json_to_value(value));
            }
            Value::Object(Rc::new(dictionary) as ObjectRef)
        }
    }
}

impl ResourceBundle for JsonResourceBundle {
    fn lookup(&self, key: &str) -> Option<Value> {
        match self.find(key) {
            Some(json) => Some(json_to_value(json)),
            None => self.parent.as_ref().and_then(|p| p.lookup(key)),
        }
    }
}

impl fmt::Debug for JsonResourceBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonResourceBundle")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

/// Loads [`JsonResourceBundle`]s through a [`ResourceProvider`].
#[derive(Debug)]
pub struct JsonBundleLoader {
    provider: Arc<dyn ResourceProvider>,
    root: Url,
    locale: Option<Locale>,
}

impl JsonBundleLoader {
    pub fn new(provider: Arc<dyn ResourceProvider>, root: Url) -> Self {
        Self {
            provider,
            root,
            locale: None,
        }
    }

    pub fn with_locale(mut self, locale: Option<Locale>) -> Self {
        self.locale = locale;
        self
    }

    fn location(&self, base_name: &str, suffix: &str) -> Result<Url, ResourceError> {
        let path = format!("{}{suffix}.json", base_name.replace(PATH_SEPARATOR, "/"));
        self.root
            .join(&path)
            .map_err(|e| ResourceError::InvalidFormat(format!("{base_name}: {e}")))
    }
}

impl ResourceBundleLoader for JsonBundleLoader {
    fn load_bundle(
        &self,
        base_name: &str,
        parent: Option<Rc<dyn ResourceBundle>>,
    ) -> Result<Rc<dyn ResourceBundle>, ResourceError> {
        let base = self.location(base_name, "")?;
        let data = self.provider.load(&base)?;
        let mut bundle = JsonResourceBundle::from_slice(&data)?.with_parent(parent);

        if let Some(locale) = &self.locale {
            for suffix in locale.overlay_suffixes() {
                let overlay = self.location(base_name, &suffix)?;
                if !self.provider.exists(&overlay) {
                    continue;
                }
                log::debug!("Applying bundle overlay {overlay}");
                let data = self.provider.load(&overlay)?;
                bundle.overlay(parse_object(&data, overlay.as_str())?);
            }
        }

        Ok(Rc::new(bundle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_traits::{InMemoryResourceProvider, MapResourceBundle};
    use trellis_types::HostObject;

    fn provider() -> Arc<InMemoryResourceProvider> {
        let provider = InMemoryResourceProvider::new();
        provider
            .add(
                "file:///app/com/example/Strings.json",
                r#"{"greeting": "Hello", "menu": {"file": "File", "edit": "Edit"}, "count": 3}"#,
            )
            .unwrap();
        provider
            .add(
                "file:///app/com/example/Strings_fr.json",
                r#"{"greeting": "Bonjour", "menu": {"file": "Fichier"}, "extra": "ignored"}"#,
            )
            .unwrap();
        provider
            .add(
                "file:///app/com/example/Strings_fr_CA.json",
                r#"{"greeting": "Allo"}"#,
            )
            .unwrap();
        Arc::new(provider)
    }

    fn loader(locale: Option<Locale>) -> JsonBundleLoader {
        JsonBundleLoader::new(provider(), Url::parse("file:///app/").unwrap()).with_locale(locale)
    }

    #[test]
    fn test_dotted_lookup_into_nested_objects() {
        let bundle = loader(None).load_bundle("com.example.Strings", None).unwrap();
        assert_eq!(bundle.lookup("greeting"), Some(Value::from("Hello")));
        assert_eq!(bundle.lookup("menu.edit"), Some(Value::from("Edit")));
        assert_eq!(bundle.lookup("count"), Some(Value::Int(3)));
        assert_eq!(bundle.lookup("menu.missing"), None);

        let menu = bundle.lookup("menu").unwrap().into_object().unwrap();
        assert_eq!(menu.get_property("file").unwrap(), Value::from("File"));
    }

    #[test]
    fn test_locale_overlays_only_replace_existing_keys() {
        let bundle = loader(Locale::parse("fr"))
            .load_bundle("com.example.Strings", None)
            .unwrap();
        assert_eq!(bundle.lookup("greeting"), Some(Value::from("Bonjour")));
        assert_eq!(bundle.lookup("menu.file"), Some(Value::from("Fichier")));
        assert_eq!(bundle.lookup("menu.edit"), Some(Value::from("Edit")));
        assert_eq!(bundle.lookup("extra"), None);

        let bundle = loader(Locale::parse("fr_CA"))
            .load_bundle("com.example.Strings", None)
            .unwrap();
        assert_eq!(bundle.lookup("greeting"), Some(Value::from("Allo")));
        assert_eq!(bundle.lookup("menu.file"), Some(Value::from("Fichier")));
    }

    #[test]
    fn test_missing_keys_fall_back_to_parent() {
        let parent: Rc<dyn ResourceBundle> =
            Rc::new(MapResourceBundle::new().insert("title", "Main"));
        let bundle = loader(None)
            .load_bundle("com.example.Strings", Some(parent))
            .unwrap();
        assert_eq!(bundle.lookup("title"), Some(Value::from("Main")));
        assert_eq!(bundle.lookup("greeting"), Some(Value::from("Hello")));
    }

    #[test]
    fn test_missing_bundle_is_not_found() {
        let result = loader(None).load_bundle("com.example.Missing", None);
        assert!(matches!(result, Err(ResourceError::NotFound(_))));
    }

    #[test]
    fn test_non_object_bundle_is_rejected() {
        let result = JsonResourceBundle::from_slice(b"[1, 2]");
        assert!(matches!(result, Err(ResourceError::InvalidFormat(msg)) if msg.contains("array")));
    }
}
