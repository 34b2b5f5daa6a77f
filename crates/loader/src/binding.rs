//! Deferred property bindings.
//!
//! Bindings are collected while the tree is built and applied once it is
//! complete. Each binding applies once, then subscribes to its source's
//! change notifier so later writes to the source key are pushed to the
//! target.

use crate::MAPPING_DELIMITER;
use crate::error::{LoadError, Location};
use std::fmt;
use std::rc::{Rc, Weak};
use trellis_traits::ScriptEngine;
use trellis_types::{HostObject, Namespace, ObjectRef, PATH_SEPARATOR, Value};

/// A `${…}` attribute waiting for the tree to be complete.
pub(crate) struct PendingBinding {
    pub target: ObjectRef,
    pub target_key: String,
    pub expression: String,
    pub location: Location,
}

struct BindMapping {
    engine: Rc<dyn ScriptEngine>,
    function: String,
}

impl BindMapping {
    fn evaluate(&self, value: Value) -> Result<Value, LoadError> {
        Ok(self.engine.invoke_function(&self.function, &[value])?)
    }
}

/// A live, one-directional mapping from `source.source_key` to
/// `target.target_key`.
///
/// Both ends are held weakly; the source's notifier owns the binding.
pub(crate) struct Binding {
    source: Weak<dyn HostObject>,
    source_key: String,
    target: Weak<dyn HostObject>,
    target_key: String,
    mapping: Option<BindMapping>,
}

impl Binding {
    /// Copies the current source value, mapped if requested, to the target.
    /// Does nothing once either end has been dropped, or when the target
    /// already holds the value.
    pub fn apply(&self) -> Result<(), LoadError> {
        let (Some(source), Some(target)) = (self.source.upgrade(), self.target.upgrade()) else {
            return Ok(());
        };
        let value = source.get_property(&self.source_key)?;
        let value = match &self.mapping {
            Some(mapping) => mapping.evaluate(value)?,
            None => value,
        };
        if target
            .get_property(&self.target_key)
            .is_ok_and(|current| current == value)
        {
            return Ok(());
        }
        target.set_property(&self.target_key, value)?;
        Ok(())
    }
}

impl fmt::Debug for PendingBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingBinding")
            .field("target_key", &self.target_key)
            .field("expression", &self.expression)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("source_key", &self.source_key)
            .field("target_key", &self.target_key)
            .field("mapping", &self.mapping.as_ref().map(|m| &m.function))
            .finish()
    }
}

/// Splits `fn:a.b.c` into the optional mapping function and the path.
fn split_mapping(expression: &str) -> (Option<&str>, &str) {
    match expression.split_once(MAPPING_DELIMITER) {
        Some((function, path)) => (Some(function.trim()), path.trim()),
        None => (None, expression),
    }
}

/// Applies every pending binding in encounter order.
///
/// `engine` is resolved lazily and only needed by bindings that name a
/// mapping function.
pub(crate) fn apply_bindings(
    pending: Vec<PendingBinding>,
    namespace: &Namespace,
    engine: &dyn Fn() -> Result<Rc<dyn ScriptEngine>, LoadError>,
) -> Result<(), LoadError> {
    for binding in pending {
        bind(binding, namespace, engine)?;
    }
    Ok(())
}

fn bind(
    pending: PendingBinding,
    namespace: &Namespace,
    engine: &dyn Fn() -> Result<Rc<dyn ScriptEngine>, LoadError>,
) -> Result<(), LoadError> {
    let (function, path) = split_mapping(&pending.expression);
    if path.is_empty() {
        return Err(LoadError::structure(
            format!("Invalid binding expression \"{}\".", pending.expression),
            pending.location,
        ));
    }
    let mapping = function
        .map(|function| {
            Ok::<_, LoadError>(BindMapping {
                engine: engine()?,
                function: function.to_string(),
            })
        })
        .transpose()?;

    let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
    let Some((source_key, object_path)) = segments.split_last() else {
        return Ok(());
    };

    if object_path.is_empty() {
        // A bare id: the symbol table never changes an entry, so read once.
        let value = namespace.resolve_segments(&segments)?;
        let value = match &mapping {
            Some(mapping) => mapping.evaluate(value)?,
            None => value,
        };
        pending.target.set_property(&pending.target_key, value)?;
        return Ok(());
    }

    let source = namespace
        .resolve_segments(object_path)?
        .into_object()
        .ok_or_else(|| trellis_types::NamespaceError::Undefined(object_path.join(".")))?;
    if !source.has_property(source_key) {
        return Err(trellis_types::NamespaceError::Undefined(path.to_string()).into());
    }

    let binding = Rc::new(Binding {
        source: Rc::downgrade(&source),
        source_key: source_key.to_string(),
        target: Rc::downgrade(&pending.target),
        target_key: pending.target_key.clone(),
        mapping,
    });
    binding.apply()?;

    match source.notifier() {
        Some(notifier) => {
            log::debug!(
                "Bound {}.{} to {}.{}",
                source.type_name(),
                source_key,
                pending.target.type_name(),
                pending.target_key
            );
            let subscriber = binding.clone();
            notifier.subscribe(*source_key, move |_, _| {
                if let Err(err) = subscriber.apply() {
                    log::error!("Failed to propagate binding {subscriber:?}: {err}");
                }
            });
        }
        None => log::warn!(
            "{} does not publish changes; binding to '{}' was applied once",
            source.type_name(),
            path
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_traits::{NativeScriptEngine, ScriptEngine};
    use trellis_types::{Dictionary, NamespaceError};

    fn no_engine() -> Result<Rc<dyn ScriptEngine>, LoadError> {
        Err(LoadError::EngineNotFound("none".into()))
    }

    fn upper_engine() -> Result<Rc<dyn ScriptEngine>, LoadError> {
        let engine = NativeScriptEngine::new("native");
        engine.define("upper", |args| {
            Ok(Value::from(args[0].to_string().to_uppercase()))
        });
        Ok(Rc::new(engine))
    }

    fn dictionary() -> ObjectRef {
        Rc::new(Dictionary::new())
    }

    fn pending(target: &ObjectRef, expression: &str) -> PendingBinding {
        PendingBinding {
            target: target.clone(),
            target_key: "text".into(),
            expression: expression.into(),
            location: Location::default(),
        }
    }

    #[test]
    fn test_split_mapping() {
        assert_eq!(split_mapping("a.b"), (None, "a.b"));
        assert_eq!(split_mapping("upper:a.b"), (Some("upper"), "a.b"));
    }

    #[test]
    fn test_binding_applies_and_follows_changes() {
        let ns = Namespace::new();
        let source = dictionary();
        source.set_property("text", Value::from("first")).unwrap();
        ns.put("source", Value::Object(source.clone())).unwrap();
        let target = dictionary();

        apply_bindings(vec![pending(&target, "source.text")], &ns, &no_engine).unwrap();
        assert_eq!(target.get_property("text").unwrap(), Value::from("first"));

        source.set_property("text", Value::from("second")).unwrap();
        assert_eq!(target.get_property("text").unwrap(), Value::from("second"));
    }

    #[test]
    fn test_mapping_function_transforms_value() {
        let ns = Namespace::new();
        let source = dictionary();
        source.set_property("text", Value::from("quiet")).unwrap();
        ns.put("source", Value::Object(source.clone())).unwrap();
        let target = dictionary();

        apply_bindings(vec![pending(&target, "upper:source.text")], &ns, &upper_engine).unwrap();
        assert_eq!(target.get_property("text").unwrap(), Value::from("QUIET"));

        source.set_property("text", Value::from("loud")).unwrap();
        assert_eq!(target.get_property("text").unwrap(), Value::from("LOUD"));
    }

    #[test]
    fn test_unresolved_source_is_fatal() {
        let ns = Namespace::new();
        let target = dictionary();
        let err = apply_bindings(vec![pending(&target, "ghost.text")], &ns, &no_engine).unwrap_err();
        assert!(matches!(err, LoadError::Namespace(NamespaceError::Undefined(_))));
    }

    #[test]
    fn test_bare_id_is_read_once() {
        let ns = Namespace::new();
        ns.put("title", Value::from("Main")).unwrap();
        let target = dictionary();

        apply_bindings(vec![pending(&target, "title")], &ns, &no_engine).unwrap();
        assert_eq!(target.get_property("text").unwrap(), Value::from("Main"));
    }

    #[test]
    fn test_binding_does_not_keep_target_alive() {
        let ns = Namespace::new();
        let source = dictionary();
        source.set_property("text", Value::from("a")).unwrap();
        ns.put("source", Value::Object(source.clone())).unwrap();
        let target = dictionary();
        let weak = Rc::downgrade(&target);

        apply_bindings(vec![pending(&target, "source.text")], &ns, &no_engine).unwrap();
        drop(target);
        assert!(weak.upgrade().is_none());

        source.set_property("text", Value::from("b")).unwrap();
    }

    #[test]
    fn test_opposing_bindings_settle() {
        let ns = Namespace::new();
        let left = dictionary();
        let right = dictionary();
        left.set_property("text", Value::from("start")).unwrap();
        right.set_property("text", Value::from("start")).unwrap();
        ns.put("left", Value::Object(left.clone())).unwrap();
        ns.put("right", Value::Object(right.clone())).unwrap();

        let bindings = vec![pending(&left, "right.text"), pending(&right, "left.text")];
        apply_bindings(bindings, &ns, &no_engine).unwrap();

        let hits = Rc::new(std::cell::Cell::new(0));
        let h = hits.clone();
        left.notifier()
            .unwrap()
            .subscribe("text", move |_, _| h.set(h.get() + 1));

        left.set_property("text", Value::from("moved")).unwrap();
        assert_eq!(right.get_property("text").unwrap(), Value::from("moved"));
        assert_eq!(hits.get(), 1);

        right.set_property("text", Value::from("back")).unwrap();
        assert_eq!(left.get_property("text").unwrap(), Value::from("back"));
        assert_eq!(hits.get(), 2);
    }
}
