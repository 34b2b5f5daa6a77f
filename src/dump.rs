//! JSON rendering of a loaded object tree.
//!
//! Objects become JSON objects tagged with their type under `@type`;
//! sequences become arrays. An object reached again while it is still being
//! rendered is written as `{"@ref": "<type>"}` instead of recursing.

use serde_json::{Map, Number, Value as Json, json};
use std::collections::HashSet;
use trellis_loader::LoadOutcome;
use trellis_types::{HostObject, ObjectRef, Value, object_id};

pub const TYPE_KEY: &str = "@type";
pub const REF_KEY: &str = "@ref";

pub fn value_to_json(value: &Value) -> Json {
    Dumper::default().value(value)
}

/// Renders the root and the ids a load registered.
pub fn outcome_to_json(outcome: &LoadOutcome) -> Json {
    let mut ids = Map::new();
    for id in outcome.namespace.ids() {
        let rendered = match outcome.namespace.get(&id) {
            Some(Value::Object(object)) => json!({ REF_KEY: object.type_name() }),
            Some(other) => value_to_json(&other),
            None => Json::Null,
        };
        ids.insert(id, rendered);
    }

    json!({
        "location": outcome.location.as_ref().map(|url| url.to_string()),
        "root": value_to_json(&outcome.root),
        "ids": ids,
    })
}

#[derive(Default)]
struct Dumper {
    in_progress: HashSet<usize>,
}

impl Dumper {
    fn value(&mut self, value: &Value) -> Json {
        match value {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::Number((*i).into()),
            Value::Float(f) => Number::from_f64(*f).map_or(Json::Null, Json::Number),
            Value::String(s) => Json::String(s.clone()),
            Value::Url(url) => Json::String(url.to_string()),
            Value::Vote(vote) => Json::String(format!("{vote:?}")),
            Value::Object(object) => self.object(object),
        }
    }

    fn object(&mut self, object: &ObjectRef) -> Json {
        let id = object_id(object);
        if !self.in_progress.insert(id) {
            return json!({ REF_KEY: object.type_name() });
        }

        let rendered = match object.as_sequence() {
            Some(sequence) if object.property_names().is_empty() => Json::Array(
                (0..sequence.len())
                    .filter_map(|i| sequence.get(i))
                    .map(|item| self.value(&item))
                    .collect(),
            ),
            _ => {
                let mut map = Map::new();
                map.insert(TYPE_KEY.to_string(), Json::String(object.type_name().to_string()));
                for name in object.property_names() {
                    let value = object.get_property(&name).unwrap_or_default();
                    map.insert(name, self.value(&value));
                }
                Json::Object(map)
            }
        };

        self.in_progress.remove(&id);
        rendered
    }
}
