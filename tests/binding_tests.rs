mod common;

use common::Fixture;
use common::widgets::{object, prop};
use std::cell::Cell;
use std::rc::Rc;
use trellis::traits::ScriptError;
use trellis::types::NamespaceError;
use trellis::{HostObject, LoadError, Value};

const BOUND_LABELS: &str = r#"
<Panel>
    <Label bxml:id="source" text="initial"/>
    <Label bxml:id="target" text="${source.text}"/>
</Panel>"#;

#[test]
fn test_binding_applies_immediately() {
    let fixture = Fixture::new();
    let outcome = fixture.loader().load_str(BOUND_LABELS).unwrap();
    assert_eq!(prop(&outcome.get("target").unwrap(), "text"), Value::from("initial"));
}

#[test]
fn test_binding_follows_source_once_per_mutation() {
    let fixture = Fixture::new();
    let outcome = fixture.loader().load_str(BOUND_LABELS).unwrap();
    let source = outcome.get("source").unwrap();
    let target = outcome.get("target").unwrap();

    let updates = Rc::new(Cell::new(0));
    let counter = updates.clone();
    object(&target)
        .notifier()
        .unwrap()
        .subscribe("text", move |_, _| counter.set(counter.get() + 1));

    object(&source).set_property("text", Value::from("first")).unwrap();
    assert_eq!(prop(&target, "text"), Value::from("first"));
    assert_eq!(updates.get(), 1);

    object(&source).set_property("text", Value::from("second")).unwrap();
    assert_eq!(prop(&target, "text"), Value::from("second"));
    assert_eq!(updates.get(), 2);
}

#[test]
fn test_binding_is_one_directional() {
    let fixture = Fixture::new();
    let outcome = fixture.loader().load_str(BOUND_LABELS).unwrap();
    let source = outcome.get("source").unwrap();
    let target = outcome.get("target").unwrap();

    object(&target).set_property("text", Value::from("local")).unwrap();
    assert_eq!(prop(&source, "text"), Value::from("initial"));
}

#[test]
fn test_binding_to_a_later_sibling() {
    let fixture = Fixture::new();
    let outcome = fixture
        .loader()
        .load_str(
            r#"<Panel>
                <Label bxml:id="target" text="${source.text}"/>
                <Label bxml:id="source" text="declared later"/>
            </Panel>"#,
        )
        .unwrap();
    assert_eq!(
        prop(&outcome.get("target").unwrap(), "text"),
        Value::from("declared later")
    );
}

#[test]
fn test_mapping_function_transforms_values() {
    let fixture = Fixture::new();
    fixture.engine.define("shout", |args| {
        let text = args.first().map(|v| v.to_string()).unwrap_or_default();
        Ok(Value::from(text.to_uppercase()))
    });

    let outcome = fixture
        .loader()
        .load_str(
            r#"<Panel>
                <Label bxml:id="source" text="quiet"/>
                <Label bxml:id="target" text="${shout:source.text}"/>
            </Panel>"#,
        )
        .unwrap();
    let target = outcome.get("target").unwrap();
    assert_eq!(prop(&target, "text"), Value::from("QUIET"));

    object(&outcome.get("source").unwrap())
        .set_property("text", Value::from("still quiet"))
        .unwrap();
    assert_eq!(prop(&target, "text"), Value::from("STILL QUIET"));
}

#[test]
fn test_mapping_function_failure_is_fatal() {
    let fixture = Fixture::new();
    let err = fixture
        .loader()
        .load_str(
            r#"<Panel>
                <Label bxml:id="source" text="x"/>
                <Label text="${missingFunction:source.text}"/>
            </Panel>"#,
        )
        .unwrap_err();
    assert!(matches!(err, LoadError::Script(ScriptError::NoSuchFunction(_))), "{err}");
}

#[test]
fn test_bare_id_binding_reads_the_table() {
    let fixture = Fixture::new();
    let outcome = fixture
        .loader()
        .load_str(
            r#"<Panel>
                <Button bxml:id="button" buttonData="${label}"/>
                <Label bxml:id="label"/>
            </Panel>"#,
        )
        .unwrap();
    let data = prop(&outcome.get("button").unwrap(), "buttonData");
    assert_eq!(object(&data).type_name(), "Label");
}

#[test]
fn test_unresolved_binding_source_fails() {
    let fixture = Fixture::new();
    let loader = fixture.loader();

    let err = loader
        .load_str(r#"<Label text="${nobody.text}"/>"#)
        .unwrap_err();
    assert!(matches!(err, LoadError::Namespace(NamespaceError::Undefined(_))), "{err}");

    let err = loader
        .load_str(
            r#"<Panel>
                <Label bxml:id="source"/>
                <Label text="${source.colour}"/>
            </Panel>"#,
        )
        .unwrap_err();
    assert!(matches!(err, LoadError::Namespace(NamespaceError::Undefined(_))), "{err}");
}

#[test]
fn test_bindings_are_rejected_on_references() {
    let fixture = Fixture::new();
    let err = fixture
        .loader()
        .load_str(
            r#"<Panel>
                <bxml:define><Label bxml:id="source"/></bxml:define>
                <bxml:reference id="source" text="${source.name}"/>
            </Panel>"#,
        )
        .unwrap_err();
    assert!(err.to_string().contains("Bindings are not supported"), "{err}");
}

#[test]
fn test_empty_binding_expression_fails() {
    let fixture = Fixture::new();
    let err = fixture
        .loader()
        .load_str(r#"<Label text="${}"/>"#)
        .unwrap_err();
    assert!(matches!(err, LoadError::Structure { .. }), "{err}");
}

#[test]
fn test_mutual_bindings_settle_after_one_round() {
    let fixture = Fixture::new();
    let outcome = fixture
        .loader()
        .load_str(
            r#"
<Panel>
    <Label bxml:id="left" text="${right.text}"/>
    <Label bxml:id="right" text="${left.text}"/>
</Panel>"#,
        )
        .unwrap();
    let left = outcome.get("left").unwrap();
    let right = outcome.get("right").unwrap();

    let updates = Rc::new(Cell::new(0));
    let counter = updates.clone();
    object(&left)
        .notifier()
        .unwrap()
        .subscribe("text", move |_, _| counter.set(counter.get() + 1));

    object(&left).set_property("text", Value::from("typed")).unwrap();
    assert_eq!(prop(&right, "text"), Value::from("typed"));
    assert_eq!(updates.get(), 1);

    object(&right).set_property("text", Value::from("echo")).unwrap();
    assert_eq!(prop(&left, "text"), Value::from("echo"));
    assert_eq!(updates.get(), 2);
}
