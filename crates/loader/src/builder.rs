//! The element stack builder.
//!
//! Each start element is classified and its value constructed or resolved;
//! the matching end element applies the queued attributes and composes the
//! value into its parent.

use crate::attributes::{AttributeScope, AttributeValue, resolve_attribute};
use crate::binding::PendingBinding;
use crate::element::{AttachedAttribute, Element, ElementKind};
use crate::error::{LoadError, Location};
use crate::include::load_include;
use crate::listener::{ScriptEventListener, ScriptListenerAdapter};
use crate::loader::{BxmlLoader, DocumentContext, Session};
use crate::parser::{DocumentHandler, RawAttribute, StartElement};
use crate::script::{evaluate_listener_script, run_script_element};
use crate::{
    BXML_PREFIX, DEFINE_TAG, ID_ATTRIBUTE, INCLUDE_TAG, LANGUAGE_PROCESSING_INSTRUCTION,
    REFERENCE_ID_ATTRIBUTE, REFERENCE_TAG, SCRIPT_SRC_ATTRIBUTE, SCRIPT_TAG,
};
use std::rc::Rc;
use trellis_types::{ListenerList, NamespaceError, ObjectRef, PATH_SEPARATOR, PropertyKind, Value};

/// What a finished parse hands back to the loader.
pub(crate) struct BuiltDocument {
    pub root: Value,
    pub bindings: Vec<PendingBinding>,
    pub language: String,
}

pub(crate) struct DocumentBuilder<'a> {
    loader: &'a BxmlLoader,
    session: &'a Session,
    context: &'a DocumentContext,
    stack: Vec<Element>,
    root: Option<Value>,
    language: Option<String>,
    bindings: Vec<PendingBinding>,
}

impl<'a> DocumentBuilder<'a> {
    pub fn new(loader: &'a BxmlLoader, session: &'a Session, context: &'a DocumentContext) -> Self {
        Self {
            loader,
            session,
            context,
            stack: Vec::new(),
            root: None,
            language: None,
            bindings: Vec::new(),
        }
    }

    pub fn finish(self) -> Result<BuiltDocument, LoadError> {
        if let Some(open) = self.stack.last() {
            return Err(LoadError::structure(
                format!("Unexpected end of document inside <{}>.", open.name),
                open.location,
            ));
        }
        let root = self
            .root
            .ok_or_else(|| LoadError::structure("Document has no root element.", Location::default()))?;
        Ok(BuiltDocument {
            root,
            bindings: self.bindings,
            language: self
                .language
                .unwrap_or_else(|| self.loader.default_language.clone()),
        })
    }

    fn language(&self) -> &str {
        self.language
            .as_deref()
            .unwrap_or(&self.loader.default_language)
    }

    fn attribute_scope(&self) -> AttributeScope<'_> {
        AttributeScope {
            location: self.context.location.as_ref(),
            resources: self.context.resources.as_deref(),
            namespace: &self.context.namespace,
        }
    }

    fn classify(
        &self,
        start: &StartElement,
        at: Location,
    ) -> Result<(ElementKind, String, Value), LoadError> {
        let local = start.local_name.as_str();

        if start.prefix.as_deref() == Some(BXML_PREFIX) {
            if self.stack.is_empty() {
                return Err(LoadError::structure(
                    format!("Invalid root element <{BXML_PREFIX}:{local}>."),
                    at,
                ));
            }
            let kind = match local {
                INCLUDE_TAG => ElementKind::Include,
                SCRIPT_TAG => ElementKind::Script,
                DEFINE_TAG => ElementKind::Define,
                REFERENCE_TAG => ElementKind::Reference,
                _ => {
                    return Err(LoadError::structure(
                        format!("<{BXML_PREFIX}:{local}> is not a valid element."),
                        at,
                    ));
                }
            };
            return Ok((kind, format!("{BXML_PREFIX}:{local}"), Value::Null));
        }

        if let Some((owner, property)) = split_attached(local) {
            let parent = self.stack.last().ok_or_else(|| {
                LoadError::structure(format!("Attached property <{local}> has no parent."), at)
            })?;
            if parent.value.as_object().is_none() {
                return Err(LoadError::structure(
                    format!("<{local}> cannot be attached to a {} element.", parent.kind),
                    at,
                ));
            }
            let owner_type = qualified_type_name(start.namespace.as_deref(), owner);
            return Ok((
                ElementKind::AttachedProperty,
                format!("{owner_type}{PATH_SEPARATOR}{property}"),
                Value::Null,
            ));
        }

        if local.chars().next().is_some_and(char::is_uppercase) {
            let type_name = qualified_type_name(start.namespace.as_deref(), local);
            let object = self.loader.type_factory.construct(&type_name)?;
            log::trace!("Constructed {type_name}");
            return Ok((ElementKind::Instance, local.to_string(), Value::Object(object)));
        }

        if start.prefix.is_some() {
            return Err(LoadError::structure(
                "Property elements cannot have a namespace prefix.",
                at,
            ));
        }
        let parent = self.stack.last().ok_or_else(|| {
            LoadError::structure(format!("Property element <{local}> has no parent."), at)
        })?;
        let owner = parent.value.as_object().ok_or_else(|| {
            LoadError::structure(
                format!("<{local}> cannot be a property of a {} element.", parent.kind),
                at,
            )
        })?;

        if owner.as_dictionary().is_some() {
            return Ok((ElementKind::WritableProperty, local.to_string(), Value::Null));
        }

        match owner.property_kind(local) {
            None => Err(LoadError::structure(
                format!("\"{local}\" is not a valid property of element <{}>.", parent.name),
                at,
            )),
            Some(PropertyKind::Listeners(_)) => {
                Ok((ElementKind::ListenerProperty, local.to_string(), Value::Null))
            }
            Some(PropertyKind::ReadOnly) => {
                let value = owner.get_property(local)?;
                if value.is_null() {
                    return Err(LoadError::structure(
                        format!("Read-only property \"{local}\" of <{}> is null.", parent.name),
                        at,
                    ));
                }
                Ok((ElementKind::ReadOnlyProperty, local.to_string(), value))
            }
            Some(PropertyKind::Writable(_)) => {
                Ok((ElementKind::WritableProperty, local.to_string(), Value::Null))
            }
        }
    }

    /// Sorts raw attributes into the id, control properties, resolved values
    /// and deferred bindings. Returns the bindings as `(name, expression)`.
    fn process_attributes(
        &self,
        element: &mut Element,
        namespace: Option<&str>,
        attributes: Vec<RawAttribute>,
        at: Location,
    ) -> Result<Vec<(String, String)>, LoadError> {
        let scope = self.attribute_scope();
        let mut bindings = Vec::new();

        for attribute in attributes {
            let RawAttribute {
                prefix,
                local_name: name,
                value,
            } = attribute;

            if prefix.as_deref() == Some(BXML_PREFIX) {
                if name != ID_ATTRIBUTE {
                    return Err(LoadError::structure(
                        format!("{BXML_PREFIX}:{name} is not a valid attribute."),
                        at,
                    ));
                }
                self.validate_id(element.kind, &value, at)?;
                element.id = Some(value);
                continue;
            }

            if element.kind.control_properties().contains(&name.as_str()) {
                element.control.insert(name, value);
                continue;
            }

            if let Some((owner, member)) = split_attached(&name) {
                if !element.kind.accepts_attached() {
                    return Err(LoadError::structure(
                        format!("\"{name}\" cannot be attached to a {} element.", element.kind),
                        at,
                    ));
                }
                element.attached.push(AttachedAttribute {
                    owner_type: qualified_type_name(namespace, owner),
                    owner: owner.to_string(),
                    member: member.to_string(),
                    value,
                });
                continue;
            }

            match element.kind {
                ElementKind::ListenerProperty => {
                    element.set_attribute(name, Value::String(value));
                    continue;
                }
                ElementKind::Script
                | ElementKind::Define
                | ElementKind::WritableProperty
                | ElementKind::AttachedProperty => {
                    return Err(LoadError::structure(
                        format!("Attribute \"{name}\" is not supported on a {} element.", element.kind),
                        at,
                    ));
                }
                _ => {}
            }

            match resolve_attribute(&value, &scope, at)? {
                AttributeValue::Resolved(resolved) => element.set_attribute(name, resolved),
                AttributeValue::Binding(expression) => bindings.push((name, expression)),
            }
        }

        Ok(bindings)
    }

    fn validate_id(&self, kind: ElementKind, id: &str, at: Location) -> Result<(), LoadError> {
        if id.is_empty() || id.contains(PATH_SEPARATOR) {
            return Err(LoadError::structure(
                format!("\"{id}\" is not a valid ID value."),
                at,
            ));
        }
        if self.context.namespace.contains(id) {
            return Err(NamespaceError::DuplicateId(id.to_string()).into());
        }
        if !kind.accepts_id() {
            return Err(LoadError::structure(
                "An ID cannot be assigned to this element.",
                at,
            ));
        }
        Ok(())
    }

    fn resolve_reference(&self, element: &Element) -> Result<Value, LoadError> {
        let id = element.control(REFERENCE_ID_ATTRIBUTE).ok_or_else(|| {
            LoadError::structure(
                format!(
                    "{REFERENCE_ID_ATTRIBUTE} attribute is required for {BXML_PREFIX}:{REFERENCE_TAG} tag."
                ),
                element.location,
            )
        })?;
        self.context
            .namespace
            .get(id)
            .ok_or_else(|| NamespaceError::Undefined(id.to_string()).into())
    }

    fn queue_bindings(
        &mut self,
        element: &Element,
        bindings: Vec<(String, String)>,
    ) -> Result<(), LoadError> {
        if bindings.is_empty() {
            return Ok(());
        }
        if !element.kind.accepts_bindings() {
            return Err(LoadError::structure(
                format!("Bindings are not supported on a {} element.", element.kind),
                element.location,
            ));
        }
        let target = element.value.as_object().ok_or_else(|| {
            LoadError::structure(
                format!("<{}> does not produce an object to bind to.", element.name),
                element.location,
            )
        })?;
        for (target_key, expression) in bindings {
            self.bindings.push(PendingBinding {
                target: target.clone(),
                target_key,
                expression,
                location: element.location,
            });
        }
        Ok(())
    }

    fn apply_attributes(&self, element: &Element) -> Result<(), LoadError> {
        if element.attributes.is_empty() {
            return Ok(());
        }
        let object = element.value.as_object().ok_or_else(|| {
            LoadError::structure(
                format!("Attributes cannot be applied to the value of <{}>.", element.name),
                element.location,
            )
        })?;
        for (name, value) in &element.attributes {
            object.set_property(name, value.clone())?;
        }
        Ok(())
    }

    /// Hands a closed instance, include or reference to its parent.
    fn compose(&mut self, element: &Element) -> Result<(), LoadError> {
        let session = self.session;
        let Some(parent) = self.stack.last_mut() else {
            return Ok(());
        };

        match parent.kind {
            ElementKind::WritableProperty | ElementKind::AttachedProperty => {
                adopt(session, &element.value, element.location)?;
                parent.value = element.value.clone();
                Ok(())
            }
            ElementKind::Define => Ok(()),
            _ => match &parent.value {
                Value::Null => Ok(()),
                Value::Object(owner) => {
                    adopt(session, &element.value, element.location)?;
                    compose_child(owner, element.value.clone(), element.location)
                }
                other => Err(LoadError::structure(
                    format!("A {} value is not a container.", other.kind()),
                    element.location,
                )),
            },
        }
    }

    /// Applies `Owner.member` attributes to a composed value. When the object
    /// carries a listener list for the `Owner` interface the member names an
    /// event and the attribute is its script; otherwise `Owner` attaches a
    /// property through the type factory.
    fn apply_attached(&self, element: &Element) -> Result<(), LoadError> {
        if element.attached.is_empty() {
            return Ok(());
        }
        let object = element.value.as_object().ok_or_else(|| {
            LoadError::structure(
                format!("Attached attributes cannot be applied to the value of <{}>.", element.name),
                element.location,
            )
        })?;
        let scope = self.attribute_scope();

        for attribute in &element.attached {
            if let Some(list) = object.listeners(&listener_list_name(&attribute.owner)) {
                self.install_event_script(list, attribute, element.location)?;
                continue;
            }
            let value = match resolve_attribute(&attribute.value, &scope, element.location)? {
                AttributeValue::Resolved(value) => value,
                AttributeValue::Binding(_) => {
                    return Err(LoadError::structure(
                        format!(
                            "Attached property \"{}.{}\" cannot be bound.",
                            attribute.owner, attribute.member
                        ),
                        element.location,
                    ));
                }
            };
            self.loader.type_factory.set_attached(
                &attribute.owner_type,
                &attribute.member,
                object,
                value,
            )?;
            log::trace!("Attached {}.{} to {}", attribute.owner_type, attribute.member, object.type_name());
        }
        Ok(())
    }

    fn install_event_script(
        &self,
        list: &ListenerList,
        attribute: &AttachedAttribute,
        at: Location,
    ) -> Result<(), LoadError> {
        let interface = list.interface().clone();
        if interface.find(&attribute.member).is_none() {
            return Err(LoadError::structure(
                format!("\"{}\" is not a method of {}.", attribute.member, interface.name()),
                at,
            ));
        }
        let engine = self.loader.engine_by_name(self.language())?;
        let listener = ScriptEventListener::new(
            interface,
            engine,
            attribute.member.clone(),
            attribute.value.clone(),
            self.context.namespace.downgrade(),
        );
        log::debug!("Installed {listener:?}");
        list.add(Rc::new(listener));
        Ok(())
    }

    /// Sets the value of a closed `<Owner.property>` element on its parent.
    fn apply_attached_element(&self, element: &Element) -> Result<(), LoadError> {
        let owner = self
            .stack
            .last()
            .and_then(|parent| parent.value.as_object())
            .ok_or_else(|| {
                LoadError::structure(
                    format!("Attached property <{}> has no parent object.", element.name),
                    element.location,
                )
            })?;
        let (owner_type, property) = element.name.rsplit_once(PATH_SEPARATOR).ok_or_else(|| {
            LoadError::structure(
                format!("\"{}\" is not a valid attached property.", element.name),
                element.location,
            )
        })?;
        self.loader
            .type_factory
            .set_attached(owner_type, property, owner, element.value.clone())?;
        Ok(())
    }

    fn install_listener(&self, element: &Element) -> Result<(), LoadError> {
        let parent = self.stack.last().ok_or_else(|| {
            LoadError::structure("Listener element has no parent.", element.location)
        })?;
        let owner = parent.value.as_object().ok_or_else(|| {
            LoadError::structure("Listener element has no parent object.", element.location)
        })?;
        let list = owner.listeners(&element.name).ok_or_else(|| {
            LoadError::structure(
                format!("\"{}\" is not a listener list of {}.", element.name, owner.type_name()),
                element.location,
            )
        })?;
        let interface = list.interface().clone();

        for method in element.attributes.keys() {
            if interface.find(method).is_none() {
                return Err(LoadError::structure(
                    format!("\"{method}\" is not a method of {}.", interface.name()),
                    element.location,
                ));
            }
        }

        let engine = self.loader.engine_by_name(self.language())?;
        let inline_script = element.text.as_deref();
        if let Some(text) = inline_script
            && !evaluate_listener_script(&engine, text, self.context)
        {
            return Ok(());
        }

        let mut adapter = ScriptListenerAdapter::new(interface, engine)
            .with_same_name_fallback(inline_script.is_some());
        for (method, function) in &element.attributes {
            adapter.map(method.clone(), function.to_string());
        }
        log::debug!("Installed {adapter:?} on {}", owner.type_name());
        list.add(Rc::new(adapter));
        Ok(())
    }

    fn register_id(&self, element: &Element) -> Result<(), LoadError> {
        let Some(id) = &element.id else {
            return Ok(());
        };
        self.context.namespace.put(id.clone(), element.value.clone())?;
        if let Some(object) = element.value.as_object()
            && let Some(property) = object.id_property()
        {
            object.set_property(property, Value::String(id.clone()))?;
        }
        Ok(())
    }
}

fn qualified_type_name(namespace: Option<&str>, local: &str) -> String {
    match namespace {
        Some(namespace) => format!("{namespace}{PATH_SEPARATOR}{local}"),
        None => local.to_string(),
    }
}

/// Splits `Owner.member`, the name form of attached properties and event
/// scripts. Anything else, including a dotted name whose member starts in
/// uppercase, is not attached.
fn split_attached(name: &str) -> Option<(&str, &str)> {
    if !name.chars().next().is_some_and(char::is_uppercase) {
        return None;
    }
    let (owner, member) = name.split_once(PATH_SEPARATOR)?;
    let plain = !member.contains(PATH_SEPARATOR);
    (plain && member.chars().next().is_some_and(char::is_lowercase)).then_some((owner, member))
}

/// The listener list property for an interface: `ButtonPressListener` is
/// reached through `buttonPressListeners`.
fn listener_list_name(interface: &str) -> String {
    let mut chars = interface.chars();
    match chars.next() {
        Some(first) => format!("{}{}s", first.to_lowercase(), chars.as_str()),
        None => String::new(),
    }
}

/// Records that `value` has been given a parent.
fn adopt(session: &Session, value: &Value, at: Location) -> Result<(), LoadError> {
    if let Some(object) = value.as_object()
        && !session.adopt(object)
    {
        return Err(LoadError::structure(
            format!("This {} already has a parent.", object.type_name()),
            at,
        ));
    }
    Ok(())
}

/// Adds `value` to `owner` through its default property, or appends it if
/// `owner` is itself a sequence.
fn compose_child(owner: &ObjectRef, value: Value, at: Location) -> Result<(), LoadError> {
    if let Some(property) = owner.default_property() {
        let current = owner.get_property(property)?;
        match current.as_object().and_then(|c| c.as_sequence()) {
            Some(sequence) => sequence.append(value)?,
            None => owner.set_property(property, value)?,
        }
        return Ok(());
    }
    if let Some(sequence) = owner.as_sequence() {
        sequence.append(value)?;
        return Ok(());
    }
    Err(LoadError::structure(
        format!("{} is not a container.", owner.type_name()),
        at,
    ))
}

impl DocumentHandler for DocumentBuilder<'_> {
    fn processing_instruction(
        &mut self,
        target: &str,
        data: &str,
        location: Location,
    ) -> Result<(), LoadError> {
        if target != LANGUAGE_PROCESSING_INSTRUCTION {
            log::debug!("Ignoring processing instruction <?{target}?>");
            return Ok(());
        }
        if self.language.is_some() {
            return Err(LoadError::structure("Language already set.", location));
        }
        self.language = Some(data.to_string());
        Ok(())
    }

    fn start_element(&mut self, start: StartElement, location: Location) -> Result<(), LoadError> {
        if self.language.is_none() {
            self.language = Some(self.loader.default_language.clone());
        }

        let (kind, name, value) = self.classify(&start, location)?;
        let mut element = Element::new(kind, name, value, location);
        let bindings = self.process_attributes(
            &mut element,
            start.namespace.as_deref(),
            start.attributes,
            location,
        )?;

        match kind {
            ElementKind::Include => {
                element.value = load_include(self.loader, self.session, self.context, &element)?;
            }
            ElementKind::Reference => {
                element.value = self.resolve_reference(&element)?;
            }
            _ => {}
        }

        self.queue_bindings(&element, bindings)?;
        self.stack.push(element);
        Ok(())
    }

    fn end_element(&mut self, location: Location) -> Result<(), LoadError> {
        let element = self
            .stack
            .pop()
            .ok_or_else(|| LoadError::structure("Unbalanced end element.", location))?;

        match element.kind {
            ElementKind::Instance | ElementKind::Include | ElementKind::Reference => {
                self.apply_attributes(&element)?;
                self.compose(&element)?;
                self.apply_attached(&element)?;
            }
            ElementKind::ReadOnlyProperty => self.apply_attributes(&element)?,
            ElementKind::WritableProperty => {
                let owner = self
                    .stack
                    .last()
                    .and_then(|parent| parent.value.as_object())
                    .ok_or_else(|| {
                        LoadError::structure(
                            format!("Property <{}> has no parent object.", element.name),
                            element.location,
                        )
                    })?;
                owner.set_property(&element.name, element.value.clone())?;
            }
            ElementKind::AttachedProperty => self.apply_attached_element(&element)?,
            ElementKind::ListenerProperty => self.install_listener(&element)?,
            ElementKind::Script => run_script_element(
                self.loader,
                self.context,
                self.language(),
                element.control(SCRIPT_SRC_ATTRIBUTE),
                element.text.as_deref(),
                element.location,
            )?,
            ElementKind::Define => {}
        }

        self.register_id(&element)?;

        if self.stack.is_empty() {
            self.root = Some(element.value);
        }
        Ok(())
    }

    fn characters(&mut self, text: String, location: Location) -> Result<(), LoadError> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let Some(element) = self.stack.last_mut() else {
            return Err(LoadError::structure(
                "Unexpected characters outside the root element.",
                location,
            ));
        };

        match element.kind {
            ElementKind::Instance => {
                let object = element.value.as_object().ok_or_else(|| {
                    LoadError::structure("Instance has no value.", location)
                })?;
                compose_text(object, text, location)
            }
            ElementKind::WritableProperty | ElementKind::AttachedProperty => {
                element.value = Value::String(text.clone());
                element.text = Some(text);
                Ok(())
            }
            ElementKind::Script | ElementKind::ListenerProperty => {
                element.text = Some(text);
                Ok(())
            }
            kind => Err(LoadError::structure(
                format!("Unexpected characters in {kind} element."),
                location,
            )),
        }
    }
}

/// Text inside an instance goes to its default property, or is appended if
/// the instance is itself a sequence.
fn compose_text(object: &ObjectRef, text: String, at: Location) -> Result<(), LoadError> {
    if object.default_property().is_none() && object.as_sequence().is_none() {
        return Err(LoadError::structure(
            format!("Text content cannot be added to {}: \"{}\".", object.type_name(), text.trim()),
            at,
        ));
    }
    compose_child(object, Value::String(text), at)
}
