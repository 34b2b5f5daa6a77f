use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use trellis_traits::{ScriptEngine, ScriptError};
use trellis_types::{
    Listener, ListenerError, ListenerInterface, ObjectList, Sequence, Value, WeakNamespace,
};

/// The id under which an event script sees the arguments of the call.
pub const ARGUMENTS_KEY: &str = "arguments";

/// Implements a listener interface by dispatching each method to a script
/// function.
///
/// Methods named in the table call the mapped function. When the listener
/// element carried inline script, remaining methods call the function of the
/// same name if the script defined one. Anything else yields the interface's
/// default result.
pub struct ScriptListenerAdapter {
    interface: Rc<ListenerInterface>,
    engine: Rc<dyn ScriptEngine>,
    functions: HashMap<String, String>,
    same_name_fallback: bool,
}

impl ScriptListenerAdapter {
    pub fn new(interface: Rc<ListenerInterface>, engine: Rc<dyn ScriptEngine>) -> Self {
        Self {
            interface,
            engine,
            functions: HashMap::new(),
            same_name_fallback: false,
        }
    }

    /// Routes `method` to `function`.
    pub fn map(&mut self, method: impl Into<String>, function: impl Into<String>) {
        self.functions.insert(method.into(), function.into());
    }

    pub fn with_same_name_fallback(mut self, enabled: bool) -> Self {
        self.same_name_fallback = enabled;
        self
    }

    pub fn interface(&self) -> &ListenerInterface {
        &self.interface
    }

    fn normalize(&self, method: &str, result: Value) -> Value {
        if result.is_null() {
            self.interface.default_result(method)
        } else {
            result
        }
    }
}

impl Listener for ScriptListenerAdapter {
    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, ListenerError> {
        let failure = |err: ScriptError| ListenerError {
            method: method.to_string(),
            message: err.to_string(),
        };

        if let Some(function) = self.functions.get(method) {
            let result = self.engine.invoke_function(function, args).map_err(failure)?;
            return Ok(self.normalize(method, result));
        }

        if self.same_name_fallback && self.interface.find(method).is_some() {
            return match self.engine.invoke_function(method, args) {
                Ok(result) => Ok(self.normalize(method, result)),
                Err(ScriptError::NoSuchFunction(_)) => Ok(self.interface.default_result(method)),
                Err(err) => Err(failure(err)),
            };
        }

        Ok(self.interface.default_result(method))
    }
}

impl fmt::Debug for ScriptListenerAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptListenerAdapter")
            .field("interface", &self.interface.name())
            .field("language", &self.engine.language())
            .field("functions", &self.functions)
            .finish()
    }
}

/// Runs an inline script when one method of a listener interface fires.
///
/// Installed for `Interface.method="script"` attributes. The script is
/// evaluated against a copy of the document's ids extended with
/// [`ARGUMENTS_KEY`]. A failing script is logged, and like every other method
/// the call then yields the interface's default result.
pub struct ScriptEventListener {
    interface: Rc<ListenerInterface>,
    engine: Rc<dyn ScriptEngine>,
    event: String,
    script: String,
    namespace: WeakNamespace,
}

impl ScriptEventListener {
    pub fn new(
        interface: Rc<ListenerInterface>,
        engine: Rc<dyn ScriptEngine>,
        event: impl Into<String>,
        script: impl Into<String>,
        namespace: WeakNamespace,
    ) -> Self {
        Self {
            interface,
            engine,
            event: event.into(),
            script: script.into(),
            namespace,
        }
    }

    pub fn event(&self) -> &str {
        &self.event
    }
}

impl Listener for ScriptEventListener {
    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, ListenerError> {
        if method != self.event {
            return Ok(self.interface.default_result(method));
        }

        let bindings = self
            .namespace
            .upgrade()
            .map(|namespace| namespace.snapshot())
            .unwrap_or_default();
        let arguments = ObjectList::new();
        for arg in args {
            arguments.append(arg.clone()).map_err(|err| ListenerError {
                method: method.to_string(),
                message: err.to_string(),
            })?;
        }
        if bindings
            .put(ARGUMENTS_KEY, Value::Object(Rc::new(arguments)))
            .is_err()
        {
            log::warn!(
                "\"{ARGUMENTS_KEY}\" is a document id; the {}.{} script sees that value instead",
                self.interface.name(),
                self.event
            );
        }

        match self.engine.eval(&self.script, &bindings) {
            Ok(result) if !result.is_null() => Ok(result),
            Ok(_) => Ok(self.interface.default_result(method)),
            Err(err) => {
                log::error!(
                    "{}.{} script failed ({}): {err}",
                    self.interface.name(),
                    self.event,
                    self.engine.language()
                );
                log::debug!("{}", self.script);
                Ok(self.interface.default_result(method))
            }
        }
    }
}

impl fmt::Debug for ScriptEventListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptEventListener")
            .field("interface", &self.interface.name())
            .field("event", &self.event)
            .field("language", &self.engine.language())
            .finish()
    }
}
