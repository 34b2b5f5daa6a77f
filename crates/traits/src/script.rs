//! Script engine contracts.
//!
//! The loader runs `bxml:script` content, binding mapping functions and
//! listener callbacks through a [`ScriptEngine`]. Engines are looked up by
//! language name or by file extension through a [`ScriptEngineProvider`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;
use trellis_types::{Namespace, Value};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("Script evaluation failed: {0}")]
    Eval(String),

    #[error("No such function: {0}")]
    NoSuchFunction(String),

    #[error("Engine '{0}' cannot evaluate script text")]
    Unsupported(String),
}

/// An engine that executes script text and invokes named functions.
pub trait ScriptEngine {
    /// The canonical language name of this engine.
    fn language(&self) -> &str;

    /// Executes `source` with the document's symbol table as global bindings.
    fn eval(&self, source: &str, bindings: &Namespace) -> Result<Value, ScriptError>;

    /// Invokes a function previously defined in this engine.
    fn invoke_function(&self, name: &str, args: &[Value]) -> Result<Value, ScriptError>;
}

/// Resolves script engines for a document.
pub trait ScriptEngineProvider {
    fn engine_by_name(&self, language: &str) -> Option<Rc<dyn ScriptEngine>>;

    fn engine_by_extension(&self, extension: &str) -> Option<Rc<dyn ScriptEngine>>;
}

/// A registry of engines keyed by language names and file extensions.
#[derive(Default)]
pub struct ScriptEngineManager {
    by_name: HashMap<String, Rc<dyn ScriptEngine>>,
    by_extension: HashMap<String, Rc<dyn ScriptEngine>>,
}

impl ScriptEngineManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `engine` under its language, extra aliases and extensions.
    pub fn register(
        mut self,
        engine: Rc<dyn ScriptEngine>,
        aliases: &[&str],
        extensions: &[&str],
    ) -> Self {
        self.by_name
            .insert(engine.language().to_ascii_lowercase(), engine.clone());
        for alias in aliases {
            self.by_name.insert(alias.to_ascii_lowercase(), engine.clone());
        }
        for ext in extensions {
            self.by_extension
                .insert(ext.trim_start_matches('.').to_ascii_lowercase(), engine.clone());
        }
        self
    }
}

impl ScriptEngineProvider for ScriptEngineManager {
    fn engine_by_name(&self, language: &str) -> Option<Rc<dyn ScriptEngine>> {
        self.by_name.get(&language.to_ascii_lowercase()).cloned()
    }

    fn engine_by_extension(&self, extension: &str) -> Option<Rc<dyn ScriptEngine>> {
        self.by_extension.get(&extension.to_ascii_lowercase()).cloned()
    }
}

impl fmt::Debug for ScriptEngineManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.by_name.keys().collect();
        names.sort();
        f.debug_struct("ScriptEngineManager")
            .field("languages", &names)
            .finish()
    }
}

pub type NativeFunction = Rc<dyn Fn(&[Value]) -> Result<Value, ScriptError>>;
pub type NativeEvaluator = Rc<dyn Fn(&str, &Namespace) -> Result<Value, ScriptError>>;

/// An engine whose functions are Rust closures.
///
/// Functions are registered up front; script text is handed to an optional
/// evaluator. Hosts without an embedded language use this to back mapping
/// functions and listener callbacks.
pub struct NativeScriptEngine {
    language: String,
    functions: RefCell<HashMap<String, NativeFunction>>,
    evaluator: Option<NativeEvaluator>,
}

impl NativeScriptEngine {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            functions: RefCell::new(HashMap::new()),
            evaluator: None,
        }
    }

    pub fn with_evaluator(
        mut self,
        evaluator: impl Fn(&str, &Namespace) -> Result<Value, ScriptError> + 'static,
    ) -> Self {
        self.evaluator = Some(Rc::new(evaluator));
        self
    }

    pub fn define(
        &self,
        name: impl Into<String>,
        function: impl Fn(&[Value]) -> Result<Value, ScriptError> + 'static,
    ) {
        self.functions
            .borrow_mut()
            .insert(name.into(), Rc::new(function));
    }
}

impl ScriptEngine for NativeScriptEngine {
    fn language(&self) -> &str {
        &self.language
    }

    fn eval(&self, source: &str, bindings: &Namespace) -> Result<Value, ScriptError> {
        match &self.evaluator {
            Some(evaluator) => evaluator(source, bindings),
            None => Err(ScriptError::Unsupported(self.language.clone())),
        }
    }

    fn invoke_function(&self, name: &str, args: &[Value]) -> Result<Value, ScriptError> {
        let function = self
            .functions
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| ScriptError::NoSuchFunction(name.to_string()))?;
        function(args)
    }
}
