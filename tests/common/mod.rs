#![allow(dead_code)]

pub mod widgets;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use trellis::traits::ScriptError;
use trellis::{
    BxmlLoader, InMemoryResourceProvider, LoadError, LoadOutcome, LoaderBuilder,
    NativeScriptEngine, ScriptEngineManager, Value,
};
use url::Url;

pub const ROOT: &str = "file:///app/";

/// Scripts whose text contains this marker fail to evaluate.
pub const FAILING_SCRIPT_MARKER: &str = "throw";

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// An in-memory application: documents, a widget registry and a native
/// "javascript" engine that records every script it is asked to evaluate.
pub struct Fixture {
    pub provider: Arc<InMemoryResourceProvider>,
    pub engine: Rc<NativeScriptEngine>,
    pub evaluated: Rc<RefCell<Vec<String>>>,
}

impl Fixture {
    pub fn new() -> Self {
        init();
        let evaluated = Rc::new(RefCell::new(Vec::new()));
        let log = evaluated.clone();
        let engine = NativeScriptEngine::new("javascript").with_evaluator(move |source, _| {
            log.borrow_mut().push(source.trim().to_string());
            if source.contains(FAILING_SCRIPT_MARKER) {
                return Err(ScriptError::Eval(format!("uncaught: {}", source.trim())));
            }
            Ok(Value::Null)
        });

        Self {
            provider: Arc::new(InMemoryResourceProvider::new()),
            engine: Rc::new(engine),
            evaluated,
        }
    }

    /// Stores `content` at `path` under the application root.
    pub fn add(&self, path: &str, content: &str) -> Url {
        self.provider
            .add(&format!("{ROOT}{path}"), content)
            .unwrap()
    }

    pub fn builder(&self) -> LoaderBuilder {
        let engines = ScriptEngineManager::new().register(self.engine.clone(), &["js"], &["js"]);
        BxmlLoader::builder()
            .with_type_factory(Rc::new(widgets::registry()))
            .with_script_engines(Rc::new(engines))
            .with_resource_provider(self.provider.clone())
            .with_root_location(Url::parse(ROOT).unwrap())
    }

    pub fn loader(&self) -> BxmlLoader {
        self.builder().build().unwrap()
    }

    pub fn load(&self, path: &str) -> Result<LoadOutcome, LoadError> {
        let location = Url::parse(ROOT).unwrap().join(path).unwrap();
        self.loader().load_url(&location)
    }

    pub fn evaluated(&self) -> Vec<String> {
        self.evaluated.borrow().clone()
    }
}
