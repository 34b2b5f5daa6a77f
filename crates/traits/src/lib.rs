//! Collaborator contracts consumed by the trellis loader.

pub mod bundle;
pub mod factory;
pub mod resource;
pub mod script;

pub use bundle::{MapResourceBundle, ResourceBundle, ResourceBundleLoader};
pub use factory::{DictionaryFactory, FactoryError, TypeFactory, TypeRegistry};
pub use resource::{InMemoryResourceProvider, ResourceError, ResourceProvider, SharedResourceData};
pub use script::{
    NativeEvaluator, NativeFunction, NativeScriptEngine, ScriptEngine, ScriptEngineManager,
    ScriptEngineProvider, ScriptError,
};
