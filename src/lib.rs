//! trellis: loads BXML markup into live object graphs.
//!
//! This facade re-exports the workspace crates and adds the pieces a host
//! binary needs: logger setup and a JSON rendering of a loaded tree.

pub mod dump;
pub mod logging;

pub use trellis_loader::{
    BxmlLoader, LoadError, LoadOutcome, LoaderBuilder, Location, Scope, ScriptEventListener,
    ScriptListenerAdapter,
};
pub use trellis_resource::{FilesystemResourceProvider, JsonBundleLoader, JsonResourceBundle, Locale};
pub use trellis_traits::{
    DictionaryFactory, InMemoryResourceProvider, MapResourceBundle, NativeScriptEngine,
    ResourceBundle, ResourceProvider, ScriptEngine, ScriptEngineManager, TypeFactory, TypeRegistry,
};
pub use trellis_types::{
    Bean, Dictionary, HostObject, ListenerInterface, Namespace, ObjectList, ObjectRef,
    PropertyError, PropertyKind, ReturnKind, TypeDescriptor, Value, ValueType, Vote,
};

pub use trellis_loader as loader;
pub use trellis_resource as resource;
pub use trellis_traits as traits;
pub use trellis_types as types;
