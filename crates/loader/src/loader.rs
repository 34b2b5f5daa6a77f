//! The loader entry points and their configuration.

use crate::binding::apply_bindings;
use crate::builder::DocumentBuilder;
use crate::error::LoadError;
use crate::parser::parse_document;
use crate::DEFAULT_LANGUAGE;
use encoding_rs::{Encoding, UTF_8};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use trellis_traits::{
    DictionaryFactory, InMemoryResourceProvider, ResourceBundle, ResourceBundleLoader,
    ResourceProvider, ScriptEngine, ScriptEngineManager, ScriptEngineProvider, TypeFactory,
};
use trellis_types::{Namespace, ObjectRef, Value, object_id};
use url::Url;

const DEFAULT_MAX_INCLUDE_DEPTH: usize = 32;
const DEFAULT_ROOT_LOCATION: &str = "file:///";

/// Which symbol table a load registers its ids in.
#[derive(Debug, Clone, Default)]
pub enum Scope {
    /// A fresh table private to the document.
    #[default]
    Isolated,
    /// The given table, shared with whoever else holds it.
    Shared(Namespace),
}

impl Scope {
    fn into_namespace(self) -> Namespace {
        match self {
            Scope::Isolated => Namespace::new(),
            Scope::Shared(namespace) => namespace,
        }
    }
}

/// The result of a successful load.
#[derive(Debug)]
pub struct LoadOutcome {
    pub root: Value,
    pub namespace: Namespace,
    pub location: Option<Url>,
}

impl LoadOutcome {
    /// The root as an object, if it is one.
    pub fn root_object(&self) -> Option<&ObjectRef> {
        self.root.as_object()
    }

    pub fn get(&self, id: &str) -> Option<Value> {
        self.namespace.get(id)
    }
}

/// Per-document state threaded through recursive loads.
pub(crate) struct DocumentContext {
    pub location: Option<Url>,
    pub namespace: Namespace,
    pub resources: Option<Rc<dyn ResourceBundle>>,
    pub depth: usize,
}

impl DocumentContext {
    pub fn display_name(&self) -> String {
        self.location
            .as_ref()
            .map_or_else(|| "<string>".to_string(), |url| url.to_string())
    }
}

/// State shared by a top-level load and all of its includes.
#[derive(Default)]
pub(crate) struct Session {
    /// Every object composed into a parent so far, kept alive so identities
    /// stay unique for the whole load.
    parented: RefCell<HashMap<usize, ObjectRef>>,
}

impl Session {
    /// Records that `object` now has a parent. Returns `false` if it already had one.
    pub fn adopt(&self, object: &ObjectRef) -> bool {
        let mut parented = self.parented.borrow_mut();
        let id = object_id(object);
        if parented.contains_key(&id) {
            return false;
        }
        parented.insert(id, object.clone());
        true
    }
}

/// Loads BXML documents into object graphs.
///
/// Every collaborator is injected through [`LoaderBuilder`].
pub struct BxmlLoader {
    pub(crate) type_factory: Rc<dyn TypeFactory>,
    pub(crate) script_engines: Rc<dyn ScriptEngineProvider>,
    pub(crate) resource_provider: Arc<dyn ResourceProvider>,
    pub(crate) resources: Option<Rc<dyn ResourceBundle>>,
    pub(crate) bundle_loader: Option<Rc<dyn ResourceBundleLoader>>,
    pub(crate) charset: &'static Encoding,
    pub(crate) root_location: Url,
    pub(crate) default_language: String,
    pub(crate) max_include_depth: usize,
}

impl BxmlLoader {
    pub fn builder() -> LoaderBuilder {
        LoaderBuilder::new()
    }

    /// Loads a document held in memory, with no location and a private table.
    pub fn load_str(&self, source: &str) -> Result<LoadOutcome, LoadError> {
        self.load_str_in(source, Scope::Isolated, None)
    }

    /// Loads a document held in memory. `location` is the base for `@` URLs
    /// and relative includes.
    pub fn load_str_in(
        &self,
        source: &str,
        scope: Scope,
        location: Option<Url>,
    ) -> Result<LoadOutcome, LoadError> {
        let context = DocumentContext {
            location,
            namespace: scope.into_namespace(),
            resources: self.resources.clone(),
            depth: 0,
        };
        self.load_document(source, context, &Session::default())
    }

    /// Reads and loads the document at `location` with a private table.
    pub fn load_url(&self, location: &Url) -> Result<LoadOutcome, LoadError> {
        self.load_url_in(location, Scope::Isolated, None)
    }

    /// Reads and loads the document at `location`. `resources` replaces the
    /// loader's bundle for this document when given.
    pub fn load_url_in(
        &self,
        location: &Url,
        scope: Scope,
        resources: Option<Rc<dyn ResourceBundle>>,
    ) -> Result<LoadOutcome, LoadError> {
        let context = DocumentContext {
            location: Some(location.clone()),
            namespace: scope.into_namespace(),
            resources: resources.or_else(|| self.resources.clone()),
            depth: 0,
        };
        let source = self.read_text(location, self.charset)?;
        self.load_document(&source, context, &Session::default())
    }

    pub fn root_location(&self) -> &Url {
        &self.root_location
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Reads `location` through the resource provider and decodes it.
    pub(crate) fn read_text(
        &self,
        location: &Url,
        charset: &'static Encoding,
    ) -> Result<String, LoadError> {
        let bytes = self.resource_provider.load(location)?;
        let (text, _, had_errors) = charset.decode(&bytes);
        if had_errors {
            return Err(LoadError::Charset(format!(
                "{location} is not valid {}",
                charset.name()
            )));
        }
        Ok(text.into_owned())
    }

    /// Resolves a `src` value: `/`-prefixed sources are relative to the
    /// root location, everything else to the current document.
    pub(crate) fn resolve_source(
        &self,
        context: &DocumentContext,
        src: &str,
    ) -> Result<Url, LoadError> {
        let joined = match src.strip_prefix('/') {
            Some(rooted) => self.root_location.join(rooted),
            None => context
                .location
                .as_ref()
                .ok_or(LoadError::NoBaseLocation)?
                .join(src),
        };
        joined.map_err(|source| LoadError::Url {
            url: src.to_string(),
            source,
        })
    }

    pub(crate) fn engine_by_name(&self, language: &str) -> Result<Rc<dyn ScriptEngine>, LoadError> {
        self.script_engines
            .engine_by_name(language)
            .ok_or_else(|| LoadError::EngineNotFound(language.to_string()))
    }

    /// Builds the tree, applies bindings, then initializes the root.
    pub(crate) fn load_document(
        &self,
        source: &str,
        context: DocumentContext,
        session: &Session,
    ) -> Result<LoadOutcome, LoadError> {
        let name = context.display_name();
        log::debug!("Loading {name} (depth {})", context.depth);

        let mut builder = DocumentBuilder::new(self, session, &context);
        parse_document(source, &name, &mut builder)?;
        let document = builder.finish()?;

        let language = document.language;
        apply_bindings(document.bindings, &context.namespace, &|| {
            self.engine_by_name(&language)
        })
        .inspect_err(|err| log::error!("Failed to bind {name}: {err}"))?;

        if let Some(root) = document.root.as_object() {
            root.initialize(&context.namespace, context.location.as_ref())?;
        }

        log::debug!(
            "Loaded {name}: {} id(s) in scope",
            context.namespace.len()
        );
        Ok(LoadOutcome {
            root: document.root,
            namespace: context.namespace,
            location: context.location,
        })
    }
}

impl fmt::Debug for BxmlLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BxmlLoader")
            .field("resource_provider", &self.resource_provider.name())
            .field("charset", &self.charset.name())
            .field("root_location", &self.root_location.as_str())
            .field("default_language", &self.default_language)
            .field("max_include_depth", &self.max_include_depth)
            .finish()
    }
}

/// Configures a [`BxmlLoader`].
pub struct LoaderBuilder {
    type_factory: Option<Rc<dyn TypeFactory>>,
    script_engines: Option<Rc<dyn ScriptEngineProvider>>,
    resource_provider: Option<Arc<dyn ResourceProvider>>,
    resources: Option<Rc<dyn ResourceBundle>>,
    bundle_loader: Option<Rc<dyn ResourceBundleLoader>>,
    charset: String,
    root_location: Option<Url>,
    default_language: String,
    max_include_depth: usize,
}

impl Default for LoaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoaderBuilder {
    pub fn new() -> Self {
        Self {
            type_factory: None,
            script_engines: None,
            resource_provider: None,
            resources: None,
            bundle_loader: None,
            charset: UTF_8.name().to_string(),
            root_location: None,
            default_language: DEFAULT_LANGUAGE.to_string(),
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }

    /// Sets the factory for instance elements. Defaults to [`DictionaryFactory`].
    pub fn with_type_factory(mut self, factory: Rc<dyn TypeFactory>) -> Self {
        self.type_factory = Some(factory);
        self
    }

    pub fn with_script_engines(mut self, engines: Rc<dyn ScriptEngineProvider>) -> Self {
        self.script_engines = Some(engines);
        self
    }

    /// Sets where documents, includes, scripts and bundles are read from.
    pub fn with_resource_provider(mut self, provider: Arc<dyn ResourceProvider>) -> Self {
        self.resource_provider = Some(provider);
        self
    }

    /// Sets the bundle consulted for `%key` attribute values.
    pub fn with_resources(mut self, resources: Rc<dyn ResourceBundle>) -> Self {
        self.resources = Some(resources);
        self
    }

    /// Sets the loader used for `resources` overrides on includes.
    pub fn with_bundle_loader(mut self, loader: Rc<dyn ResourceBundleLoader>) -> Self {
        self.bundle_loader = Some(loader);
        self
    }

    /// Sets the encoding label used to decode documents. Defaults to UTF-8.
    pub fn with_charset(mut self, label: impl Into<String>) -> Self {
        self.charset = label.into();
        self
    }

    /// Sets the base for `/`-prefixed sources. Defaults to `file:///`.
    pub fn with_root_location(mut self, location: Url) -> Self {
        self.root_location = Some(location);
        self
    }

    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = language.into();
        self
    }

    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    /// Validates the configuration and builds the loader.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::Charset` for an unknown encoding label.
    pub fn build(self) -> Result<BxmlLoader, LoadError> {
        let charset = Encoding::for_label(self.charset.as_bytes())
            .ok_or_else(|| LoadError::Charset(self.charset.clone()))?;
        let root_location = match self.root_location {
            Some(url) => url,
            None => Url::parse(DEFAULT_ROOT_LOCATION).map_err(|source| LoadError::Url {
                url: DEFAULT_ROOT_LOCATION.to_string(),
                source,
            })?,
        };

        Ok(BxmlLoader {
            type_factory: self
                .type_factory
                .unwrap_or_else(|| Rc::new(DictionaryFactory)),
            script_engines: self
                .script_engines
                .unwrap_or_else(|| Rc::new(ScriptEngineManager::new())),
            resource_provider: self
                .resource_provider
                .unwrap_or_else(|| Arc::new(InMemoryResourceProvider::new())),
            resources: self.resources,
            bundle_loader: self.bundle_loader,
            charset,
            root_location,
            default_language: self.default_language,
            max_include_depth: self.max_include_depth,
        })
    }
}
