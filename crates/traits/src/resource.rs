//! ResourceProvider trait for abstracting document and script loading.
//!
//! The loader addresses every document, include and script source by URL.
//! Providers decide which URLs they can serve.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use url::Url;

/// Error type for resource loading operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResourceError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Failed to load resource '{location}': {message}")]
    LoadFailed { location: String, message: String },

    #[error("Invalid resource format: {0}")]
    InvalidFormat(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ResourceError {
    fn from(err: std::io::Error) -> Self {
        ResourceError::Io(err.to_string())
    }
}

/// Shared resource data type (reference-counted bytes).
pub type SharedResourceData = Arc<Vec<u8>>;

/// A source of raw document bytes.
///
/// The returned buffer is owned by the caller; nothing stays open once
/// `load` returns, on success or failure.
pub trait ResourceProvider: Send + Sync + Debug {
    /// Load the resource at `location`.
    fn load(&self, location: &Url) -> Result<SharedResourceData, ResourceError>;

    /// Check if a resource exists.
    fn exists(&self, location: &Url) -> bool;

    /// Returns a human-readable name for this provider (for logging/debugging).
    fn name(&self) -> &'static str;
}

/// An in-memory resource provider keyed by absolute URL.
///
/// Resources are stored in memory and must be pre-populated before use.
#[derive(Debug, Default)]
pub struct InMemoryResourceProvider {
    resources: RwLock<HashMap<Url, SharedResourceData>>,
}

impl InMemoryResourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource under `location`, which must be an absolute URL.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError::InvalidFormat` for an unparsable URL and
    /// `ResourceError::LoadFailed` if the internal lock is poisoned.
    pub fn add(&self, location: &str, data: impl Into<Vec<u8>>) -> Result<Url, ResourceError> {
        let url = Url::parse(location)
            .map_err(|e| ResourceError::InvalidFormat(format!("{location}: {e}")))?;
        self.add_shared(url.clone(), Arc::new(data.into()))?;
        Ok(url)
    }

    pub fn add_shared(&self, location: Url, data: SharedResourceData) -> Result<(), ResourceError> {
        let mut resources = self
            .resources
            .write()
            .map_err(|_| ResourceError::LoadFailed {
                location: location.to_string(),
                message: "resource store lock poisoned".to_string(),
            })?;
        resources.insert(location, data);
        Ok(())
    }

    /// Get the number of resources in the store.
    ///
    /// Returns 0 if the lock is poisoned.
    pub fn len(&self) -> usize {
        self.resources.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResourceProvider for InMemoryResourceProvider {
    fn load(&self, location: &Url) -> Result<SharedResourceData, ResourceError> {
        let resources = self
            .resources
            .read()
            .map_err(|_| ResourceError::LoadFailed {
                location: location.to_string(),
                message: "resource store lock poisoned".to_string(),
            })?;
        resources
            .get(location)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound(location.to_string()))
    }

    fn exists(&self, location: &Url) -> bool {
        self.resources
            .read()
            .map(|r| r.contains_key(location))
            .unwrap_or(false)
    }

    fn name(&self) -> &'static str {
        "InMemoryResourceProvider"
    }
}
