//! Filesystem-based resource provider for native platforms.
//!
//! This provider serves `file:` URLs that fall inside a base directory.
//!
//! # Security
//!
//! The provider validates that every resolved path remains within the base
//! path, so an include such as `../../../etc/passwd` cannot escape it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use trellis_traits::{ResourceError, ResourceProvider, SharedResourceData};
use url::Url;

/// A resource provider that loads `file:` URLs from the local filesystem.
///
/// The base path is typically the directory containing the root document.
/// Attempts to reach files outside it return a `NotFound` error.
#[derive(Debug)]
pub struct FilesystemResourceProvider {
    base_path: PathBuf,
    /// Canonicalized base path for security checks
    canonical_base: Option<PathBuf>,
}

impl FilesystemResourceProvider {
    /// Creates a provider rooted at `base_path`.
    ///
    /// The base path is canonicalized to enable security checks.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        let base = base_path.as_ref().to_path_buf();
        // May fail if the directory doesn't exist yet
        let canonical = base.canonicalize().ok();
        Self {
            base_path: base,
            canonical_base: canonical,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base_path
    }

    /// The directory URL of the base path, used as the loader's root
    /// location for `/`-prefixed sources.
    pub fn root_location(&self) -> Result<Url, ResourceError> {
        let dir = self.canonical_base.as_ref().unwrap_or(&self.base_path);
        Url::from_directory_path(dir).map_err(|_| {
            ResourceError::InvalidFormat(format!(
                "{} cannot be expressed as a file URL",
                dir.display()
            ))
        })
    }

    /// The URL of a file relative to the base path.
    pub fn location_of(&self, relative: &str) -> Result<Url, ResourceError> {
        self.root_location()?
            .join(relative)
            .map_err(|e| ResourceError::InvalidFormat(format!("{relative}: {e}")))
    }

    /// Maps `location` to a path and validates it against the base.
    ///
    /// Returns `None` for non-file URLs and for paths that would escape the
    /// base directory.
    fn resolve_path_safe(&self, location: &Url) -> Option<PathBuf> {
        if location.scheme() != "file" {
            return None;
        }
        let full_path = location.to_file_path().ok()?;

        if let Ok(canonical) = full_path.canonicalize()
            && let Some(ref base) = self.canonical_base
        {
            if canonical.starts_with(base) {
                return Some(canonical);
            }
            // Escapes the base directory
            return None;
        }

        // The file doesn't exist; fall back to a lexical prefix check
        if full_path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return None;
        }
        let base = self.canonical_base.as_ref().unwrap_or(&self.base_path);
        full_path.starts_with(base).then_some(full_path)
    }
}

impl ResourceProvider for FilesystemResourceProvider {
    fn load(&self, location: &Url) -> Result<SharedResourceData, ResourceError> {
        let full_path = self.resolve_path_safe(location).ok_or_else(|| {
            ResourceError::NotFound(format!("{location} (outside {})", self.base_path.display()))
        })?;

        log::debug!("Reading {}", full_path.display());
        std::fs::read(&full_path).map(Arc::new).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ResourceError::NotFound(location.to_string())
            } else {
                ResourceError::LoadFailed {
                    location: location.to_string(),
                    message: e.to_string(),
                }
            }
        })
    }

    fn exists(&self, location: &Url) -> bool {
        self.resolve_path_safe(location)
            .map(|p| p.exists())
            .unwrap_or(false)
    }

    fn name(&self) -> &'static str {
        "FilesystemResourceProvider"
    }
}
