//! Resource providers and bundles for the trellis loader.
//!
//! ## Available Providers
//!
//! - [`FilesystemResourceProvider`]: Loads `file:` URLs from the local filesystem
//!
//! ## Bundles
//!
//! - [`JsonResourceBundle`] / [`JsonBundleLoader`]: localized JSON string tables
//!
//! The in-memory provider from trellis-traits is re-exported for convenience.

mod filesystem;
mod json_bundle;
mod locale;

pub use filesystem::FilesystemResourceProvider;
pub use json_bundle::{JsonBundleLoader, JsonResourceBundle, json_to_value};
pub use locale::Locale;

pub use trellis_traits::InMemoryResourceProvider;
