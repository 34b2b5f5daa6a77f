//! BXML markup loader.
//!
//! A BXML document is XML in which uppercase elements construct objects,
//! lowercase elements address properties of their parent, and elements in
//! the `bxml` namespace control includes, scripts, definitions and
//! references. Loading produces the root value and the table of ids the
//! document declared.

mod attributes;
mod binding;
mod builder;
mod element;
pub mod error;
mod include;
pub mod listener;
pub mod loader;
mod parser;
mod script;

pub use error::{LoadError, Location};
pub use listener::{ARGUMENTS_KEY, ScriptEventListener, ScriptListenerAdapter};
pub use loader::{BxmlLoader, LoadOutcome, LoaderBuilder, Scope};

pub const BXML_PREFIX: &str = "bxml";
pub const BXML_NAMESPACE: &str = "http://trellis.dev/bxml";
pub const MIME_TYPE: &str = "application/bxml";
pub const BXML_EXTENSION: &str = "bxml";

pub const ID_ATTRIBUTE: &str = "id";

pub const INCLUDE_TAG: &str = "include";
pub const INCLUDE_SRC_ATTRIBUTE: &str = "src";
pub const INCLUDE_RESOURCES_ATTRIBUTE: &str = "resources";
pub const INCLUDE_INLINE_ATTRIBUTE: &str = "inline";
pub const INCLUDE_CHARSET_ATTRIBUTE: &str = "charset";

pub const SCRIPT_TAG: &str = "script";
pub const SCRIPT_SRC_ATTRIBUTE: &str = "src";

pub const DEFINE_TAG: &str = "define";

pub const REFERENCE_TAG: &str = "reference";
pub const REFERENCE_ID_ATTRIBUTE: &str = "id";

/// Attribute value prefixes. Doubling one escapes it.
pub const URL_PREFIX: char = '@';
pub const RESOURCE_KEY_PREFIX: char = '%';
pub const OBJECT_REFERENCE_PREFIX: char = '$';

pub const BINDING_PREFIX: &str = "${";
pub const BINDING_SUFFIX: &str = "}";
/// Separates a binding's source path from its mapping function.
pub const MAPPING_DELIMITER: char = ':';
pub const NULL_KEYWORD: &str = "null";

pub const LANGUAGE_PROCESSING_INSTRUCTION: &str = "language";
pub const DEFAULT_LANGUAGE: &str = "javascript";
