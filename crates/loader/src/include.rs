//! `bxml:include`: loading another document as a subtree.

use crate::element::Element;
use crate::error::{LoadError, Location};
use crate::loader::{BxmlLoader, DocumentContext, Session};
use crate::{
    INCLUDE_CHARSET_ATTRIBUTE, INCLUDE_INLINE_ATTRIBUTE, INCLUDE_RESOURCES_ATTRIBUTE,
    INCLUDE_SRC_ATTRIBUTE, INCLUDE_TAG, OBJECT_REFERENCE_PREFIX,
};
use encoding_rs::Encoding;
use trellis_types::{Namespace, Value};

/// Loads the document an include element points at and returns its root.
///
/// `inline="true"` shares the includer's table; otherwise the child gets a
/// private one.
pub(crate) fn load_include(
    loader: &BxmlLoader,
    session: &Session,
    context: &DocumentContext,
    element: &Element,
) -> Result<Value, LoadError> {
    let at = element.location;
    let src = element.control(INCLUDE_SRC_ATTRIBUTE).ok_or_else(|| {
        missing_attribute(INCLUDE_SRC_ATTRIBUTE, at)
    })?;
    let src = indirect_source(src, &context.namespace)?;

    if context.depth + 1 > loader.max_include_depth {
        return Err(LoadError::structure(
            format!(
                "Include of \"{src}\" exceeds the maximum depth of {}.",
                loader.max_include_depth
            ),
            at,
        ));
    }

    let resources = match element.control(INCLUDE_RESOURCES_ATTRIBUTE) {
        Some(base_name) => {
            let bundle_loader = loader.bundle_loader.as_ref().ok_or_else(|| {
                LoadError::structure(
                    format!("No resource bundle loader is configured for \"{base_name}\"."),
                    at,
                )
            })?;
            Some(bundle_loader.load_bundle(base_name, context.resources.clone())?)
        }
        None => context.resources.clone(),
    };

    let charset = match element.control(INCLUDE_CHARSET_ATTRIBUTE) {
        Some(label) => Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| LoadError::Charset(label.to_string()))?,
        None => loader.charset,
    };

    let inline = element
        .control(INCLUDE_INLINE_ATTRIBUTE)
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
    let namespace = if inline {
        context.namespace.clone()
    } else {
        Namespace::new()
    };

    let location = loader.resolve_source(context, &src)?;
    log::debug!(
        "Including {location} ({})",
        if inline { "inline" } else { "isolated" }
    );

    let child = DocumentContext {
        location: Some(location.clone()),
        namespace,
        resources,
        depth: context.depth + 1,
    };
    let wrap = |source: LoadError| LoadError::Include {
        location: location.to_string(),
        source: Box::new(source),
    };
    let text = loader.read_text(&location, charset).map_err(wrap)?;
    let outcome = loader
        .load_document(&text, child, session)
        .map_err(wrap)?;
    Ok(outcome.root)
}

/// `src="$path"` takes the source from the symbol table.
fn indirect_source(src: &str, namespace: &Namespace) -> Result<String, LoadError> {
    match src.strip_prefix(OBJECT_REFERENCE_PREFIX) {
        Some(path) if !path.is_empty() && !path.starts_with(OBJECT_REFERENCE_PREFIX) => {
            Ok(namespace.resolve_path(path)?.to_string())
        }
        Some(path) if path.starts_with(OBJECT_REFERENCE_PREFIX) => Ok(path.to_string()),
        _ => Ok(src.to_string()),
    }
}

fn missing_attribute(attribute: &str, at: Location) -> LoadError {
    LoadError::structure(
        format!(
            "{attribute} attribute is required for {}:{INCLUDE_TAG} tag.",
            crate::BXML_PREFIX
        ),
        at,
    )
}
