//! Execution of `bxml:script` elements.
//!
//! Locating an engine or reading a script source is fatal. Errors raised by
//! the script itself are logged and the load continues.

use crate::error::{LoadError, Location};
use crate::loader::{BxmlLoader, DocumentContext};
use std::rc::Rc;
use trellis_traits::{ScriptEngine, ScriptError};

/// The file extension of a script source, if its last path segment has one.
fn extension_of(src: &str) -> Option<&str> {
    let file = src.rsplit('/').next().unwrap_or(src);
    file.rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}

pub(crate) fn run_script_element(
    loader: &BxmlLoader,
    context: &DocumentContext,
    language: &str,
    src: Option<&str>,
    text: Option<&str>,
    at: Location,
) -> Result<(), LoadError> {
    if let Some(src) = src {
        let extension = extension_of(src).ok_or_else(|| {
            LoadError::structure(format!("Cannot determine type of script \"{src}\"."), at)
        })?;
        let engine = loader
            .script_engines
            .engine_by_extension(extension)
            .ok_or_else(|| LoadError::EngineNotFound(format!(".{extension}")))?;
        let location = loader.resolve_source(context, src)?;
        let script = loader.read_text(&location, loader.charset)?;
        let _ = evaluate(&engine, &script, context, location.as_str());
    }

    if let Some(text) = text {
        let engine = loader.engine_by_name(language)?;
        let _ = evaluate(&engine, text, context, &context.display_name());
    }
    Ok(())
}

/// Evaluates inline listener script. Returns whether it ran cleanly.
pub(crate) fn evaluate_listener_script(
    engine: &Rc<dyn ScriptEngine>,
    text: &str,
    context: &DocumentContext,
) -> bool {
    evaluate(engine, text, context, &context.display_name()).is_ok()
}

fn evaluate(
    engine: &Rc<dyn ScriptEngine>,
    script: &str,
    context: &DocumentContext,
    origin: &str,
) -> Result<(), ScriptError> {
    match engine.eval(script, &context.namespace) {
        Ok(_) => Ok(()),
        Err(err) => {
            log::error!("Script in {origin} failed ({}): {err}", engine.language());
            log::debug!("{script}");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("handlers.js"), Some("js"));
        assert_eq!(extension_of("/scripts/v1.2/main.rhai"), Some("rhai"));
        assert_eq!(extension_of("scripts.d/main"), None);
        assert_eq!(extension_of("trailing."), None);
    }
}
