use thiserror::Error;
use trellis_traits::{FactoryError, ResourceError, ScriptError};
use trellis_types::{ListenerError, NamespaceError, PropertyError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub col: usize,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.col)
    }
}

impl From<(usize, usize)> for Location {
    fn from((line, col): (usize, usize)) -> Self {
        Location { line, col }
    }
}

/// Converts byte offsets in a source into 1-based lines and columns.
///
/// Offsets are expected in increasing order. Each byte of the source is
/// scanned at most once, however many locations are asked for.
#[derive(Debug)]
pub(crate) struct LineTracker {
    offset: usize,
    line: usize,
    line_start: usize,
}

impl LineTracker {
    pub(crate) fn new() -> Self {
        Self {
            offset: 0,
            line: 1,
            line_start: 0,
        }
    }

    pub(crate) fn advance(&mut self, source: &str, pos: usize) -> Location {
        let pos = pos.min(source.len());
        if pos > self.offset {
            let scanned = &source.as_bytes()[self.offset..pos];
            for (i, _) in scanned.iter().enumerate().filter(|(_, b)| **b == b'\n') {
                self.line += 1;
                self.line_start = self.offset + i + 1;
            }
            self.offset = pos;
        }
        (self.line, pos.saturating_sub(self.line_start) + 1).into()
    }
}

/// The single error a failed load surfaces to the caller.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("XML parsing error at {location}: {message}")]
    Xml { message: String, location: Location },

    #[error("{message} ({location})")]
    Structure { message: String, location: Location },

    #[error("Type error: {0}")]
    Type(#[from] FactoryError),

    #[error(transparent)]
    Property(#[from] PropertyError),

    #[error(transparent)]
    Namespace(#[from] NamespaceError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    #[error("Script engine for \"{0}\" not found")]
    EngineNotFound(String),

    #[error("Invalid URL '{url}': {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Base location is undefined")]
    NoBaseLocation,

    #[error("Unsupported or malformed character set '{0}'")]
    Charset(String),

    #[error("Error in included document {location}: {source}")]
    Include {
        location: String,
        #[source]
        source: Box<LoadError>,
    },
}

impl LoadError {
    pub fn structure(message: impl Into<String>, location: Location) -> Self {
        Self::Structure {
            message: message.into(),
            location,
        }
    }

    pub fn xml(message: impl ToString, location: Location) -> Self {
        Self::Xml {
            message: message.to_string(),
            location,
        }
    }

    /// The innermost error, looking through include wrappers.
    pub fn root_cause(&self) -> &LoadError {
        match self {
            LoadError::Include { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
