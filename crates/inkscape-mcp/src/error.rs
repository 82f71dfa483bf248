use std::fmt;

use thiserror::Error;

/// High-level error type shared across Inkscape MCP components.
#[derive(Debug, Error)]
pub enum InkscapeError {
    /// Input rejected before any work was attempted: path escapes, size
    /// limits, unsafe actions or selectors, malformed documents.
    #[error("validation error: {0}")]
    Validation(String),
    #[error("config error: {0}")]
    Config(String),
    /// Failure while driving Inkscape or finishing an export.
    #[error("tool error: {0}")]
    Tool(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for InkscapeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl InkscapeError {
    pub fn context<T: fmt::Display>(self, ctx: T) -> Self {
        match self {
            InkscapeError::Validation(msg) => InkscapeError::Validation(format!("{ctx}: {msg}")),
            InkscapeError::Config(msg) => InkscapeError::Config(format!("{ctx}: {msg}")),
            InkscapeError::Tool(msg) => InkscapeError::Tool(format!("{ctx}: {msg}")),
            InkscapeError::Serialization(msg) => {
                InkscapeError::Serialization(format!("{ctx}: {msg}"))
            }
            InkscapeError::Io(err) => InkscapeError::Io(err),
        }
    }
}
