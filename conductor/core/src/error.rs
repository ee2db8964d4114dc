//! Error Types
//!
//! - [`ConfigError`]: story file or settings could not be loaded. Fatal at startup.
//! - [`BackendError`]: the chat backend failed. Recovered at the turn boundary.
//! - [`UndoError`]: soft failure of the undo protocol, reported as a notice.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration or story file
    #[error("Failed to read {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse the YAML story file
    #[error("Error parsing YAML story file: {0}")]
    StoryParseError(#[from] serde_yaml::Error),

    /// Failed to parse the TOML settings file
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised by the streaming chat backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// The HTTP client could not be constructed
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request could not be delivered
    #[error("Could not reach backend at {url}: {source}")]
    Connect {
        /// Endpoint that was attempted
        url: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a non-success status
    #[error("Backend returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// A streamed line could not be decoded
    #[error("Malformed stream line {line:?}: {reason}")]
    Malformed {
        /// The raw line as received
        line: String,
        /// Why it was rejected
        reason: String,
    },

    /// The backend reported an error inside the stream
    #[error("Backend error: {0}")]
    Remote(String),

    /// The connection broke while the body was streaming
    #[error("Stream interrupted: {0}")]
    Transport(#[source] reqwest::Error),

    /// The producer went away without a completion marker
    #[error("Stream closed before completion")]
    StreamClosed,
}

impl BackendError {
    /// Classify this error for the presentation layer
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Client(_) | Self::Connect { .. } => ErrorKind::Connection,
            Self::Status { .. } => ErrorKind::Status,
            Self::Malformed { .. } => ErrorKind::Parse,
            Self::Remote(_) => ErrorKind::Remote,
            Self::Transport(_) | Self::StreamClosed => ErrorKind::Stream,
        }
    }
}

/// Coarse error classification passed to `Presentation::on_error`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Backend unreachable
    Connection,
    /// Non-success HTTP status
    Status,
    /// Undecodable stream unit
    Parse,
    /// Error reported by the backend itself
    Remote,
    /// Stream broke mid-turn
    Stream,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connection => "connection",
            Self::Status => "status",
            Self::Parse => "parse",
            Self::Remote => "backend",
            Self::Stream => "stream",
        };
        f.write_str(name)
    }
}

/// Soft failures of the undo protocol
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum UndoError {
    /// There is no assistant passage at the end of the history
    #[error("No DM message to undo.")]
    NothingToUndo,

    /// A passage was already retracted and is waiting for its replacement
    #[error("Already rewriting the last passage.")]
    AlreadyEditing,
}
