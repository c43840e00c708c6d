//! Error types for the indexing crate.

use pragmatic_core::PipelineError;
use thiserror::Error;

/// Errors raised while discovering sources or transforming documents.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// IO error occurred while reading files or directories.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The input path is not a directory.
    #[error("Not a directory: {path}")]
    NotADirectory {
        /// Path that was expected to be a directory.
        path: String,
    },

    /// A source file could not be read as UTF-8 text.
    #[error("Cannot read {path} as text: {message}")]
    Unreadable {
        /// Path of the offending source.
        path: String,
        /// What went wrong.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message describing the configuration issue.
        message: String,
    },

    /// Core pipeline error.
    #[error("Core error: {0}")]
    Core(#[from] PipelineError),
}

/// Result type alias for indexing operations.
pub type Result<T> = std::result::Result<T, IndexingError>;

impl IndexingError {
    /// Create a new unreadable source error.
    pub fn unreadable<P: Into<String>, S: Into<String>>(path: P, message: S) -> Self {
        Self::Unreadable {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

// Convert to PipelineError so stage failures flow through the executor
impl From<IndexingError> for PipelineError {
    fn from(err: IndexingError) -> Self {
        match err {
            IndexingError::Io(e) => Self::Io(e),
            IndexingError::Core(e) => e,
            IndexingError::Configuration { message } => Self::Configuration { message },
            other => Self::Component {
                message: other.to_string(),
            },
        }
    }
}
