//! Error types for the Pragmatic pipeline engine.
//!
//! Errors fall into three families: build-time graph errors raised while a
//! topology is being assembled, execution errors raised while a graph runs,
//! and streaming errors surfaced to the consumer of a chunk stream.

use std::time::Duration;

use thiserror::Error;

/// Core error type for the pipeline engine.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// I/O related errors (file discovery, reading sources, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stage with the same name is already part of the graph.
    #[error("Duplicate stage: {stage}")]
    DuplicateStage {
        /// Name of the stage that was added twice
        stage: String,
    },

    /// A connection or frontier refers to a stage that does not exist.
    #[error("Unknown stage: {stage}")]
    UnknownStage {
        /// Name of the missing stage
        stage: String,
    },

    /// A topology selector holds a value no recipe knows how to build.
    #[error("Unsupported {kind}: {value}")]
    UnsupportedTopology {
        /// What was being selected (retriever type, chunking method, ...)
        kind: String,
        /// The rejected value
        value: String,
    },

    /// A port does not exist on the stage role, or cannot take another connection.
    #[error("Invalid port {port}: {reason}")]
    InvalidPort {
        /// The offending port in `stage.field` form
        port: String,
        /// Why the port was rejected
        reason: String,
    },

    /// The connections of a graph contain a cycle.
    #[error("Graph contains a cycle through stages: {}", stages.join(", "))]
    CyclicGraph {
        /// Stages that could not be ordered
        stages: Vec<String>,
    },

    /// A stage collaborator failed while being invoked.
    #[error("Stage '{stage}' failed: {source}")]
    StageExecution {
        /// Name of the failing stage
        stage: String,
        /// The collaborator error
        #[source]
        source: Box<PipelineError>,
    },

    /// A requested output field was not produced by the stage.
    #[error("Missing output {stage}.{field}")]
    MissingOutput {
        /// Stage whose outputs were searched
        stage: String,
        /// Requested field
        field: String,
    },

    /// A required input could not be resolved before invoking a stage.
    #[error("Missing input {stage}.{field}")]
    MissingInput {
        /// Stage that lacks the input
        stage: String,
        /// Unresolved input field
        field: String,
    },

    /// Collaborator-specific failure raised inside a stage.
    #[error("Component error: {message}")]
    Component {
        /// Detailed error message
        message: String,
    },

    /// No chunk arrived within the idle timeout.
    #[error("Stream timed out after {timeout:?} without a chunk")]
    StreamTimeout {
        /// The configured idle timeout
        timeout: Duration,
    },

    /// A stream was started while another one is still active.
    #[error("A stream is already active on this bridge")]
    StreamAlreadyActive,

    /// The consumer stopped the stream before the producer finished.
    #[error("Stream was cancelled")]
    StreamCancelled,

    /// Chunks were requested while no stream is active.
    #[error("No active stream")]
    NoActiveStream,

    /// Two mutually exclusive modes were requested together.
    #[error("Incompatible modes: {message}")]
    IncompatibleMode {
        /// Detailed error message
        message: String,
    },

    /// Configuration validation errors
    #[error("Configuration error: {message}")]
    Configuration {
        /// Detailed error message
        message: String,
    },

    /// Input validation errors
    #[error("Validation error: {message}")]
    Validation {
        /// Detailed error message
        message: String,
    },

    /// Generic errors from external dependencies
    #[error("External error: {source}")]
    External {
        /// The underlying error
        #[source]
        source: anyhow::Error,
    },
}

impl PipelineError {
    /// Create a new duplicate stage error.
    pub fn duplicate_stage<S: Into<String>>(stage: S) -> Self {
        Self::DuplicateStage {
            stage: stage.into(),
        }
    }

    /// Create a new unknown stage error.
    pub fn unknown_stage<S: Into<String>>(stage: S) -> Self {
        Self::UnknownStage {
            stage: stage.into(),
        }
    }

    /// Create a new unsupported topology error.
    pub fn unsupported_topology<K: Into<String>, V: Into<String>>(kind: K, value: V) -> Self {
        Self::UnsupportedTopology {
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// Create a new invalid port error.
    pub fn invalid_port<P: ToString + ?Sized, R: Into<String>>(port: &P, reason: R) -> Self {
        Self::InvalidPort {
            port: port.to_string(),
            reason: reason.into(),
        }
    }

    /// Wrap a collaborator failure with the name of the stage that raised it.
    pub fn stage_execution<S: Into<String>>(stage: S, source: PipelineError) -> Self {
        Self::StageExecution {
            stage: stage.into(),
            source: Box::new(source),
        }
    }

    /// Create a new missing output error.
    pub fn missing_output<S: Into<String>, F: Into<String>>(stage: S, field: F) -> Self {
        Self::MissingOutput {
            stage: stage.into(),
            field: field.into(),
        }
    }

    /// Create a new missing input error.
    pub fn missing_input<S: Into<String>, F: Into<String>>(stage: S, field: F) -> Self {
        Self::MissingInput {
            stage: stage.into(),
            field: field.into(),
        }
    }

    /// Create a new component error with a message.
    pub fn component<S: Into<String>>(message: S) -> Self {
        Self::Component {
            message: message.into(),
        }
    }

    /// Create a new incompatible mode error with a message.
    pub fn incompatible_mode<S: Into<String>>(message: S) -> Self {
        Self::IncompatibleMode {
            message: message.into(),
        }
    }

    /// Create a new configuration error with a message.
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new validation error with a message.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new external error from any error that implements `Into<anyhow::Error>`.
    pub fn external<E: Into<anyhow::Error>>(error: E) -> Self {
        Self::External {
            source: error.into(),
        }
    }

    /// Check if this error was raised while assembling a graph.
    #[must_use]
    pub fn is_build_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateStage { .. }
                | Self::UnknownStage { .. }
                | Self::UnsupportedTopology { .. }
                | Self::InvalidPort { .. }
                | Self::Configuration { .. }
        )
    }

    /// Check if this error belongs to the streaming family.
    #[must_use]
    pub fn is_streaming_error(&self) -> bool {
        matches!(
            self,
            Self::StreamTimeout { .. }
                | Self::StreamAlreadyActive
                | Self::StreamCancelled
                | Self::NoActiveStream
                | Self::IncompatibleMode { .. }
        )
    }

    /// Name of the stage this error is attributed to, if any.
    #[must_use]
    pub fn stage_name(&self) -> Option<&str> {
        match self {
            Self::DuplicateStage { stage }
            | Self::UnknownStage { stage }
            | Self::StageExecution { stage, .. }
            | Self::MissingOutput { stage, .. }
            | Self::MissingInput { stage, .. } => Some(stage),
            _ => None,
        }
    }
}

/// Convert from `anyhow::Error` to `PipelineError`.
impl From<anyhow::Error> for PipelineError {
    fn from(error: anyhow::Error) -> Self {
        Self::External { source: error }
    }
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, PipelineError>;
