//! Addressable stage endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::PipelineError;

/// An input or output of a stage, written `stage` or `stage.field`.
///
/// A port without a field names the whole stage; the graph resolves it to a
/// concrete field from the stage role when a connection is made.
///
/// ```rust
/// use pragmatic_core::graph::Port;
///
/// let port: Port = "embedder.embedding".parse().unwrap();
/// assert_eq!(port.stage(), "embedder");
/// assert_eq!(port.field(), Some("embedding"));
/// assert_eq!(Port::stage_only("retriever").to_string(), "retriever");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Port {
    stage: String,
    field: Option<String>,
}

impl Port {
    /// Port naming a specific field of a stage.
    pub fn new<S: Into<String>, F: Into<String>>(stage: S, field: F) -> Self {
        Self {
            stage: stage.into(),
            field: Some(field.into()),
        }
    }

    /// Port naming a whole stage.
    pub fn stage_only<S: Into<String>>(stage: S) -> Self {
        Self {
            stage: stage.into(),
            field: None,
        }
    }

    /// Stage name.
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Field name, if the port is field-qualified.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}.{field}", self.stage),
            None => f.write_str(&self.stage),
        }
    }
}

impl FromStr for Port {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (stage, field) = match s.split_once('.') {
            Some((stage, field)) => (stage, Some(field)),
            None => (s, None),
        };
        if stage.is_empty() || field.is_some_and(str::is_empty) {
            return Err(PipelineError::invalid_port(s, "expected `stage` or `stage.field`"));
        }
        Ok(Self {
            stage: stage.to_string(),
            field: field.map(String::from),
        })
    }
}

impl From<&str> for Port {
    /// Parses `stage.field`; a string without a dot names the whole stage.
    fn from(value: &str) -> Self {
        match value.split_once('.') {
            Some((stage, field)) => Self::new(stage, field),
            None => Self::stage_only(value),
        }
    }
}
