//! Prelude module for convenient imports.
//!
//! ```rust
//! use pragmatic_core::prelude::*;
//!
//! let doc = Document::new("Hello, world!");
//! let args = StageArgs::new().with("query", "");
//! assert!(args.contains("query"));
//! ```

pub use crate::error::{PipelineError, Result};

pub use crate::types::{Answer, Document, Fields, StageInputs, StageOutputs, StageValue};

pub use crate::traits::{Component, InputSpec, InvocationContext, StageRole};

pub use crate::graph::{Connection, Graph, GraphBuilder, Port, Stage, StageArg, StageArgs, StageOptions};

pub use crate::executor::{Executor, PipelineOutputs, RuntimeArgs};

pub use crate::streaming::{ChunkSink, ChunkStream, StreamBridge, StreamOutcome, StreamState};

pub use crate::config::{ChunkingMethod, MetricConfig, RetrieverType, Settings, SettingsOverlay};

pub use crate::factory::{ComponentFactory, ComponentRegistry, ComponentSlot};

