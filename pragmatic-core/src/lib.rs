//! # Pragmatic Core
//!
//! Stage graphs, execution and streaming for the Pragmatic RAG pipelines.
//!
//! This crate provides the building blocks shared by the indexing and query
//! pipelines:
//!
//! - **Graphs**: [`Graph`](graph::Graph) of named stages wired port to port,
//!   assembled with a frontier-tracking [`GraphBuilder`](graph::GraphBuilder)
//! - **Execution**: the [`Executor`](executor::Executor) runs a graph once in
//!   dependency order
//! - **Streaming**: the [`StreamBridge`](streaming::StreamBridge) runs a graph on
//!   a background worker and exposes the generated reply as a chunk stream
//! - **Configuration**: immutable [`Settings`](config::Settings) with explicit overlays
//! - **Components**: the [`Component`] trait and a slot-keyed
//!   [`ComponentRegistry`](factory::ComponentRegistry)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pragmatic_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example(retriever: Arc<dyn Component>, llm: Arc<dyn Component>, prompt: Arc<dyn Component>) -> Result<()> {
//! let mut builder = GraphBuilder::new();
//! builder
//!     .add_stage("retriever", retriever, StageArgs::new().with("query", ""), StageOptions::new())?
//!     .add_stage(
//!         "prompt_builder",
//!         prompt,
//!         StageArgs::new().with("query", ""),
//!         StageOptions::new().connect_to("prompt_builder.documents"),
//!     )?
//!     .add("llm", llm)?;
//! let graph = builder.build();
//!
//! let runtime = RuntimeArgs::from([
//!     ("retriever".to_string(), Fields::new().with("query", "What is a pod?")),
//!     ("prompt_builder".to_string(), Fields::new().with("query", "What is a pod?")),
//! ]);
//! let outputs = Executor::new().run(&graph, runtime).await?;
//! println!("{}", outputs.first_reply("llm")?);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used types and traits
pub mod prelude;

// Core modules
pub mod config;
pub mod error;
pub mod executor;
pub mod factory;
pub mod graph;
pub mod streaming;
pub mod traits;
pub mod types;

// Re-export key types at crate root for convenience
pub use error::{PipelineError, Result};
pub use types::{Answer, Document, Fields, StageInputs, StageOutputs, StageValue};

// Re-export traits for convenience
pub use traits::*;

/// Version information for the Pragmatic core library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the Pragmatic core library.
pub const NAME: &str = env!("CARGO_PKG_NAME");
