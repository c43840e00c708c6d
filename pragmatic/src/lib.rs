//! # Pragmatic - RAG pipelines as stage graphs
//!
//! Pragmatic composes indexing and retrieval-augmented generation pipelines
//! out of named stages wired into a directed graph. Collaborators such as
//! embedders, vector stores and language models plug in through a component
//! registry; the topology is selected from [`Settings`](core::config::Settings).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pragmatic::prelude::*;
//!
//! # async fn example(registry: ComponentRegistry) -> Result<()> {
//! let overlay = SettingsOverlay::new().with("retriever_type", "hybrid");
//!
//! let indexing = pragmatic::api::create_index_pipeline("./docs", &registry, &overlay).await?;
//! pragmatic::api::indexing_for_rag(&indexing).await?;
//!
//! let rag = pragmatic::api::create_rag_pipeline(&registry, &overlay).await?;
//! let response = pragmatic::api::execute_rag_query(&rag, "How do I scale a deployment?").await?;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **pragmatic-core**: stage graphs, execution, streaming, settings and the component registry
//! - **pragmatic-indexing**: indexing chains and built-in document stages
//! - **pragmatic-query**: retrieval topologies, RAG pipelines and evaluation

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export all public APIs from sub-crates
pub use pragmatic_core as core;
pub use pragmatic_indexing as indexing;
pub use pragmatic_query as query;

pub mod api;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and traits
/// from all Pragmatic crates.
pub mod prelude {
    pub use pragmatic_core::prelude::*;

    pub use pragmatic_indexing::{IndexingPipeline, IndexingReport, IndexingSource};
    pub use pragmatic_query::{EvaluationReport, Mode, RagPipeline, RagResponse};

    pub use crate::api::{
        create_index_pipeline, create_rag_pipeline, evaluate_rag_pipeline, execute_rag_query,
        indexing_for_rag,
    };
}

/// Version information for the Pragmatic framework.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
