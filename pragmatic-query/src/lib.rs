//! Retrieval-augmented generation pipelines for Pragmatic.
//!
//! This crate assembles query-time stage graphs and runs them:
//!
//! - **Topologies**: sparse, dense and hybrid retrieval feeding an optional
//!   ranker, the prompt builder and the generator
//! - **Pipelines**: [`RagPipeline`] answers queries in batch or streams the
//!   generated reply, and rebuilds its graph when the [`Mode`] changes
//! - **Built-in stages**: [`DocumentJoiner`], [`PromptBuilder`] and [`AnswerBuilder`]
//! - **Evaluation**: [`Evaluator`] indexes a corpus, answers a question set
//!   and scores the answers with configured metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pragmatic_core::prelude::*;
//! use pragmatic_query::prelude::*;
//!
//! # async fn example(
//! #     embedder: std::sync::Arc<dyn Component>,
//! #     retriever: std::sync::Arc<dyn Component>,
//! #     generator: std::sync::Arc<dyn Component>,
//! # ) -> Result<()> {
//! let mut registry = ComponentRegistry::new();
//! register_builtin_components(&mut registry);
//! registry
//!     .register_instance(ComponentSlot::TextEmbedder, embedder)
//!     .register_instance(ComponentSlot::DenseRetriever, retriever)
//!     .register_instance(ComponentSlot::Generator, generator);
//!
//! let pipeline = RagPipeline::new(Settings::default(), registry).await?;
//! let response = pipeline.query("What is a pod?").await?;
//! println!("Answer: {}", response.text());
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod answer;
pub mod evaluation;
pub mod joiner;
pub mod pipeline;
pub mod prompt;
pub mod topology;

use pragmatic_core::factory::{ComponentRegistry, ComponentSlot};
use std::sync::Arc;
use tracing::debug;

pub use crate::answer::AnswerBuilder;
pub use crate::evaluation::{EvaluationDataset, EvaluationReport, EvaluationSample, Evaluator};
pub use crate::joiner::DocumentJoiner;
pub use crate::pipeline::{RagPipeline, RagResponse};
pub use crate::prompt::PromptBuilder;
pub use crate::topology::Mode;

/// Fill the document joiner, prompt builder and answer builder slots with the
/// built-in stages, leaving slots that already have a factory untouched.
pub fn register_builtin_components(registry: &mut ComponentRegistry) {
    if !registry.contains(ComponentSlot::DocumentJoiner) {
        registry.register_instance(ComponentSlot::DocumentJoiner, Arc::new(DocumentJoiner::new()));
    }
    if !registry.contains(ComponentSlot::PromptBuilder) {
        registry.register_instance(ComponentSlot::PromptBuilder, Arc::new(PromptBuilder::new()));
    }
    if !registry.contains(ComponentSlot::AnswerBuilder) {
        registry.register_instance(ComponentSlot::AnswerBuilder, Arc::new(AnswerBuilder::new()));
    }
    debug!("Registered built-in query components");
}

/// Re-export commonly used types and traits.
pub mod prelude {
    pub use crate::answer::AnswerBuilder;
    pub use crate::evaluation::{EvaluationDataset, EvaluationReport, EvaluationSample, Evaluator};
    pub use crate::joiner::DocumentJoiner;
    pub use crate::pipeline::{RagPipeline, RagResponse};
    pub use crate::prompt::{BASE_RAG_PROMPT, PromptBuilder};
    pub use crate::register_builtin_components;
    pub use crate::topology::{Mode, build_rag_graph};
}
