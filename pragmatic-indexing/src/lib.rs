//! Indexing pipelines for Pragmatic.
//!
//! This crate turns a document source into written, embedded documents:
//!
//! - **Sources**: remote URLs or a local directory scanned by [`FileDiscovery`](sources::FileDiscovery)
//! - **Built-in stages**: [`TextFileConverter`], [`DocumentCleaner`] and [`SimpleSplitter`]
//! - **Pipeline**: [`IndexingPipeline`] chains fetcher, converter, cleaner,
//!   splitter, embedder and writer stages according to the settings
//!
//! Fetchers, embedders, external splitters and writers are supplied through a
//! [`ComponentRegistry`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pragmatic_core::prelude::*;
//! use pragmatic_indexing::prelude::*;
//!
//! # async fn example(embedder: std::sync::Arc<dyn Component>, writer: std::sync::Arc<dyn Component>) -> Result<()> {
//! let settings = Settings::default();
//! let mut registry = ComponentRegistry::new();
//! register_builtin_components(&mut registry);
//! registry
//!     .register_instance(ComponentSlot::DocumentEmbedder, embedder)
//!     .register_instance(ComponentSlot::Writer, writer);
//!
//! let pipeline = IndexingPipeline::new(settings, &registry, IndexingSource::local("./docs")).await?;
//! let report = pipeline.run().await?;
//! println!("Indexed {} documents", report.documents_written);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod loaders;
pub mod pipeline;
pub mod sources;
pub mod transformers;

use pragmatic_core::{
    PipelineError,
    factory::{ComponentRegistry, ComponentSlot},
    traits::Component,
};
use std::sync::Arc;
use tracing::debug;

pub use crate::loaders::TextFileConverter;
pub use crate::pipeline::{IndexingPipeline, IndexingReport};
pub use crate::sources::{FileDiscovery, IndexingSource};
pub use crate::transformers::{DocumentCleaner, SimpleSplitter, SplitBy};

/// Fill the converter, cleaner and simple splitter slots with the built-in
/// stages, leaving slots that already have a factory untouched.
pub fn register_builtin_components(registry: &mut ComponentRegistry) {
    if !registry.contains(ComponentSlot::Converter) {
        registry.register_instance(ComponentSlot::Converter, Arc::new(TextFileConverter::new()));
    }
    if !registry.contains(ComponentSlot::Cleaner) {
        registry.register_instance(ComponentSlot::Cleaner, Arc::new(DocumentCleaner::new()));
    }
    if !registry.contains(ComponentSlot::SimpleSplitter) {
        registry.register_fn(ComponentSlot::SimpleSplitter, |settings| {
            let splitter = SimpleSplitter::from_settings(settings).map_err(PipelineError::from)?;
            Ok(Arc::new(splitter) as Arc<dyn Component>)
        });
    }
    debug!("Registered built-in indexing components");
}

/// Re-export commonly used types and traits.
pub mod prelude {
    pub use crate::error::{IndexingError, Result as IndexingResult};
    pub use crate::loaders::TextFileConverter;
    pub use crate::pipeline::{IndexingPipeline, IndexingReport};
    pub use crate::register_builtin_components;
    pub use crate::sources::{FileDiscovery, IndexingSource};
    pub use crate::transformers::{DocumentCleaner, SimpleSplitter, SplitBy};
}
