//! One-call entry points.
//!
//! Each function starts from [`Settings::default`], applies the caller's
//! overlay once, and fills the built-in stage slots the registry leaves
//! empty. The caller's registry is never modified.

use pragmatic_core::{
    Result,
    config::{Settings, SettingsOverlay},
    factory::ComponentRegistry,
};
use pragmatic_indexing::{IndexingPipeline, IndexingReport, IndexingSource};
use pragmatic_query::{EvaluationReport, Evaluator, RagPipeline, RagResponse};
use std::path::PathBuf;
use tracing::debug;

fn resolve(registry: &ComponentRegistry, overlay: &SettingsOverlay) -> Result<(Settings, ComponentRegistry)> {
    let settings = Settings::default().with_overlay(overlay)?;
    settings.validate()?;

    let mut registry = registry.clone();
    pragmatic_indexing::register_builtin_components(&mut registry);
    pragmatic_query::register_builtin_components(&mut registry);
    debug!("Resolved settings with {} overrides", overlay.iter().count());
    Ok((settings, registry))
}

/// Build an indexing pipeline over a local directory.
pub async fn create_index_pipeline<P: Into<PathBuf>>(
    path: P,
    registry: &ComponentRegistry,
    overlay: &SettingsOverlay,
) -> Result<IndexingPipeline> {
    let (settings, registry) = resolve(registry, overlay)?;
    IndexingPipeline::new(settings, &registry, IndexingSource::local(path)).await
}

/// Build a RAG pipeline in the mode selected by `evaluation_mode`.
pub async fn create_rag_pipeline(
    registry: &ComponentRegistry,
    overlay: &SettingsOverlay,
) -> Result<RagPipeline> {
    let (settings, registry) = resolve(registry, overlay)?;
    RagPipeline::new(settings, registry).await
}

/// Run an indexing pipeline.
pub async fn indexing_for_rag(pipeline: &IndexingPipeline) -> Result<IndexingReport> {
    pipeline.run().await
}

/// Answer one query.
pub async fn execute_rag_query(pipeline: &RagPipeline, query: &str) -> Result<RagResponse> {
    pipeline.query(query).await
}

/// Index the evaluation corpus, answer the evaluation questions and score them.
pub async fn evaluate_rag_pipeline(
    registry: &ComponentRegistry,
    overlay: &SettingsOverlay,
) -> Result<EvaluationReport> {
    let (settings, registry) = resolve(registry, overlay)?;
    Evaluator::new(settings, registry).evaluate().await
}
