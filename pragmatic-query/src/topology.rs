//! Retrieval-augmented generation topologies.
//!
//! The recipe is chosen from [`Settings::retriever_type`] and the pipeline
//! [`Mode`]:
//!
//! ```text
//! sparse:  retriever
//! dense:   embedder -> retriever
//! hybrid:  sparse_retriever -> document_joiner <- dense_retriever <- embedder
//!
//! then:    [ranker] -> prompt_builder -> llm -> [answer_builder]
//! ```
//!
//! In evaluation mode `answer_builder` additionally reads the replies of
//! `llm` and the documents of the retrieval output stage.

use pragmatic_core::{
    Result,
    config::{RetrieverType, Settings},
    factory::{ComponentRegistry, ComponentSlot},
    graph::{Graph, GraphBuilder, Port, StageArgs, StageOptions},
};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tracing::{debug, info, instrument};

/// Retriever stage of the sparse and dense topologies.
pub const RETRIEVER: &str = "retriever";
/// Keyword branch of the hybrid topology.
pub const SPARSE_RETRIEVER: &str = "sparse_retriever";
/// Query embedding stage of the dense and hybrid topologies.
pub const EMBEDDER: &str = "embedder";
/// Vector branch of the hybrid topology.
pub const DENSE_RETRIEVER: &str = "dense_retriever";
/// Join stage of the hybrid topology.
pub const DOCUMENT_JOINER: &str = "document_joiner";
/// Optional re-ranking stage.
pub const RANKER: &str = "ranker";
/// Prompt rendering stage.
pub const PROMPT_BUILDER: &str = "prompt_builder";
/// Generation stage.
pub const LLM: &str = "llm";
/// Answer aggregation stage, present in evaluation mode only.
pub const ANSWER_BUILDER: &str = "answer_builder";

/// Placeholder fields replaced by the live query on every run.
pub const QUERY_FIELDS: [&str; 2] = ["query", "text"];

/// Which terminal shape the graph has.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Mode {
    /// Answer queries with the first generator reply.
    #[default]
    Standard,
    /// Aggregate replies, query and documents into answers.
    Evaluation,
}

impl Mode {
    /// Mode selected by the `evaluation_mode` flag.
    pub fn from_flag(evaluation: bool) -> Self {
        if evaluation { Self::Evaluation } else { Self::Standard }
    }

    /// Whether answers are aggregated.
    pub fn is_evaluation(self) -> bool {
        self == Self::Evaluation
    }
}

/// Stage whose documents leave the retrieval part of the topology.
pub fn retrieval_output(retriever: RetrieverType) -> &'static str {
    match retriever {
        RetrieverType::Sparse | RetrieverType::Dense => RETRIEVER,
        RetrieverType::Hybrid => DOCUMENT_JOINER,
    }
}

/// Build the RAG graph for the configured retriever type.
///
/// An unsupported retriever type fails before any stage is added.
#[instrument(skip(settings, registry), fields(retriever_type = %settings.retriever_type))]
pub async fn build_rag_graph(
    settings: &Settings,
    registry: &ComponentRegistry,
    mode: Mode,
) -> Result<Graph> {
    let retriever = settings.retriever()?;
    let mut builder = GraphBuilder::new();

    add_retrieval(&mut builder, settings, registry, retriever).await?;

    if settings.ranker_enabled {
        builder.add_stage(
            RANKER,
            registry.create(ComponentSlot::Ranker, settings).await?,
            StageArgs::new().with("query", "").with("top_k", settings.top_k),
            StageOptions::new(),
        )?;
    }

    builder
        .add_stage(
            PROMPT_BUILDER,
            registry.create(ComponentSlot::PromptBuilder, settings).await?,
            StageArgs::new().with("query", ""),
            StageOptions::new().connect_to(Port::new(PROMPT_BUILDER, "documents")),
        )?
        .add(LLM, registry.create(ComponentSlot::Generator, settings).await?)?;

    if mode.is_evaluation() {
        builder
            .add_stage(
                ANSWER_BUILDER,
                registry.create(ComponentSlot::AnswerBuilder, settings).await?,
                StageArgs::new().with("query", ""),
                StageOptions::unconnected(),
            )?
            .connect(Port::new(LLM, "replies"), Port::new(ANSWER_BUILDER, "replies"))?
            .connect(
                Port::stage_only(retrieval_output(retriever)),
                Port::new(ANSWER_BUILDER, "documents"),
            )?;
    }

    let graph = builder.build();
    info!(
        "Built {} RAG pipeline ({} mode): {} stages, {} connections",
        retriever,
        mode,
        graph.len(),
        graph.connections().len()
    );
    Ok(graph)
}

async fn add_retrieval(
    builder: &mut GraphBuilder,
    settings: &Settings,
    registry: &ComponentRegistry,
    retriever: RetrieverType,
) -> Result<()> {
    let top_k = settings.top_k;
    match retriever {
        RetrieverType::Sparse => {
            builder.add_stage(
                RETRIEVER,
                registry.create(ComponentSlot::SparseRetriever, settings).await?,
                StageArgs::new().with("query", "").with("top_k", top_k),
                StageOptions::new(),
            )?;
        }
        RetrieverType::Dense => {
            builder
                .add_stage(
                    EMBEDDER,
                    registry.create(ComponentSlot::TextEmbedder, settings).await?,
                    StageArgs::new().with("text", ""),
                    StageOptions::new(),
                )?
                .add_stage(
                    RETRIEVER,
                    registry.create(ComponentSlot::DenseRetriever, settings).await?,
                    StageArgs::new().with("top_k", top_k),
                    StageOptions::new()
                        .connect_from(Port::new(EMBEDDER, "embedding"))
                        .connect_to(Port::new(RETRIEVER, "query_embedding")),
                )?;
        }
        RetrieverType::Hybrid => {
            builder
                .add_stage(
                    SPARSE_RETRIEVER,
                    registry.create(ComponentSlot::SparseRetriever, settings).await?,
                    StageArgs::new().with("query", "").with("top_k", top_k),
                    StageOptions::unconnected(),
                )?
                .add_stage(
                    EMBEDDER,
                    registry.create(ComponentSlot::TextEmbedder, settings).await?,
                    StageArgs::new().with("text", ""),
                    StageOptions::new(),
                )?
                .add_stage(
                    DENSE_RETRIEVER,
                    registry.create(ComponentSlot::DenseRetriever, settings).await?,
                    StageArgs::new().with("top_k", top_k),
                    StageOptions::unconnected(),
                )?
                .add_stage(
                    DOCUMENT_JOINER,
                    registry.create(ComponentSlot::DocumentJoiner, settings).await?,
                    StageArgs::new(),
                    StageOptions::unconnected(),
                )?;

            builder
                .connect(Port::new(EMBEDDER, "embedding"), Port::new(DENSE_RETRIEVER, "query_embedding"))?
                .connect(Port::stage_only(SPARSE_RETRIEVER), Port::stage_only(DOCUMENT_JOINER))?
                .connect(Port::stage_only(DENSE_RETRIEVER), Port::stage_only(DOCUMENT_JOINER))?
                .set_frontier(DOCUMENT_JOINER)?;
            debug!("Hybrid branches joined at {}", DOCUMENT_JOINER);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_flag() {
        assert_eq!(Mode::from_flag(true), Mode::Evaluation);
        assert_eq!(Mode::from_flag(false), Mode::Standard);
        assert_eq!(Mode::Evaluation.to_string(), "evaluation");
    }

    #[test]
    fn test_retrieval_output_stage() {
        assert_eq!(retrieval_output(RetrieverType::Dense), RETRIEVER);
        assert_eq!(retrieval_output(RetrieverType::Hybrid), DOCUMENT_JOINER);
    }

    #[tokio::test]
    async fn test_unsupported_retriever_fails_before_any_component_is_requested() {
        let settings = Settings {
            retriever_type: "fuzzy".to_string(),
            ..Settings::default()
        };
        let err = build_rag_graph(&settings, &ComponentRegistry::new(), Mode::Standard)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            pragmatic_core::PipelineError::UnsupportedTopology { .. }
        ));
    }
}
