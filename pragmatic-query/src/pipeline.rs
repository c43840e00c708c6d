//! The RAG pipeline wrapper: build once, query many times.

use pragmatic_core::{
    Answer, PipelineError, Result,
    config::Settings,
    executor::{Executor, PipelineOutputs, RuntimeArgs},
    factory::ComponentRegistry,
    graph::Graph,
    streaming::{ChunkStream, StreamBridge, StreamOutcome, StreamState},
    types::{Fields, StageValue},
};
use tracing::{debug, info, instrument};

use crate::topology::{self, ANSWER_BUILDER, LLM, Mode, QUERY_FIELDS};

/// Result of a non-streaming query.
#[derive(Debug, Clone, PartialEq)]
pub enum RagResponse {
    /// First reply of the generation stage (standard mode).
    Reply(String),
    /// First aggregated answer (evaluation mode).
    Answer(Answer),
}

impl RagResponse {
    /// The generated text.
    pub fn text(&self) -> &str {
        match self {
            Self::Reply(reply) => reply,
            Self::Answer(answer) => &answer.data,
        }
    }

    /// The aggregated answer, when built in evaluation mode.
    pub fn answer(&self) -> Option<&Answer> {
        match self {
            Self::Answer(answer) => Some(answer),
            Self::Reply(_) => None,
        }
    }

    /// Take the aggregated answer, when built in evaluation mode.
    pub fn into_answer(self) -> Option<Answer> {
        match self {
            Self::Answer(answer) => Some(answer),
            Self::Reply(_) => None,
        }
    }
}

/// A retrieval-augmented generation pipeline.
///
/// The graph is built from the settings when the pipeline is created and
/// reused for every query; the live query replaces the `query`/`text`
/// placeholders declared by its stages. Switching the [`Mode`] builds a
/// fresh graph.
///
/// Streaming and evaluation mode exclude each other: combining them fails
/// with [`PipelineError::IncompatibleMode`] before any stage runs.
///
/// # Examples
///
/// ```rust,no_run
/// use futures::StreamExt;
/// use pragmatic_core::prelude::*;
/// use pragmatic_query::prelude::*;
///
/// # async fn example(registry: ComponentRegistry) -> Result<()> {
/// let settings = Settings::default();
/// let mut pipeline = RagPipeline::new(settings, registry).await?;
///
/// let response = pipeline.query("How do I restart a pod?").await?;
/// println!("{}", response.text());
///
/// let mut chunks = pipeline.stream("How do I restart a pod?")?;
/// while let Some(chunk) = chunks.next().await {
///     print!("{}", chunk?);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RagPipeline {
    settings: Settings,
    registry: ComponentRegistry,
    mode: Mode,
    graph: Graph,
    bridge: StreamBridge,
}

impl RagPipeline {
    /// Build a pipeline in the mode selected by `evaluation_mode`.
    pub async fn new(settings: Settings, registry: ComponentRegistry) -> Result<Self> {
        let mode = Mode::from_flag(settings.evaluation_mode);
        Self::with_mode(settings, registry, mode).await
    }

    /// Build a pipeline in an explicit mode.
    #[instrument(skip(settings, registry))]
    pub async fn with_mode(settings: Settings, registry: ComponentRegistry, mode: Mode) -> Result<Self> {
        settings.validate()?;
        check_modes(&settings, mode)?;
        let graph = topology::build_rag_graph(&settings, &registry, mode).await?;
        let bridge = StreamBridge::from_settings(&settings);
        Ok(Self {
            settings,
            registry,
            mode,
            graph,
            bridge,
        })
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The current graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Settings the pipeline was built with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Switch modes, rebuilding the graph on any actual change.
    ///
    /// Setting the current mode again is a no-op. On failure the pipeline
    /// keeps its previous mode and graph.
    pub async fn set_mode(&mut self, mode: Mode) -> Result<()> {
        if mode == self.mode {
            debug!("Pipeline already in {} mode", mode);
            return Ok(());
        }
        check_modes(&self.settings, mode)?;

        let graph = topology::build_rag_graph(&self.settings, &self.registry, mode).await?;
        info!("Rebuilt pipeline for {} mode (was {})", mode, self.mode);
        self.graph = graph;
        self.mode = mode;
        Ok(())
    }

    /// Runtime overrides placing `query` into every stage that declared a placeholder for it.
    pub fn query_args(&self, query: &str) -> RuntimeArgs {
        self.graph
            .stages()
            .iter()
            .filter_map(|stage| {
                let fields: Fields = QUERY_FIELDS
                    .iter()
                    .filter(|field| stage.args().contains(field))
                    .map(|field| ((*field).to_string(), StageValue::from(query)))
                    .collect();
                (!fields.is_empty()).then(|| (stage.name().to_string(), fields))
            })
            .collect()
    }

    /// Run the graph once and return every stage's outputs.
    #[instrument(skip(self), fields(mode = %self.mode))]
    pub async fn run(&self, query: &str) -> Result<PipelineOutputs> {
        Executor::new().run(&self.graph, self.query_args(query)).await
    }

    /// Answer a query.
    ///
    /// Returns the first generator reply in standard mode and the first
    /// aggregated answer in evaluation mode.
    pub async fn query(&self, query: &str) -> Result<RagResponse> {
        let outputs = self.run(query).await?;
        match self.mode {
            Mode::Standard => Ok(RagResponse::Reply(outputs.first_reply(LLM)?.to_string())),
            Mode::Evaluation => Ok(RagResponse::Answer(outputs.first_answer(ANSWER_BUILDER)?.clone())),
        }
    }

    /// Run the graph on a background worker and stream the generator's output.
    ///
    /// Dropping the returned stream stops consuming and frees the pipeline
    /// for the next stream.
    pub fn stream(&mut self, query: &str) -> Result<ChunkStream<'_>> {
        if self.mode.is_evaluation() {
            return Err(PipelineError::incompatible_mode(
                "response streaming is unavailable in evaluation mode",
            ));
        }

        let graph = self.graph.clone();
        let runtime = self.query_args(query);
        self.bridge.start_stream(move |sink| async move {
            Executor::streaming(sink).run(&graph, runtime).await.map(|_| ())
        })?;
        self.bridge.chunks()
    }

    /// Stop the active stream, if any, and wait for its worker.
    pub async fn stop_stream(&mut self) {
        self.bridge.stop().await;
    }

    /// Whether a stream is running.
    pub fn stream_state(&self) -> StreamState {
        self.bridge.state()
    }

    /// How the most recent stream ended.
    pub fn last_stream_outcome(&self) -> Option<StreamOutcome> {
        self.bridge.last_outcome()
    }
}

fn check_modes(settings: &Settings, mode: Mode) -> Result<()> {
    if settings.enable_response_streaming && mode.is_evaluation() {
        return Err(PipelineError::incompatible_mode(
            "enable_response_streaming and evaluation mode cannot be combined",
        ));
    }
    Ok(())
}
