//! Sequential graph execution.
//!
//! The [`Executor`] walks a [`Graph`] in topological order, resolving each
//! stage's inputs from its static arguments, caller overrides, and the outputs
//! of upstream stages, and collects every stage's outputs into
//! [`PipelineOutputs`].

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use tracing::{debug, error, info, instrument};

use crate::{
    PipelineError, Result,
    graph::{Graph, Stage},
    streaming::ChunkSink,
    traits::InvocationContext,
    types::{Answer, Fields, StageInputs, StageOutputs, StageValue},
};

/// Per-stage argument overrides supplied at run time, keyed by stage name.
///
/// Overrides take precedence over configured literal arguments, which lets a
/// caller inject the live query into a graph that was built once.
pub type RuntimeArgs = HashMap<String, Fields>;

/// Runs a built graph once.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    sink: Option<ChunkSink>,
}

impl Executor {
    /// Executor for a batch run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor whose stages publish partial output into `sink`.
    pub fn streaming(sink: ChunkSink) -> Self {
        Self { sink: Some(sink) }
    }

    /// Execute every stage once and return all outputs.
    ///
    /// Fails with [`PipelineError::CyclicGraph`] before any stage runs when the
    /// connections contain a cycle, and aborts on the first stage failure with
    /// [`PipelineError::StageExecution`].
    #[instrument(skip_all, fields(stages = graph.len()))]
    pub async fn run(&self, graph: &Graph, mut runtime: RuntimeArgs) -> Result<PipelineOutputs> {
        if let Some(stage) = runtime.keys().find(|name| !graph.contains(name.as_str())) {
            return Err(PipelineError::unknown_stage(stage.clone()));
        }

        let order = graph.topological_order()?;
        let ctx = match &self.sink {
            Some(sink) => InvocationContext::streaming(sink.clone()),
            None => InvocationContext::new(),
        };

        info!("Running pipeline with {} stages", order.len());
        let started = Instant::now();
        let mut outputs = PipelineOutputs::default();

        for stage in order {
            if ctx.is_cancelled() {
                debug!("Consumer went away, stopping before stage {}", stage.name());
                return Err(PipelineError::StreamCancelled);
            }

            let overrides = runtime.remove(stage.name()).unwrap_or_default();
            let inputs = resolve_inputs(graph, stage, overrides, &outputs)?;

            let stage_started = Instant::now();
            let produced = stage
                .component()
                .invoke(inputs, &ctx)
                .await
                .map_err(|e| {
                    error!("Stage {} failed: {}", stage.name(), e);
                    PipelineError::stage_execution(stage.name(), e)
                })?;
            debug!(
                "Stage {} ({}) completed in {:?}, produced: {:?}",
                stage.name(),
                stage.role(),
                stage_started.elapsed(),
                produced.names().collect::<Vec<_>>()
            );
            outputs.insert(stage.name().to_string(), produced);
        }

        info!("Pipeline run completed in {:?}", started.elapsed());
        Ok(outputs)
    }
}

/// Literals, then overrides, then values carried over incoming connections.
fn resolve_inputs(
    graph: &Graph,
    stage: &Stage,
    overrides: Fields,
    outputs: &PipelineOutputs,
) -> Result<StageInputs> {
    let role = stage.role();
    let mut inputs = stage.args().literals();
    inputs.extend(overrides);

    let mut carried: BTreeMap<&str, Vec<StageValue>> = BTreeMap::new();
    for connection in graph.incoming(stage.name()) {
        let source = connection.source();
        let value = outputs.field(source.stage(), connection.source_field())?;
        carried
            .entry(connection.target_field())
            .or_default()
            .push(value.clone());
    }

    for (field, values) in carried {
        let variadic = role.input(field).is_some_and(|spec| spec.variadic);
        let value = if variadic {
            StageValue::merge(values)?
        } else {
            values.into_iter().next().unwrap_or(StageValue::Null)
        };
        inputs.insert(field, value);
    }

    if let Some(spec) = role
        .inputs()
        .iter()
        .find(|spec| spec.required && !inputs.contains(spec.name))
    {
        return Err(PipelineError::missing_input(stage.name(), spec.name));
    }
    Ok(inputs)
}

/// Outputs of one run, keyed by stage name.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutputs(HashMap<String, StageOutputs>);

impl PipelineOutputs {
    pub(crate) fn insert(&mut self, stage: String, outputs: StageOutputs) {
        self.0.insert(stage, outputs);
    }

    /// Outputs of one stage, if it ran.
    pub fn stage(&self, name: &str) -> Option<&StageOutputs> {
        self.0.get(name)
    }

    /// Names of all stages that produced outputs.
    pub fn stage_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Whether `stage.field` was produced.
    pub fn contains(&self, stage: &str, field: &str) -> bool {
        self.stage(stage).is_some_and(|outputs| outputs.contains(field))
    }

    /// One output field; [`PipelineError::MissingOutput`] when absent.
    pub fn field(&self, stage: &str, field: &str) -> Result<&StageValue> {
        self.stage(stage)
            .and_then(|outputs| outputs.get(field))
            .ok_or_else(|| PipelineError::missing_output(stage, field))
    }

    /// The first reply of a generation stage.
    pub fn first_reply(&self, stage: &str) -> Result<&str> {
        self.field(stage, "replies")?
            .as_text_list()
            .and_then(|replies| replies.first())
            .map(String::as_str)
            .ok_or_else(|| PipelineError::missing_output(stage, "replies"))
    }

    /// The first answer of an answer-aggregation stage.
    pub fn first_answer(&self, stage: &str) -> Result<&Answer> {
        self.field(stage, "answers")?
            .as_answers()
            .and_then(|answers| answers.first())
            .ok_or_else(|| PipelineError::missing_output(stage, "answers"))
    }

    /// Take the outputs of one stage.
    pub fn take_stage(&mut self, name: &str) -> Option<StageOutputs> {
        self.0.remove(name)
    }

    /// Number of stages with outputs.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no stage produced outputs.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, StageArgs, StageOptions};
    use crate::traits::{Component, StageRole};
    use crate::types::Document;
    use async_trait::async_trait;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Retriever(&'static str);

    #[async_trait]
    impl Component for Retriever {
        fn role(&self) -> StageRole {
            StageRole::SparseRetriever
        }

        async fn invoke(&self, inputs: StageInputs, _: &InvocationContext) -> Result<StageOutputs> {
            let query = inputs.text("query")?;
            Ok(StageOutputs::new().with(
                "documents",
                vec![Document::new(format!("{}:{query}", self.0))],
            ))
        }
    }

    #[derive(Debug)]
    struct Joiner;

    #[async_trait]
    impl Component for Joiner {
        fn role(&self) -> StageRole {
            StageRole::DocumentJoiner
        }

        async fn invoke(&self, mut inputs: StageInputs, _: &InvocationContext) -> Result<StageOutputs> {
            let documents = inputs.take_documents("documents")?;
            Ok(StageOutputs::new().with("documents", documents))
        }
    }

    #[derive(Debug)]
    struct Broken;

    #[async_trait]
    impl Component for Broken {
        fn role(&self) -> StageRole {
            StageRole::Generator
        }

        async fn invoke(&self, _: StageInputs, _: &InvocationContext) -> Result<StageOutputs> {
            Err(PipelineError::component("model unavailable"))
        }
    }

    fn fan_in() -> Graph {
        let mut builder = GraphBuilder::new();
        builder
            .add_stage(
                "left",
                Arc::new(Retriever("left")),
                StageArgs::new().with("query", ""),
                StageOptions::unconnected(),
            )
            .unwrap()
            .add_stage(
                "right",
                Arc::new(Retriever("right")),
                StageArgs::new().with("query", ""),
                StageOptions::unconnected(),
            )
            .unwrap()
            .add_stage("joiner", Arc::new(Joiner), StageArgs::new(), StageOptions::unconnected())
            .unwrap()
            .connect("left", "joiner")
            .unwrap()
            .connect("right", "joiner")
            .unwrap();
        builder.build()
    }

    #[tokio::test]
    async fn test_overrides_win_over_literals() {
        let graph = fan_in();
        let runtime = RuntimeArgs::from([
            ("left".to_string(), Fields::new().with("query", "Q")),
            ("right".to_string(), Fields::new().with("query", "Q")),
        ]);

        let outputs = Executor::new().run(&graph, runtime).await.unwrap();
        let joined = outputs.field("joiner", "documents").unwrap().as_documents().unwrap();
        let contents: Vec<_> = joined.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["left:Q", "right:Q"]);
    }

    #[tokio::test]
    async fn test_unknown_runtime_stage_is_rejected() {
        let runtime = RuntimeArgs::from([("ghost".to_string(), Fields::new())]);
        let err = Executor::new().run(&fan_in(), runtime).await.unwrap_err();
        assert!(matches!(err, PipelineError::UnknownStage { .. }));
    }

    #[tokio::test]
    async fn test_stage_failure_is_wrapped_with_stage_name() {
        let mut builder = GraphBuilder::new();
        builder
            .add_stage(
                "llm",
                Arc::new(Broken),
                StageArgs::new().with("prompt", "p"),
                StageOptions::new(),
            )
            .unwrap();
        let err = Executor::new()
            .run(&builder.build(), RuntimeArgs::new())
            .await
            .unwrap_err();
        assert_eq!(err.stage_name(), Some("llm"));
        assert!(err.to_string().contains("model unavailable"));
    }

    #[tokio::test]
    async fn test_missing_required_input() {
        let mut builder = GraphBuilder::new();
        builder.add("llm", Arc::new(Broken)).unwrap();
        let err = Executor::new()
            .run(&builder.build(), RuntimeArgs::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingInput { ref stage, ref field } if stage == "llm" && field == "prompt"
        ));
    }

    #[test]
    fn test_terminal_extraction_reports_missing_output() {
        let mut outputs = PipelineOutputs::default();
        outputs.insert(
            "llm".to_string(),
            StageOutputs::new().with("replies", Vec::<String>::new()),
        );
        assert!(matches!(
            outputs.first_reply("llm"),
            Err(PipelineError::MissingOutput { .. })
        ));
        assert!(matches!(
            outputs.first_answer("answer_builder"),
            Err(PipelineError::MissingOutput { .. })
        ));
    }
}
