//! Scripted collaborators shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use pragmatic_core::prelude::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared record of collaborator calls, in invocation order.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().unwrap().is_empty()
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug)]
pub struct KeywordRetriever {
    pub log: CallLog,
}

#[async_trait]
impl Component for KeywordRetriever {
    fn role(&self) -> StageRole {
        StageRole::SparseRetriever
    }

    async fn invoke(&self, inputs: StageInputs, _: &InvocationContext) -> Result<StageOutputs> {
        let query = inputs.text("query")?;
        self.log.record(format!("sparse:{query}"));
        Ok(StageOutputs::new().with(
            "documents",
            vec![Document::new("Pods are scheduled onto nodes.").with_score(0.4)],
        ))
    }
}

#[derive(Debug)]
pub struct LengthEmbedder {
    pub log: CallLog,
}

#[async_trait]
impl Component for LengthEmbedder {
    fn role(&self) -> StageRole {
        StageRole::TextEmbedder
    }

    async fn invoke(&self, inputs: StageInputs, _: &InvocationContext) -> Result<StageOutputs> {
        let text = inputs.text("text")?;
        self.log.record(format!("embed:{text}"));
        #[allow(clippy::cast_precision_loss)]
        let embedding = vec![text.len() as f32, 1.0];
        Ok(StageOutputs::new().with("embedding", embedding))
    }
}

#[derive(Debug)]
pub struct VectorRetriever {
    pub log: CallLog,
}

#[async_trait]
impl Component for VectorRetriever {
    fn role(&self) -> StageRole {
        StageRole::DenseRetriever
    }

    async fn invoke(&self, inputs: StageInputs, _: &InvocationContext) -> Result<StageOutputs> {
        let embedding = inputs.embedding("query_embedding")?;
        self.log.record(format!("dense:{}", embedding.len()));
        Ok(StageOutputs::new().with(
            "documents",
            vec![Document::new("A pod runs one or more containers.").with_score(0.9)],
        ))
    }
}

#[derive(Debug)]
pub struct PassthroughRanker {
    pub log: CallLog,
}

#[async_trait]
impl Component for PassthroughRanker {
    fn role(&self) -> StageRole {
        StageRole::Ranker
    }

    async fn invoke(&self, mut inputs: StageInputs, _: &InvocationContext) -> Result<StageOutputs> {
        let query = inputs.text("query")?.to_string();
        self.log.record(format!("rank:{query}"));
        Ok(StageOutputs::new().with("documents", inputs.take_documents("documents")?))
    }
}

/// Replies with a fixed text, emitting it word by word when streaming.
#[derive(Debug)]
pub struct ScriptedGenerator {
    pub log: CallLog,
    pub reply: &'static str,
}

#[async_trait]
impl Component for ScriptedGenerator {
    fn role(&self) -> StageRole {
        StageRole::Generator
    }

    async fn invoke(&self, inputs: StageInputs, ctx: &InvocationContext) -> Result<StageOutputs> {
        inputs.text("prompt")?;
        self.log.record("generate");
        for word in self.reply.split_inclusive(' ') {
            ctx.emit(word).await?;
        }
        Ok(StageOutputs::new().with("replies", vec![self.reply.to_string()]))
    }
}

/// Emits one chunk, then stalls far beyond any test timeout.
#[derive(Debug)]
pub struct StalledGenerator;

#[async_trait]
impl Component for StalledGenerator {
    fn role(&self) -> StageRole {
        StageRole::Generator
    }

    async fn invoke(&self, _: StageInputs, ctx: &InvocationContext) -> Result<StageOutputs> {
        ctx.emit("thinking").await?;
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(StageOutputs::new().with("replies", vec!["late".to_string()]))
    }
}

#[derive(Debug)]
pub struct FailingGenerator;

#[async_trait]
impl Component for FailingGenerator {
    fn role(&self) -> StageRole {
        StageRole::Generator
    }

    async fn invoke(&self, _: StageInputs, _: &InvocationContext) -> Result<StageOutputs> {
        Err(PipelineError::component("model endpoint unreachable"))
    }
}

/// Reports which data columns each metric received.
#[derive(Debug)]
pub struct ColumnEvaluator;

#[async_trait]
impl Component for ColumnEvaluator {
    fn role(&self) -> StageRole {
        StageRole::Evaluator
    }

    async fn invoke(&self, inputs: StageInputs, _: &InvocationContext) -> Result<StageOutputs> {
        let metric = inputs.text("metric")?.to_string();
        let columns: Vec<&str> = inputs.names().filter(|name| *name != "metric").collect();
        Ok(StageOutputs::new().with(
            "results",
            serde_json::json!({ "metric": metric, "columns": columns }),
        ))
    }
}

pub const REPLY: &str = "pods run containers";

/// Registry with every query-time slot filled.
pub fn query_registry(log: &CallLog) -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    pragmatic_query::register_builtin_components(&mut registry);
    registry
        .register_instance(ComponentSlot::SparseRetriever, Arc::new(KeywordRetriever { log: log.clone() }))
        .register_instance(ComponentSlot::TextEmbedder, Arc::new(LengthEmbedder { log: log.clone() }))
        .register_instance(ComponentSlot::DenseRetriever, Arc::new(VectorRetriever { log: log.clone() }))
        .register_instance(ComponentSlot::Ranker, Arc::new(PassthroughRanker { log: log.clone() }))
        .register_instance(
            ComponentSlot::Generator,
            Arc::new(ScriptedGenerator {
                log: log.clone(),
                reply: REPLY,
            }),
        )
        .register_instance(ComponentSlot::Evaluator, Arc::new(ColumnEvaluator));
    registry
}

pub fn settings(retriever_type: &str, ranker_enabled: bool) -> Settings {
    Settings {
        retriever_type: retriever_type.to_string(),
        ranker_enabled,
        ..Settings::default()
    }
}
