//! Evaluation of a RAG pipeline against a question/answer dataset.
//!
//! An evaluation run indexes the evaluation documents, answers every
//! question with an evaluation-mode [`RagPipeline`], and feeds the collected
//! samples to one evaluator stage per configured metric.

use pragmatic_core::{
    PipelineError, Result,
    config::Settings,
    executor::{Executor, RuntimeArgs},
    factory::{ComponentRegistry, ComponentSlot},
    graph::{Graph, GraphBuilder, StageArgs, StageOptions},
    types::{StageOutputs, StageValue},
};
use pragmatic_indexing::{IndexingPipeline, IndexingReport, IndexingSource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

use crate::pipeline::{RagPipeline, RagResponse};
use crate::topology::Mode;

/// Questions and their reference answers.
///
/// ```rust
/// use pragmatic_query::evaluation::EvaluationDataset;
///
/// let dataset = EvaluationDataset::new(
///     vec!["What is a pod?".to_string()],
///     vec!["The smallest deployable unit.".to_string()],
/// )
/// .unwrap();
/// assert_eq!(dataset.len(), 1);
/// assert!(EvaluationDataset::new(vec!["q".to_string()], vec![]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationDataset {
    questions: Vec<String>,
    ground_truths: Vec<String>,
}

impl EvaluationDataset {
    /// Pair questions with ground truths; both lists must have the same length.
    pub fn new(questions: Vec<String>, ground_truths: Vec<String>) -> Result<Self> {
        let dataset = Self {
            questions,
            ground_truths,
        };
        dataset.validate()?;
        Ok(dataset)
    }

    /// Load `{ "questions": [...], "ground_truths": [...] }` from a JSON file.
    pub async fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading evaluation dataset from {}", path.display());
        let content = tokio::fs::read_to_string(path).await?;
        let dataset: Self = serde_json::from_str(&content)?;
        dataset.validate()?;
        Ok(dataset)
    }

    fn validate(&self) -> Result<()> {
        if self.questions.len() != self.ground_truths.len() {
            return Err(PipelineError::validation(format!(
                "evaluation dataset has {} questions but {} ground truths",
                self.questions.len(),
                self.ground_truths.len()
            )));
        }
        Ok(())
    }

    /// The questions, in order.
    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    /// The reference answers, in question order.
    pub fn ground_truths(&self) -> &[String] {
        &self.ground_truths
    }

    /// Number of question/answer pairs.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the dataset has no questions.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// One answered evaluation question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationSample {
    /// The question asked.
    pub question: String,
    /// Contents of the documents the answer was grounded on.
    pub contexts: Vec<String>,
    /// The generated answer.
    pub response: String,
    /// The reference answer.
    pub ground_truth: String,
}

/// Outcome of an evaluation run.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    /// Report of indexing the evaluation documents.
    pub indexing: IndexingReport,
    /// Every answered question.
    pub samples: Vec<EvaluationSample>,
    /// Evaluator outputs keyed by metric name.
    pub results: BTreeMap<String, StageOutputs>,
}

/// Runs a full evaluation from settings.
///
/// Reads `eval_documents_path`, `eval_questions_answers_path` and
/// `eval_metrics`; every collaborator, including the evaluator, comes from
/// the registry.
#[derive(Debug, Clone)]
pub struct Evaluator {
    settings: Settings,
    registry: ComponentRegistry,
}

impl Evaluator {
    /// Create an evaluator.
    pub fn new(settings: Settings, registry: ComponentRegistry) -> Self {
        Self { settings, registry }
    }

    /// Index, answer every question, then score the answers.
    #[instrument(skip(self))]
    pub async fn evaluate(&self) -> Result<EvaluationReport> {
        let dataset = EvaluationDataset::from_json_file(&self.settings.eval_questions_answers_path).await?;

        let indexing = IndexingPipeline::new(
            self.settings.clone(),
            &self.registry,
            IndexingSource::local(&self.settings.eval_documents_path),
        )
        .await?
        .run()
        .await?;

        let rag = RagPipeline::with_mode(self.settings.clone(), self.registry.clone(), Mode::Evaluation).await?;
        let samples = collect_samples(&rag, &dataset).await?;

        let results = self.score(&samples).await?;
        info!(
            "Evaluated {} questions on {} metrics",
            samples.len(),
            results.len()
        );
        Ok(EvaluationReport {
            indexing,
            samples,
            results,
        })
    }

    /// Run every configured metric over the samples.
    pub async fn score(&self, samples: &[EvaluationSample]) -> Result<BTreeMap<String, StageOutputs>> {
        if self.settings.eval_metrics.is_empty() {
            warn!("No evaluation metrics configured");
            return Ok(BTreeMap::new());
        }

        let graph = build_metrics_graph(&self.settings, &self.registry, samples).await?;
        let mut outputs = Executor::new().run(&graph, RuntimeArgs::new()).await?;

        self.settings
            .eval_metrics
            .keys()
            .map(|metric| {
                let stage = evaluator_stage(metric);
                outputs
                    .take_stage(&stage)
                    .map(|result| (metric.clone(), result))
                    .ok_or_else(|| PipelineError::missing_output(stage, "results"))
            })
            .collect()
    }
}

/// Answer every question of the dataset with an evaluation-mode pipeline.
pub async fn collect_samples(
    pipeline: &RagPipeline,
    dataset: &EvaluationDataset,
) -> Result<Vec<EvaluationSample>> {
    let mut samples = Vec::with_capacity(dataset.len());
    for (question, ground_truth) in dataset.questions().iter().zip(dataset.ground_truths()) {
        let answer = match pipeline.query(question).await? {
            RagResponse::Answer(answer) => answer,
            RagResponse::Reply(_) => {
                return Err(PipelineError::incompatible_mode(
                    "evaluation requires a pipeline in evaluation mode",
                ));
            }
        };
        debug!("Answered evaluation question: {}", question);
        samples.push(EvaluationSample {
            question: question.clone(),
            contexts: answer.contexts(),
            response: answer.data,
            ground_truth: ground_truth.clone(),
        });
    }
    Ok(samples)
}

/// Graph with one unconnected evaluator stage per metric.
///
/// Each stage receives the metric name, its `params`, and the data columns
/// listed in `required_data`.
pub async fn build_metrics_graph(
    settings: &Settings,
    registry: &ComponentRegistry,
    samples: &[EvaluationSample],
) -> Result<Graph> {
    let mut builder = GraphBuilder::new();

    for (metric, config) in &settings.eval_metrics {
        let mut args = StageArgs::new().with("metric", metric.as_str());
        if let Some(params) = &config.params {
            args = args.with("params", params.clone());
        }
        for column in &config.required_data {
            args = args.with(column.as_str(), data_column(metric, column, samples)?);
        }

        builder.add_stage(
            evaluator_stage(metric),
            registry.create(ComponentSlot::Evaluator, settings).await?,
            args,
            StageOptions::unconnected(),
        )?;
    }
    Ok(builder.build())
}

fn evaluator_stage(metric: &str) -> String {
    format!("evaluator_{metric}")
}

fn data_column(metric: &str, column: &str, samples: &[EvaluationSample]) -> Result<StageValue> {
    let value: StageValue = match column {
        "questions" => samples.iter().map(|s| s.question.clone()).collect::<Vec<_>>().into(),
        "responses" => samples.iter().map(|s| s.response.clone()).collect::<Vec<_>>().into(),
        "ground_truths" => samples.iter().map(|s| s.ground_truth.clone()).collect::<Vec<_>>().into(),
        "contexts" => {
            let contexts: Vec<&[String]> = samples.iter().map(|s| s.contexts.as_slice()).collect();
            StageValue::Json(serde_json::to_value(contexts)?)
        }
        other => {
            return Err(PipelineError::configuration(format!(
                "Metric {metric} requires unknown data column '{other}'"
            )));
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample(question: &str) -> EvaluationSample {
        EvaluationSample {
            question: question.to_string(),
            contexts: vec!["ctx a".to_string(), "ctx b".to_string()],
            response: format!("answer to {question}"),
            ground_truth: "truth".to_string(),
        }
    }

    #[test]
    fn test_data_columns() {
        let samples = vec![sample("q1"), sample("q2")];
        assert_eq!(
            data_column("faithfulness", "questions", &samples).unwrap(),
            StageValue::TextList(vec!["q1".to_string(), "q2".to_string()])
        );
        assert_eq!(
            data_column("faithfulness", "contexts", &samples).unwrap(),
            StageValue::Json(serde_json::json!([["ctx a", "ctx b"], ["ctx a", "ctx b"]]))
        );
        assert!(matches!(
            data_column("faithfulness", "ground truths", &samples),
            Err(PipelineError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_dataset_from_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("qa.json");
        std::fs::write(
            &path,
            r#"{"questions": ["q1", "q2"], "ground_truths": ["a1", "a2"]}"#,
        )
        .unwrap();
        let dataset = EvaluationDataset::from_json_file(&path).await.unwrap();
        assert_eq!(dataset.questions(), ["q1", "q2"]);
        assert_eq!(dataset.ground_truths(), ["a1", "a2"]);

        std::fs::write(&path, r#"{"questions": ["q1"], "ground_truths": []}"#).unwrap();
        assert!(matches!(
            EvaluationDataset::from_json_file(&path).await,
            Err(PipelineError::Validation { .. })
        ));
    }
}
