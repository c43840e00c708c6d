//! Settings consumed by the topology recipes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::{debug, warn};

use crate::{PipelineError, Result};

/// Retrieval topology selected by `retriever_type`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum RetrieverType {
    /// Keyword retrieval on the raw query.
    Sparse,
    /// Embedding retrieval; the query is embedded first.
    Dense,
    /// Sparse and dense retrieval joined into one result list.
    Hybrid,
}

/// Chunking strategy selected by `chunking_method`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingMethod {
    /// Built-in word/sentence/passage splitter.
    Simple,
    /// Externally provided token-aware splitter.
    #[strum(to_string = "external", serialize = "docling")]
    External,
}

/// Legacy setting names, mapped to the field they set.
const SETTING_ALIASES: [(&str, &str); 2] = [
    ("apply_docling", "structured_conversion"),
    ("eval_ragas_metrics", "eval_metrics"),
];

fn canonical_key(key: &str) -> &str {
    SETTING_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map_or(key, |&(_, field)| field)
}

/// One evaluation metric and the data it needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricConfig {
    /// Metric parameters passed to the evaluator stage.
    #[serde(default)]
    pub params: Option<serde_json::Value>,
    /// Data columns the metric reads (`questions`, `contexts`, `responses`, `ground_truths`).
    #[serde(default)]
    pub required_data: Vec<String>,
}

/// Settings for indexing and RAG pipelines.
///
/// Missing keys fall back to [`Settings::default`] when deserializing.
///
/// # Examples
///
/// ```rust
/// use pragmatic_core::config::{RetrieverType, Settings, SettingsOverlay};
///
/// let base = Settings::default();
/// let settings = base
///     .with_overlay(&SettingsOverlay::new().with("retriever_type", "hybrid").with("top_k", 5))
///     .unwrap();
/// assert_eq!(settings.retriever().unwrap(), RetrieverType::Hybrid);
/// assert_eq!(base.top_k, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Vector database backing the writer and retrievers.
    pub vector_db_type: String,
    /// `sparse`, `dense` or `hybrid`.
    pub retriever_type: String,
    /// Embedding model name.
    pub embedding_model: String,
    /// Ranking model name.
    pub ranking_model: String,

    /// Converter emits pre-chunked structured documents.
    #[serde(alias = "apply_docling")]
    pub structured_conversion: bool,
    /// File extensions picked up during discovery; `None` takes every file.
    pub input_document_formats: Option<Vec<String>>,
    /// Walk input directories recursively.
    pub process_input_recursively: bool,

    /// Whether documents are split before embedding.
    pub chunking_enabled: bool,
    /// `simple` or `external` (`docling` is accepted as an alias).
    pub chunking_method: String,
    /// Token budget per chunk for the external splitter.
    pub max_tokens_per_chunk: usize,
    /// Split unit for the simple splitter: `word`, `sentence` or `passage`.
    pub split_by: String,
    /// Units per chunk.
    pub split_length: usize,
    /// Units shared between neighbouring chunks.
    pub split_overlap: usize,
    /// Minimum units for a trailing chunk to stand on its own.
    pub split_threshold: usize,

    /// Generation model name.
    pub llm: String,
    /// Base URL of the generation service.
    pub llm_base_url: String,

    /// Documents returned by each retriever.
    pub top_k: usize,
    /// Insert a cleaning stage while indexing.
    pub cleaner_enabled: bool,
    /// Insert a ranking stage after retrieval.
    pub ranker_enabled: bool,
    /// Stream the generated reply chunk by chunk.
    pub enable_response_streaming: bool,
    /// Build the answer-aggregation stage for evaluation.
    pub evaluation_mode: bool,
    /// Idle timeout for streamed replies, in seconds.
    pub streaming_timeout: u64,
    /// Capacity of the chunk channel.
    pub stream_buffer_size: usize,

    /// Directory indexed before an evaluation run.
    pub eval_documents_path: PathBuf,
    /// JSON file with evaluation questions and ground truths.
    pub eval_questions_answers_path: PathBuf,
    /// Metrics computed by the evaluation runner, keyed by metric name.
    #[serde(alias = "eval_ragas_metrics")]
    pub eval_metrics: BTreeMap<String, MetricConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vector_db_type: "milvus".to_string(),
            retriever_type: RetrieverType::Dense.to_string(),
            embedding_model: "sentence-transformers/all-MiniLM-L12-v2".to_string(),
            ranking_model: "BAAI/bge-reranker-base".to_string(),
            structured_conversion: false,
            input_document_formats: Some(vec!["json".to_string()]),
            process_input_recursively: true,
            chunking_enabled: true,
            chunking_method: ChunkingMethod::External.to_string(),
            max_tokens_per_chunk: 512,
            split_by: "word".to_string(),
            split_length: 200,
            split_overlap: 20,
            split_threshold: 20,
            llm: "mistralai/Mistral-7B-Instruct-v0.2".to_string(),
            llm_base_url: "http://vllm-service:8000/v1".to_string(),
            top_k: 1,
            cleaner_enabled: false,
            ranker_enabled: false,
            enable_response_streaming: false,
            evaluation_mode: false,
            streaming_timeout: 60,
            stream_buffer_size: 64,
            eval_documents_path: PathBuf::from("./docs"),
            eval_questions_answers_path: PathBuf::from("./qa.json"),
            eval_metrics: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON document; absent keys keep their defaults.
    pub async fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading settings from {}", path.display());
        let content = tokio::fs::read_to_string(path).await?;
        let settings: Self = serde_json::from_str(&content).map_err(|e| {
            PipelineError::configuration(format!("Invalid settings file {}: {e}", path.display()))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply an overlay, producing a new value; `self` is left untouched.
    ///
    /// Unknown keys are logged and ignored. A known key whose value has the
    /// wrong type is a [`PipelineError::Configuration`].
    pub fn with_overlay(&self, overlay: &SettingsOverlay) -> Result<Self> {
        if overlay.is_empty() {
            return Ok(self.clone());
        }

        let serde_json::Value::Object(mut fields) = serde_json::to_value(self)? else {
            return Err(PipelineError::configuration("settings did not serialize to an object"));
        };

        for (key, value) in overlay.iter() {
            match fields.get_mut(canonical_key(key)) {
                Some(slot) => {
                    debug!("Overriding setting {} with {}", key, value);
                    *slot = value.clone();
                }
                None => warn!("Ignoring unknown setting '{}'", key),
            }
        }

        serde_json::from_value(serde_json::Value::Object(fields))
            .map_err(|e| PipelineError::configuration(format!("Invalid setting override: {e}")))
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(PipelineError::configuration("top_k must be greater than 0"));
        }
        if self.stream_buffer_size == 0 {
            return Err(PipelineError::configuration(
                "stream_buffer_size must be greater than 0",
            ));
        }
        if self.streaming_timeout == 0 {
            return Err(PipelineError::configuration(
                "streaming_timeout must be greater than 0",
            ));
        }
        if self.split_overlap >= self.split_length {
            return Err(PipelineError::configuration(format!(
                "split_overlap ({}) must be smaller than split_length ({})",
                self.split_overlap, self.split_length
            )));
        }
        Ok(())
    }

    /// The selected retrieval topology.
    pub fn retriever(&self) -> Result<RetrieverType> {
        self.retriever_type
            .parse()
            .map_err(|_| PipelineError::unsupported_topology("retriever type", &self.retriever_type))
    }

    /// The selected chunking strategy.
    pub fn chunking(&self) -> Result<ChunkingMethod> {
        self.chunking_method
            .parse()
            .map_err(|_| PipelineError::unsupported_topology("chunking method", &self.chunking_method))
    }

    /// Idle timeout for streamed replies.
    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(self.streaming_timeout)
    }
}

/// Explicit per-invocation setting overrides, keyed by setting name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsOverlay(BTreeMap<String, serde_json::Value>);

impl SettingsOverlay {
    /// Create an empty overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an override.
    #[must_use]
    pub fn with<K: Into<String>, V: Into<serde_json::Value>>(mut self, key: K, value: V) -> Self {
        self.insert(key, value);
        self
    }

    /// Add an override in place.
    pub fn insert<K: Into<String>, V: Into<serde_json::Value>>(&mut self, key: K, value: V) {
        self.0.insert(key.into(), value.into());
    }

    /// Iterate over the overrides.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether no overrides are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, serde_json::Value>> for SettingsOverlay {
    fn from(map: BTreeMap<String, serde_json::Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.retriever().unwrap(), RetrieverType::Dense);
        assert_eq!(settings.chunking().unwrap(), ChunkingMethod::External);
        assert_eq!(settings.top_k, 1);
        assert_eq!(settings.stream_timeout(), Duration::from_secs(60));
        settings.validate().unwrap();
    }

    #[test_case("sparse", RetrieverType::Sparse)]
    #[test_case("Dense", RetrieverType::Dense)]
    #[test_case("hybrid", RetrieverType::Hybrid)]
    fn test_retriever_type_parsing(value: &str, expected: RetrieverType) {
        let settings = Settings {
            retriever_type: value.to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.retriever().unwrap(), expected);
    }

    #[test]
    fn test_docling_is_an_external_alias() {
        let settings = Settings {
            chunking_method: "docling".to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.chunking().unwrap(), ChunkingMethod::External);
    }

    #[test]
    fn test_unsupported_retriever_type() {
        let settings = Settings {
            retriever_type: "graph".to_string(),
            ..Settings::default()
        };
        assert!(matches!(
            settings.retriever(),
            Err(PipelineError::UnsupportedTopology { ref value, .. }) if value == "graph"
        ));
    }

    #[test]
    fn test_overlay_leaves_base_untouched() {
        let base = Settings::default();
        let overlay = SettingsOverlay::new()
            .with("ranker_enabled", true)
            .with("no_such_key", "ignored");
        let settings = base.with_overlay(&overlay).unwrap();

        assert!(settings.ranker_enabled);
        assert!(!base.ranker_enabled);
        assert_eq!(
            Settings {
                ranker_enabled: false,
                ..settings
            },
            base
        );
    }

    #[test]
    fn test_overlay_accepts_legacy_names() {
        let overlay = SettingsOverlay::new().with("apply_docling", true).with(
            "eval_ragas_metrics",
            json!({ "faithfulness": { "required_data": ["questions", "responses"] } }),
        );
        let settings = Settings::default().with_overlay(&overlay).unwrap();

        assert!(settings.structured_conversion);
        assert_eq!(
            settings.eval_metrics["faithfulness"].required_data,
            vec!["questions", "responses"]
        );
    }

    #[test]
    fn test_overlay_type_mismatch() {
        let overlay = SettingsOverlay::new().with("top_k", json!("five"));
        let err = Settings::default().with_overlay(&overlay).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_split_overlap() {
        let settings = Settings {
            split_length: 10,
            split_overlap: 10,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[tokio::test]
    async fn test_from_json_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            json!({ "retriever_type": "sparse", "apply_docling": true }).to_string(),
        )
        .unwrap();

        let settings = Settings::from_json_file(&path).await.unwrap();
        assert_eq!(settings.retriever().unwrap(), RetrieverType::Sparse);
        assert!(settings.structured_conversion);
        assert_eq!(settings.split_length, 200);
    }
}
