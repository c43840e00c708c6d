//! Integration tests for indexing pipeline assembly and execution.

use async_trait::async_trait;
use pragmatic_core::prelude::*;
use pragmatic_indexing::prelude::*;
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use test_case::test_case;

#[derive(Debug)]
struct StaticFetcher;

#[async_trait]
impl Component for StaticFetcher {
    fn role(&self) -> StageRole {
        StageRole::Fetcher
    }

    async fn invoke(&self, inputs: StageInputs, _: &InvocationContext) -> Result<StageOutputs> {
        let documents: Vec<Document> = inputs
            .text_list("urls")?
            .iter()
            .map(|url| Document::new(format!("  page at {url}  ")).with_metadata("source", url.as_str()))
            .collect();
        Ok(StageOutputs::new().with("documents", documents))
    }
}

#[derive(Debug)]
struct PassthroughSplitter;

#[async_trait]
impl Component for PassthroughSplitter {
    fn role(&self) -> StageRole {
        StageRole::Splitter
    }

    async fn invoke(&self, mut inputs: StageInputs, _: &InvocationContext) -> Result<StageOutputs> {
        Ok(StageOutputs::new().with("documents", inputs.take_documents("documents")?))
    }
}

#[derive(Debug)]
struct LengthEmbedder;

#[async_trait]
impl Component for LengthEmbedder {
    fn role(&self) -> StageRole {
        StageRole::DocumentEmbedder
    }

    async fn invoke(&self, mut inputs: StageInputs, _: &InvocationContext) -> Result<StageOutputs> {
        #[allow(clippy::cast_precision_loss)]
        let documents: Vec<Document> = inputs
            .take_documents("documents")?
            .into_iter()
            .map(|d| {
                let length = d.content.len() as f32;
                d.with_embedding(vec![length, 1.0])
            })
            .collect();
        Ok(StageOutputs::new().with("documents", documents))
    }
}

#[derive(Debug, Default)]
struct MemoryWriter {
    written: Mutex<Vec<Document>>,
}

#[async_trait]
impl Component for MemoryWriter {
    fn role(&self) -> StageRole {
        StageRole::Writer
    }

    async fn invoke(&self, mut inputs: StageInputs, _: &InvocationContext) -> Result<StageOutputs> {
        let documents = inputs.take_documents("documents")?;
        let count = documents.len();
        self.written.lock().unwrap().extend(documents);
        Ok(StageOutputs::new().with("documents_written", count))
    }
}

fn registry(writer: Arc<MemoryWriter>) -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    register_builtin_components(&mut registry);
    registry
        .register_instance(ComponentSlot::Fetcher, Arc::new(StaticFetcher))
        .register_instance(ComponentSlot::ExternalSplitter, Arc::new(PassthroughSplitter))
        .register_instance(ComponentSlot::DocumentEmbedder, Arc::new(LengthEmbedder))
        .register_instance(ComponentSlot::Writer, writer);
    registry
}

fn corpus() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.txt"), "alpha   beta gamma delta epsilon").unwrap();
    std::fs::write(dir.path().join("b.txt"), "one two").unwrap();
    std::fs::write(dir.path().join("skipped.json"), "{}").unwrap();
    dir
}

fn assert_chained(graph: &Graph) {
    let names = graph.stage_names();
    for pair in names.windows(2) {
        assert!(
            graph.incoming(pair[1]).any(|c| c.source().stage() == pair[0]),
            "{} is not fed by {}",
            pair[1],
            pair[0]
        );
    }
    assert!(!graph.has_incoming(names[0]));
}

#[test_case(false, "simple", false, &["converter", "splitter", "embedder", "writer"] ; "simple chunking")]
#[test_case(true, "simple", false, &["converter", "cleaner", "splitter", "embedder", "writer"] ; "cleaner before splitter")]
#[test_case(false, "external", false, &["converter", "splitter", "embedder", "writer"] ; "external chunking")]
#[test_case(false, "docling", true, &["converter", "embedder", "writer"] ; "structured conversion skips splitter")]
#[tokio::test]
async fn test_local_chain_shapes(cleaner: bool, method: &str, structured: bool, expected: &[&str]) {
    let dir = corpus();
    let settings = Settings {
        cleaner_enabled: cleaner,
        chunking_method: method.to_string(),
        structured_conversion: structured,
        ..Settings::default()
    };

    let pipeline = IndexingPipeline::new(
        settings,
        &registry(Arc::new(MemoryWriter::default())),
        IndexingSource::local(dir.path()),
    )
    .await
    .unwrap();

    assert_eq!(pipeline.graph().stage_names(), expected);
    assert_chained(pipeline.graph());
}

#[tokio::test]
async fn test_local_run_writes_embedded_chunks() {
    let dir = corpus();
    let settings = Settings {
        cleaner_enabled: true,
        chunking_method: "simple".to_string(),
        input_document_formats: Some(vec!["txt".to_string()]),
        split_length: 3,
        split_overlap: 0,
        split_threshold: 0,
        ..Settings::default()
    };
    let writer = Arc::new(MemoryWriter::default());

    let pipeline = IndexingPipeline::new(settings, &registry(Arc::clone(&writer)), IndexingSource::local(dir.path()))
        .await
        .unwrap();
    let report = pipeline.run().await.unwrap();

    let written = writer.written.lock().unwrap();
    let contents: Vec<&str> = written.iter().map(|d| d.content.as_str()).collect();
    assert_eq!(contents, vec!["alpha beta gamma ", "delta epsilon", "one two"]);
    assert_eq!(report.documents_written, 3);
    assert!(written.iter().all(|d| d.embedding.is_some()));
    assert!(written[0]
        .get_metadata_string("source")
        .is_some_and(|source| source.ends_with("a.txt")));
    assert!(report.outputs.contains("splitter", "documents"));
}

#[tokio::test]
async fn test_remote_chain_fetches_before_converting() {
    let writer = Arc::new(MemoryWriter::default());
    let settings = Settings {
        chunking_enabled: false,
        ..Settings::default()
    };

    let pipeline = IndexingPipeline::new(
        settings,
        &registry(Arc::clone(&writer)),
        IndexingSource::remote(["https://example.com/a", "https://example.com/b"]),
    )
    .await
    .unwrap();

    assert_eq!(
        pipeline.graph().stage_names(),
        vec!["fetcher", "converter", "embedder", "writer"]
    );
    assert_chained(pipeline.graph());

    let report = pipeline.run().await.unwrap();
    assert_eq!(report.documents_written, 2);
    assert_eq!(
        writer.written.lock().unwrap()[0].content,
        "page at https://example.com/a"
    );
}

#[tokio::test]
async fn test_unsupported_chunking_method_is_rejected() {
    let settings = Settings {
        chunking_method: "semantic".to_string(),
        ..Settings::default()
    };
    let err = IndexingPipeline::new(
        settings,
        &registry(Arc::new(MemoryWriter::default())),
        IndexingSource::remote(["https://example.com"]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, PipelineError::UnsupportedTopology { .. }));
}

#[tokio::test]
async fn test_missing_directory_fails_at_build_time() {
    let dir = TempDir::new().unwrap();
    let err = IndexingPipeline::new(
        Settings::default(),
        &registry(Arc::new(MemoryWriter::default())),
        IndexingSource::local(dir.path().join("absent")),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, PipelineError::Io(_)));
}

#[tokio::test]
async fn test_empty_slot_is_a_configuration_error() {
    let mut registry = ComponentRegistry::new();
    register_builtin_components(&mut registry);
    let dir = corpus();
    let err = IndexingPipeline::new(Settings::default(), &registry, IndexingSource::local(dir.path()))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Configuration { .. }));
}
