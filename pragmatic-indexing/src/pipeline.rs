//! Indexing pipeline: sources in, embedded documents written.

use pragmatic_core::{
    PipelineError, Result as CoreResult,
    config::{ChunkingMethod, Settings},
    executor::{Executor, PipelineOutputs, RuntimeArgs},
    factory::{ComponentRegistry, ComponentSlot},
    graph::{Graph, GraphBuilder, StageArgs, StageOptions},
};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::sources::{FileDiscovery, IndexingSource};

/// Summary of one indexing run.
#[derive(Debug, Clone)]
pub struct IndexingReport {
    /// Documents the writer reported as written.
    pub documents_written: usize,
    /// Wall-clock time of the run.
    pub elapsed: Duration,
    /// Raw outputs of every stage.
    pub outputs: PipelineOutputs,
}

/// Linear chain from fetching or conversion to writing.
///
/// Stages, in order: `fetcher` (remote sources only), `converter`, `cleaner`
/// (when `cleaner_enabled`), `splitter` (when `chunking_enabled`, unless the
/// converter already emits structured chunks), `embedder` and `writer`.
///
/// # Examples
///
/// ```rust,no_run
/// use pragmatic_core::{config::Settings, factory::ComponentRegistry};
/// use pragmatic_indexing::{IndexingPipeline, IndexingSource};
///
/// # async fn example(registry: ComponentRegistry) -> pragmatic_core::Result<()> {
/// let pipeline = IndexingPipeline::new(
///     Settings::default(),
///     &registry,
///     IndexingSource::local("./docs"),
/// )
/// .await?;
/// let report = pipeline.run().await?;
/// println!("Indexed {} documents in {:?}", report.documents_written, report.elapsed);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct IndexingPipeline {
    settings: Settings,
    source: IndexingSource,
    graph: Graph,
}

impl IndexingPipeline {
    /// Build the pipeline for a source.
    ///
    /// Local sources are scanned here; a missing directory is an I/O error.
    pub async fn new(
        settings: Settings,
        registry: &ComponentRegistry,
        source: IndexingSource,
    ) -> CoreResult<Self> {
        settings.validate()?;
        let graph = build_graph(&settings, registry, &source).await?;
        Ok(Self {
            settings,
            source,
            graph,
        })
    }

    /// The built graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Settings the pipeline was built with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The indexed source.
    pub fn source(&self) -> &IndexingSource {
        &self.source
    }

    /// Run the chain once.
    #[instrument(skip(self), fields(stages = self.graph.len()))]
    pub async fn run(&self) -> CoreResult<IndexingReport> {
        let started = Instant::now();
        let outputs = Executor::new().run(&self.graph, RuntimeArgs::new()).await?;

        let written = outputs
            .field("writer", "documents_written")?
            .as_integer()
            .ok_or_else(|| PipelineError::missing_output("writer", "documents_written"))?;
        let documents_written = usize::try_from(written).map_err(|_| {
            PipelineError::validation(format!("writer reported {written} documents written"))
        })?;

        let elapsed = started.elapsed();
        info!("Indexed {} documents in {:?}", documents_written, elapsed);
        Ok(IndexingReport {
            documents_written,
            elapsed,
            outputs,
        })
    }
}

async fn build_graph(
    settings: &Settings,
    registry: &ComponentRegistry,
    source: &IndexingSource,
) -> CoreResult<Graph> {
    let chunking = if settings.chunking_enabled {
        Some(settings.chunking()?)
    } else {
        None
    };

    let mut builder = GraphBuilder::new();

    match source {
        IndexingSource::Remote(urls) => {
            debug!("Indexing {} remote pages", urls.len());
            builder
                .add_stage(
                    "fetcher",
                    registry.create(ComponentSlot::Fetcher, settings).await?,
                    StageArgs::new().with("urls", urls.clone()),
                    StageOptions::new(),
                )?
                .add("converter", registry.create(ComponentSlot::Converter, settings).await?)?;
        }
        IndexingSource::Local(dir) => {
            let files = FileDiscovery::new()
                .recursive(settings.process_input_recursively)
                .formats(settings.input_document_formats.clone())
                .discover(dir)
                .await?;
            if files.is_empty() {
                warn!("No input files found under {}", dir.display());
            }
            let sources: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
            builder.add_stage(
                "converter",
                registry.create(ComponentSlot::Converter, settings).await?,
                StageArgs::new().with("sources", sources),
                StageOptions::new(),
            )?;
        }
    }

    if settings.cleaner_enabled {
        builder.add("cleaner", registry.create(ComponentSlot::Cleaner, settings).await?)?;
    }

    let splitter_slot = match chunking {
        Some(ChunkingMethod::Simple) => Some(ComponentSlot::SimpleSplitter),
        Some(ChunkingMethod::External) if settings.structured_conversion => {
            debug!("Converter emits structured chunks, skipping the splitter");
            None
        }
        Some(ChunkingMethod::External) => Some(ComponentSlot::ExternalSplitter),
        None => None,
    };
    if let Some(slot) = splitter_slot {
        builder.add("splitter", registry.create(slot, settings).await?)?;
    }

    builder
        .add("embedder", registry.create(ComponentSlot::DocumentEmbedder, settings).await?)?
        .add("writer", registry.create(ComponentSlot::Writer, settings).await?)?;

    let graph = builder.build();
    info!("Built indexing pipeline: {}", graph.stage_names().join(" -> "));
    Ok(graph)
}
