//! Converter reading plain-text sources into documents.

use async_trait::async_trait;
use pragmatic_core::{
    Document, PipelineError, Result as CoreResult, StageValue,
    traits::{Component, InvocationContext, StageRole},
    types::{StageInputs, StageOutputs},
};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{IndexingError, Result};

/// Reads each source into one [`Document`].
///
/// `sources` holds either file paths, which are read as UTF-8 text and
/// recorded under the `source` metadata key, or documents handed over by a
/// fetcher, which are passed on with surrounding whitespace trimmed.
///
/// # Examples
///
/// ```rust,no_run
/// use pragmatic_indexing::loaders::TextFileConverter;
///
/// # async fn example() -> pragmatic_indexing::error::Result<()> {
/// let converter = TextFileConverter::new();
/// let document = converter.convert_file("docs/install.md").await?;
/// println!("Loaded {} characters", document.content.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct TextFileConverter {
    skip_empty: bool,
}

impl TextFileConverter {
    /// Converter keeping empty sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop sources with no text instead of emitting empty documents.
    #[must_use]
    pub fn with_skip_empty(mut self, skip_empty: bool) -> Self {
        self.skip_empty = skip_empty;
        self
    }

    /// Read one file into a document.
    pub async fn convert_file<P: AsRef<Path>>(&self, path: P) -> Result<Document> {
        let path = path.as_ref();
        let bytes = fs::read(path).await?;
        let content = String::from_utf8(bytes)
            .map_err(|e| IndexingError::unreadable(path.display().to_string(), e.to_string()))?;

        let mut document = Document::new(content).with_metadata("source", path.display().to_string());
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            document = document.with_metadata("file_name", name);
        }
        Ok(document)
    }

    fn keep(&self, document: &Document) -> bool {
        !(self.skip_empty && document.content.trim().is_empty())
    }
}

#[async_trait]
impl Component for TextFileConverter {
    fn role(&self) -> StageRole {
        StageRole::Converter
    }

    async fn invoke(&self, mut inputs: StageInputs, _ctx: &InvocationContext) -> CoreResult<StageOutputs> {
        let documents = match inputs.remove("sources") {
            None | Some(StageValue::Null) => Vec::new(),
            Some(StageValue::TextList(paths)) => {
                let mut documents = Vec::with_capacity(paths.len());
                for path in &paths {
                    debug!("Converting {}", path);
                    documents.push(self.convert_file(path).await?);
                }
                documents
            }
            Some(StageValue::Documents(fetched)) => fetched
                .into_iter()
                .map(|mut document| {
                    document.content = document.content.trim().to_string();
                    document
                })
                .collect(),
            Some(other) => {
                return Err(PipelineError::validation(format!(
                    "converter sources must be paths or documents, got {}",
                    other.kind()
                )));
            }
        };

        let documents: Vec<Document> = documents.into_iter().filter(|d| self.keep(d)).collect();
        info!("Converted {} documents", documents.len());
        Ok(StageOutputs::new().with("documents", documents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_paths_with_source_metadata() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "Pods are the smallest deployable units.").unwrap();

        let inputs = StageInputs::new().with("sources", vec![path.display().to_string()]);
        let outputs = TextFileConverter::new()
            .invoke(inputs, &InvocationContext::new())
            .await
            .unwrap();
        let documents = outputs.documents("documents").unwrap();

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].content, "Pods are the smallest deployable units.");
        assert_eq!(
            documents[0].get_metadata_string("source"),
            Some(path.display().to_string())
        );
        assert_eq!(documents[0].get_metadata_string("file_name").as_deref(), Some("notes.txt"));
    }

    #[tokio::test]
    async fn test_fetched_documents_pass_through() {
        let inputs = StageInputs::new().with(
            "sources",
            vec![Document::new("  <p>hello</p>\n"), Document::new("   ")],
        );
        let outputs = TextFileConverter::new()
            .with_skip_empty(true)
            .invoke(inputs, &InvocationContext::new())
            .await
            .unwrap();
        let documents = outputs.documents("documents").unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].content, "<p>hello</p>");
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let inputs = StageInputs::new().with("sources", vec!["/nonexistent/file.txt".to_string()]);
        let err = TextFileConverter::new()
            .invoke(inputs, &InvocationContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
