//! Unit-based document splitting.

use async_trait::async_trait;
use pragmatic_core::{
    Document, Result as CoreResult,
    config::Settings,
    traits::{Component, InvocationContext, StageRole},
    types::{StageInputs, StageOutputs},
};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::debug;

use crate::error::{IndexingError, Result};

/// Unit a [`SimpleSplitter`] counts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SplitBy {
    /// Space-separated words.
    Word,
    /// Full-stop terminated sentences.
    Sentence,
    /// Blank-line separated passages.
    Passage,
    /// Single lines.
    Line,
}

impl SplitBy {
    fn delimiter(self) -> &'static str {
        match self {
            Self::Word => " ",
            Self::Sentence => ".",
            Self::Passage => "\n\n",
            Self::Line => "\n",
        }
    }

    /// Split text into units, each keeping its trailing delimiter.
    fn units(self, text: &str) -> Vec<&str> {
        text.split_inclusive(self.delimiter()).collect()
    }
}

/// Splits documents into overlapping windows of units.
///
/// Each window holds `split_length` units and shares `split_overlap` units
/// with its predecessor. A trailing window shorter than `split_threshold`
/// units is appended to the previous chunk instead of standing alone.
///
/// ```rust
/// use pragmatic_indexing::transformers::{SimpleSplitter, SplitBy};
///
/// let splitter = SimpleSplitter::new(SplitBy::Word, 3, 1, 0).unwrap();
/// assert_eq!(
///     splitter.split_text("one two three four five"),
///     vec!["one two three ", "three four five"]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct SimpleSplitter {
    split_by: SplitBy,
    split_length: usize,
    split_overlap: usize,
    split_threshold: usize,
}

impl SimpleSplitter {
    /// Create a splitter; the overlap must be smaller than the length.
    pub fn new(
        split_by: SplitBy,
        split_length: usize,
        split_overlap: usize,
        split_threshold: usize,
    ) -> Result<Self> {
        if split_length == 0 {
            return Err(IndexingError::configuration("split_length must be greater than 0"));
        }
        if split_overlap >= split_length {
            return Err(IndexingError::configuration(format!(
                "split_overlap ({split_overlap}) must be smaller than split_length ({split_length})"
            )));
        }
        Ok(Self {
            split_by,
            split_length,
            split_overlap,
            split_threshold,
        })
    }

    /// Create a splitter from `split_by`, `split_length`, `split_overlap` and `split_threshold`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let split_by = settings.split_by.parse().map_err(|_| {
            IndexingError::configuration(format!("Unsupported split unit: {}", settings.split_by))
        })?;
        Self::new(
            split_by,
            settings.split_length,
            settings.split_overlap,
            settings.split_threshold,
        )
    }

    /// Split one text into chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let units = self.split_by.units(text);
        let step = self.split_length - self.split_overlap;
        let mut chunks: Vec<String> = Vec::new();
        let mut covered = 0;
        let mut start = 0;

        while start < units.len() {
            let end = (start + self.split_length).min(units.len());
            let window = &units[start..end];

            if window.len() < self.split_threshold && !chunks.is_empty() {
                if let Some(last) = chunks.last_mut() {
                    last.push_str(&units[covered.max(start)..end].concat());
                }
            } else {
                let chunk = window.concat();
                if !chunk.is_empty() {
                    chunks.push(chunk);
                }
            }

            covered = end;
            if end == units.len() {
                break;
            }
            start += step;
        }
        chunks
    }

    /// Split a document, recording its id and each chunk's position.
    pub fn split_document(&self, document: &Document) -> Vec<Document> {
        self.split_text(&document.content)
            .into_iter()
            .enumerate()
            .map(|(split_id, content)| {
                let mut chunk = Document::new(content);
                chunk.metadata.clone_from(&document.metadata);
                chunk
                    .with_metadata("parent_id", document.id.to_string())
                    .with_metadata("split_id", split_id)
            })
            .collect()
    }
}

#[async_trait]
impl Component for SimpleSplitter {
    fn role(&self) -> StageRole {
        StageRole::Splitter
    }

    async fn invoke(&self, inputs: StageInputs, _ctx: &InvocationContext) -> CoreResult<StageOutputs> {
        let documents = inputs.documents("documents")?;
        let chunks: Vec<Document> = documents
            .iter()
            .flat_map(|document| self.split_document(document))
            .collect();
        debug!(
            "Split {} documents into {} chunks by {}",
            documents.len(),
            chunks.len(),
            self.split_by
        );
        Ok(StageOutputs::new().with("documents", chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(SplitBy::Word, "a b c d", 2, 0, vec!["a b ", "c d"] ; "words without overlap")]
    #[test_case(SplitBy::Sentence, "One. Two. Three.", 2, 1, vec!["One. Two.", " Two. Three."] ; "sentences with overlap")]
    #[test_case(SplitBy::Passage, "p1\n\np2\n\np3", 1, 0, vec!["p1\n\n", "p2\n\n", "p3"] ; "passages")]
    #[test_case(SplitBy::Line, "", 5, 0, vec![] ; "empty text")]
    fn test_split_text(split_by: SplitBy, text: &str, length: usize, overlap: usize, expected: Vec<&str>) {
        let splitter = SimpleSplitter::new(split_by, length, overlap, 0).unwrap();
        assert_eq!(splitter.split_text(text), expected);
    }

    #[test]
    fn test_short_tail_joins_previous_chunk() {
        let splitter = SimpleSplitter::new(SplitBy::Word, 3, 0, 2).unwrap();
        assert_eq!(
            splitter.split_text("a b c d e f g"),
            vec!["a b c ", "d e f g"]
        );
    }

    #[test]
    fn test_invalid_overlap() {
        assert!(SimpleSplitter::new(SplitBy::Word, 5, 5, 0).is_err());
        assert!(SimpleSplitter::new(SplitBy::Word, 0, 0, 0).is_err());
    }

    #[test]
    fn test_chunks_reference_their_parent() {
        let splitter = SimpleSplitter::new(SplitBy::Word, 2, 0, 0).unwrap();
        let document = Document::new("alpha beta gamma").with_metadata("source", "notes.txt");
        let chunks = splitter.split_document(&document);

        assert_eq!(chunks.len(), 2);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.get_metadata_string("source").as_deref(), Some("notes.txt"));
            assert_eq!(chunk.get_metadata_string("parent_id"), Some(document.id.to_string()));
            assert_eq!(chunk.get_metadata("split_id"), Some(&serde_json::json!(i)));
        }
    }

    #[test]
    fn test_from_settings_rejects_unknown_unit() {
        let settings = Settings {
            split_by: "paragraph".to_string(),
            ..Settings::default()
        };
        assert!(matches!(
            SimpleSplitter::from_settings(&settings),
            Err(IndexingError::Configuration { .. })
        ));
    }
}
