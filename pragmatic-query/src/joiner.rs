//! Fan-in stage merging the document lists of several retrieval branches.

use async_trait::async_trait;
use pragmatic_core::{
    Document, Result,
    traits::{Component, InvocationContext, StageRole},
    types::{StageInputs, StageOutputs},
};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// Concatenates incoming documents and removes duplicates.
///
/// A document reached by several branches is kept once, with the best score
/// any branch gave it. The result is ordered by descending score, unscored
/// documents last, and truncated to `top_k` when one is configured or passed
/// as an input.
///
/// ```rust
/// use pragmatic_core::Document;
/// use pragmatic_query::joiner::DocumentJoiner;
///
/// let shared = Document::new("shared").with_score(0.4);
/// let joined = DocumentJoiner::new().join(vec![
///     shared.clone(),
///     Document::new("sparse only").with_score(0.9),
///     shared.with_score(0.7),
/// ], None);
/// let contents: Vec<_> = joined.iter().map(|d| d.content.as_str()).collect();
/// assert_eq!(contents, vec!["sparse only", "shared"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DocumentJoiner {
    top_k: Option<usize>,
}

impl DocumentJoiner {
    /// Joiner keeping every unique document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `top_k` documents.
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Merge one concatenated document list.
    pub fn join(&self, documents: Vec<Document>, top_k: Option<usize>) -> Vec<Document> {
        let mut positions: HashMap<Uuid, usize> = HashMap::new();
        let mut joined: Vec<Document> = Vec::with_capacity(documents.len());

        for document in documents {
            match positions.get(&document.id) {
                Some(&i) => {
                    if score_order(document.score, joined[i].score) == Ordering::Greater {
                        joined[i] = document;
                    }
                }
                None => {
                    positions.insert(document.id, joined.len());
                    joined.push(document);
                }
            }
        }

        joined.sort_by(|a, b| score_order(b.score, a.score));
        if let Some(k) = top_k.or(self.top_k) {
            joined.truncate(k);
        }
        joined
    }
}

/// Compare optional scores; a missing score ranks below any score.
fn score_order(a: Option<f32>, b: Option<f32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

#[async_trait]
impl Component for DocumentJoiner {
    fn role(&self) -> StageRole {
        StageRole::DocumentJoiner
    }

    async fn invoke(&self, mut inputs: StageInputs, _ctx: &InvocationContext) -> Result<StageOutputs> {
        let top_k = inputs.integer("top_k").and_then(|k| usize::try_from(k).ok());
        let documents = inputs.take_documents("documents")?;
        let incoming = documents.len();
        let joined = self.join(documents, top_k);
        debug!("Joined {} documents into {}", incoming, joined.len());
        Ok(StageOutputs::new().with("documents", joined))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn contents(documents: &[Document]) -> Vec<&str> {
        documents.iter().map(|d| d.content.as_str()).collect()
    }

    #[test]
    fn test_duplicates_keep_best_score() {
        let shared = Document::new("shared");
        let joined = DocumentJoiner::new().join(
            vec![
                shared.clone().with_score(0.2),
                Document::new("other").with_score(0.5),
                shared.clone().with_score(0.8),
            ],
            None,
        );
        assert_eq!(contents(&joined), vec!["shared", "other"]);
        assert_eq!(joined[0].score, Some(0.8));
        assert_eq!(joined[0].id, shared.id);
    }

    #[test]
    fn test_unscored_documents_rank_last() {
        let joined = DocumentJoiner::new().join(
            vec![Document::new("keyword hit"), Document::new("vector hit").with_score(0.1)],
            None,
        );
        assert_eq!(contents(&joined), vec!["vector hit", "keyword hit"]);
    }

    #[tokio::test]
    async fn test_top_k_input_overrides_configured_limit() {
        let inputs = StageInputs::new()
            .with(
                "documents",
                vec![
                    Document::new("a").with_score(0.3),
                    Document::new("b").with_score(0.2),
                    Document::new("c").with_score(0.1),
                ],
            )
            .with("top_k", 2_usize);
        let outputs = DocumentJoiner::new()
            .with_top_k(1)
            .invoke(inputs, &InvocationContext::new())
            .await
            .unwrap();
        assert_eq!(contents(outputs.documents("documents").unwrap()), vec!["a", "b"]);
    }
}
