//! Document type flowing between stages.
//!
//! Documents are produced by converters, reshaped by cleaners and splitters,
//! enriched by embedders and returned by retrievers and rankers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A unit of content travelling through a pipeline.
///
/// # Examples
///
/// ```rust
/// use pragmatic_core::types::Document;
///
/// let doc = Document::new("Pods are the smallest deployable units.")
///     .with_metadata("source", "pods.md")
///     .with_score(0.8);
/// assert_eq!(doc.get_metadata_string("source"), Some("pods.md".to_string()));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: Uuid,

    /// Text content of the document.
    pub content: String,

    /// Document metadata.
    ///
    /// Common metadata keys include:
    /// - `source`: Original file path or URL
    /// - `split_id`: Position of a chunk within its parent document
    /// - `parent_id`: Identifier of the document a chunk was split from
    pub metadata: HashMap<String, serde_json::Value>,

    /// Optional embedding computed during indexing or retrieval.
    pub embedding: Option<Vec<f32>>,

    /// Relevance score assigned by a retriever or ranker.
    pub score: Option<f32>,
}

impl Document {
    /// Create a new document with the given content.
    ///
    /// ```rust
    /// use pragmatic_core::types::Document;
    ///
    /// let doc = Document::new("Hello, world!");
    /// assert_eq!(doc.content, "Hello, world!");
    /// assert!(doc.metadata.is_empty());
    /// assert!(doc.score.is_none());
    /// ```
    pub fn new<S: Into<String>>(content: S) -> Self {
        Self::with_id(Uuid::new_v4(), content)
    }

    /// Create a new document with a specific ID.
    pub fn with_id<S: Into<String>>(id: Uuid, content: S) -> Self {
        Self {
            id,
            content: content.into(),
            metadata: HashMap::new(),
            embedding: None,
            score: None,
        }
    }

    /// Add or update metadata for this document.
    pub fn with_metadata<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set the embedding for this document.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Set the relevance score for this document.
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    /// Get metadata value by key.
    pub fn get_metadata(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    /// Get metadata value as a string.
    pub fn get_metadata_string(&self, key: &str) -> Option<String> {
        self.metadata.get(key)?.as_str().map(String::from)
    }
}
