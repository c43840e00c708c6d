//! Answers assembled from generator replies.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::Document;

/// A generated answer together with the query and the documents it was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// The generated answer text.
    pub data: String,

    /// The query that was answered.
    pub query: String,

    /// Documents the answer was generated from.
    pub documents: Vec<Document>,

    /// Additional answer metadata.
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Answer {
    /// Create a new answer without supporting documents.
    pub fn new<D: Into<String>, Q: Into<String>>(data: D, query: Q) -> Self {
        Self {
            data: data.into(),
            query: query.into(),
            documents: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Attach the supporting documents.
    #[must_use]
    pub fn with_documents(mut self, documents: Vec<Document>) -> Self {
        self.documents = documents;
        self
    }

    /// Contents of the supporting documents, in retrieval order.
    pub fn contexts(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.content.clone()).collect()
    }
}
