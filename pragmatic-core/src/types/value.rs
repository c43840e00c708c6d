//! Values carried on stage ports.
//!
//! Every static argument, runtime override and stage output is a
//! [`StageValue`]. A stage receives its resolved inputs and returns its
//! outputs as [`Fields`], a name → value map with typed accessors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Answer, Document};
use crate::{PipelineError, Result};

/// A value flowing through a stage port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StageValue {
    /// Absent value.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Integer, used for counts and `top_k` style parameters.
    Integer(i64),
    /// Single text value (query, prompt, path).
    Text(String),
    /// List of texts (replies, URLs, source paths).
    TextList(Vec<String>),
    /// Dense embedding vector.
    Embedding(Vec<f32>),
    /// Documents.
    Documents(Vec<Document>),
    /// Answers.
    Answers(Vec<Answer>),
    /// Arbitrary structured data.
    Json(serde_json::Value),
}

impl StageValue {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Text(_) => "text",
            Self::TextList(_) => "text list",
            Self::Embedding(_) => "embedding",
            Self::Documents(_) => "documents",
            Self::Answers(_) => "answers",
            Self::Json(_) => "json",
        }
    }

    /// Borrow as text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Borrow as a list of texts.
    pub fn as_text_list(&self) -> Option<&[String]> {
        match self {
            Self::TextList(texts) => Some(texts),
            _ => None,
        }
    }

    /// Borrow as an embedding.
    pub fn as_embedding(&self) -> Option<&[f32]> {
        match self {
            Self::Embedding(embedding) => Some(embedding),
            _ => None,
        }
    }

    /// Borrow as documents.
    pub fn as_documents(&self) -> Option<&[Document]> {
        match self {
            Self::Documents(documents) => Some(documents),
            _ => None,
        }
    }

    /// Borrow as answers.
    pub fn as_answers(&self) -> Option<&[Answer]> {
        match self {
            Self::Answers(answers) => Some(answers),
            _ => None,
        }
    }

    /// Read as an integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Read as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Merge the values collected on a variadic input.
    ///
    /// Document lists and text lists are concatenated in arrival order; a
    /// single value is passed through unchanged.
    pub fn merge(values: Vec<StageValue>) -> Result<StageValue> {
        let mut iter = values.into_iter();
        let Some(first) = iter.next() else {
            return Ok(StageValue::Null);
        };

        iter.try_fold(first, |acc, next| match (acc, next) {
            (StageValue::Documents(mut left), StageValue::Documents(right)) => {
                left.extend(right);
                Ok(StageValue::Documents(left))
            }
            (StageValue::TextList(mut left), StageValue::TextList(right)) => {
                left.extend(right);
                Ok(StageValue::TextList(left))
            }
            (left, right) => Err(PipelineError::validation(format!(
                "cannot merge {} with {} on a variadic input",
                left.kind(),
                right.kind()
            ))),
        })
    }
}

impl From<&str> for StageValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for StageValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for StageValue {
    fn from(value: Vec<String>) -> Self {
        Self::TextList(value)
    }
}

impl From<Vec<f32>> for StageValue {
    fn from(value: Vec<f32>) -> Self {
        Self::Embedding(value)
    }
}

impl From<Vec<Document>> for StageValue {
    fn from(value: Vec<Document>) -> Self {
        Self::Documents(value)
    }
}

impl From<Vec<Answer>> for StageValue {
    fn from(value: Vec<Answer>) -> Self {
        Self::Answers(value)
    }
}

impl From<bool> for StageValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for StageValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<usize> for StageValue {
    fn from(value: usize) -> Self {
        Self::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<serde_json::Value> for StageValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

/// Named values passed into or returned from a stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fields(BTreeMap<String, StageValue>);

/// Resolved inputs handed to a stage invocation.
pub type StageInputs = Fields;

/// Named outputs produced by a stage invocation.
pub type StageOutputs = Fields;

impl Fields {
    /// Create an empty field map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, builder style.
    #[must_use]
    pub fn with<K: Into<String>, V: Into<StageValue>>(mut self, name: K, value: V) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a field.
    pub fn insert<K: Into<String>, V: Into<StageValue>>(&mut self, name: K, value: V) {
        self.0.insert(name.into(), value.into());
    }

    /// Get a field by name.
    pub fn get(&self, name: &str) -> Option<&StageValue> {
        self.0.get(name)
    }

    /// Remove a field and return it.
    pub fn remove(&mut self, name: &str) -> Option<StageValue> {
        self.0.remove(name)
    }

    /// Whether the field is present.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterate over the field names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterate over name/value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StageValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay `other` onto this map; fields of `other` win.
    pub fn extend(&mut self, other: Fields) {
        self.0.extend(other.0);
    }

    /// Required text field.
    pub fn text(&self, name: &str) -> Result<&str> {
        self.typed(name, StageValue::as_text, "text")
    }

    /// Required list-of-texts field.
    pub fn text_list(&self, name: &str) -> Result<&[String]> {
        self.typed(name, StageValue::as_text_list, "text list")
    }

    /// Required embedding field.
    pub fn embedding(&self, name: &str) -> Result<&[f32]> {
        self.typed(name, StageValue::as_embedding, "embedding")
    }

    /// Required documents field.
    pub fn documents(&self, name: &str) -> Result<&[Document]> {
        self.typed(name, StageValue::as_documents, "documents")
    }

    /// Optional documents field; absent or null reads as empty.
    pub fn documents_or_empty(&self, name: &str) -> Result<&[Document]> {
        match self.get(name) {
            None | Some(StageValue::Null) => Ok(&[]),
            Some(_) => self.documents(name),
        }
    }

    /// Optional integer field.
    pub fn integer(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(StageValue::as_integer)
    }

    /// Take ownership of a documents field.
    pub fn take_documents(&mut self, name: &str) -> Result<Vec<Document>> {
        match self.remove(name) {
            Some(StageValue::Documents(documents)) => Ok(documents),
            Some(other) => Err(PipelineError::validation(format!(
                "field '{name}' holds {} where documents were expected",
                other.kind()
            ))),
            None => Err(PipelineError::validation(format!("missing field '{name}'"))),
        }
    }

    fn typed<'a, T: ?Sized>(
        &'a self,
        name: &str,
        read: impl FnOnce(&'a StageValue) -> Option<&'a T>,
        expected: &str,
    ) -> Result<&'a T> {
        let value = self
            .get(name)
            .ok_or_else(|| PipelineError::validation(format!("missing field '{name}'")))?;
        read(value).ok_or_else(|| {
            PipelineError::validation(format!(
                "field '{name}' holds {} where {expected} was expected",
                value.kind()
            ))
        })
    }
}

impl FromIterator<(String, StageValue)> for Fields {
    fn from_iter<I: IntoIterator<Item = (String, StageValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Fields {
    type Item = (String, StageValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, StageValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_documents_in_arrival_order() {
        let a = Document::new("a");
        let b = Document::new("b");
        let merged = StageValue::merge(vec![
            StageValue::Documents(vec![a.clone()]),
            StageValue::Documents(vec![b.clone()]),
        ])
        .unwrap();
        assert_eq!(merged, StageValue::Documents(vec![a, b]));
    }

    #[test]
    fn test_merge_rejects_mixed_kinds() {
        let result = StageValue::merge(vec![
            StageValue::Documents(vec![]),
            StageValue::Text("x".into()),
        ]);
        assert!(matches!(result, Err(PipelineError::Validation { .. })));
    }

    #[test]
    fn test_typed_accessors() {
        let fields = Fields::new()
            .with("query", "what is rust?")
            .with("embedding", vec![0.1_f32, 0.2]);

        assert_eq!(fields.text("query").unwrap(), "what is rust?");
        assert_eq!(fields.embedding("embedding").unwrap(), &[0.1, 0.2]);
        assert!(fields.text("embedding").is_err());
        assert!(fields.documents("documents").is_err());
        assert!(fields.documents_or_empty("documents").unwrap().is_empty());
    }
}
