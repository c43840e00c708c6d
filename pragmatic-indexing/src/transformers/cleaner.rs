//! Whitespace and pattern cleaning for document text.

use async_trait::async_trait;
use pragmatic_core::{
    Document, Result as CoreResult,
    traits::{Component, InvocationContext, StageRole},
    types::{StageInputs, StageOutputs},
};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::error::{IndexingError, Result};

static REPEATED_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{a0}]{2,}").expect("whitespace pattern is valid"));

/// Normalizes document text before splitting.
///
/// By default repeated spaces collapse into one and blank lines are dropped.
/// An optional pattern removes every match, e.g. page headers.
#[derive(Debug, Clone)]
pub struct DocumentCleaner {
    remove_empty_lines: bool,
    remove_extra_whitespace: bool,
    remove_pattern: Option<Regex>,
}

impl Default for DocumentCleaner {
    fn default() -> Self {
        Self {
            remove_empty_lines: true,
            remove_extra_whitespace: true,
            remove_pattern: None,
        }
    }
}

impl DocumentCleaner {
    /// Cleaner with the default rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle blank-line removal.
    #[must_use]
    pub fn with_remove_empty_lines(mut self, enabled: bool) -> Self {
        self.remove_empty_lines = enabled;
        self
    }

    /// Toggle whitespace collapsing.
    #[must_use]
    pub fn with_remove_extra_whitespace(mut self, enabled: bool) -> Self {
        self.remove_extra_whitespace = enabled;
        self
    }

    /// Remove every match of `pattern`.
    pub fn with_remove_pattern(mut self, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| IndexingError::configuration(format!("Invalid cleaner pattern: {e}")))?;
        self.remove_pattern = Some(regex);
        Ok(self)
    }

    /// Clean one text.
    pub fn clean(&self, text: &str) -> String {
        let text = match &self.remove_pattern {
            Some(pattern) => pattern.replace_all(text, "").into_owned(),
            None => text.to_string(),
        };

        let lines = text.lines().map(|line| {
            if self.remove_extra_whitespace {
                REPEATED_WHITESPACE.replace_all(line.trim(), " ").into_owned()
            } else {
                line.to_string()
            }
        });

        let kept: Vec<String> = if self.remove_empty_lines {
            lines.filter(|line| !line.trim().is_empty()).collect()
        } else {
            lines.collect()
        };
        kept.join("\n")
    }
}

#[async_trait]
impl Component for DocumentCleaner {
    fn role(&self) -> StageRole {
        StageRole::Cleaner
    }

    async fn invoke(&self, mut inputs: StageInputs, _ctx: &InvocationContext) -> CoreResult<StageOutputs> {
        let documents: Vec<Document> = inputs
            .take_documents("documents")?
            .into_iter()
            .map(|mut document| {
                document.content = self.clean(&document.content);
                document
            })
            .collect();
        debug!("Cleaned {} documents", documents.len());
        Ok(StageOutputs::new().with("documents", documents))
    }
}
