//! Stage roles and their port schemas.
//!
//! Each collaborator declares one [`StageRole`]. The role fixes which input
//! fields a stage accepts and which output fields it produces, so that the
//! graph builder can reject misnamed ports before anything runs.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Declared input of a stage role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSpec {
    /// Field name.
    pub name: &'static str,
    /// Whether the stage cannot run without it.
    pub required: bool,
    /// Whether several connections may feed this input; their values are merged.
    pub variadic: bool,
}

const fn required(name: &'static str) -> InputSpec {
    InputSpec {
        name,
        required: true,
        variadic: false,
    }
}

const fn optional(name: &'static str) -> InputSpec {
    InputSpec {
        name,
        required: false,
        variadic: false,
    }
}

const fn variadic(name: &'static str) -> InputSpec {
    InputSpec {
        name,
        required: true,
        variadic: true,
    }
}

/// The kind of work a stage performs.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StageRole {
    /// Downloads remote content.
    Fetcher,
    /// Turns raw sources into documents.
    Converter,
    /// Normalizes document text.
    Cleaner,
    /// Splits documents into chunks.
    Splitter,
    /// Embeds documents for indexing.
    DocumentEmbedder,
    /// Embeds the query text.
    TextEmbedder,
    /// Keyword retrieval from the raw query.
    SparseRetriever,
    /// Vector retrieval from a query embedding.
    DenseRetriever,
    /// Merges the document lists of several branches.
    DocumentJoiner,
    /// Re-scores retrieved documents against the query.
    Ranker,
    /// Renders the generation prompt.
    PromptBuilder,
    /// Calls the language model.
    Generator,
    /// Persists documents.
    Writer,
    /// Packs replies, query and documents into answers.
    AnswerBuilder,
    /// Scores a batch of evaluation samples.
    Evaluator,
}

impl StageRole {
    /// Inputs accepted by stages of this role.
    pub fn inputs(self) -> &'static [InputSpec] {
        const FETCHER: &[InputSpec] = &[optional("urls")];
        const CONVERTER: &[InputSpec] = &[optional("sources")];
        const DOCUMENTS: &[InputSpec] = &[required("documents")];
        const TEXT_EMBEDDER: &[InputSpec] = &[required("text")];
        const SPARSE: &[InputSpec] = &[required("query"), optional("top_k")];
        const DENSE: &[InputSpec] = &[required("query_embedding"), optional("top_k")];
        const JOINER: &[InputSpec] = &[variadic("documents"), optional("top_k")];
        const RANKER: &[InputSpec] = &[required("query"), required("documents"), optional("top_k")];
        const PROMPT: &[InputSpec] = &[required("query"), required("documents")];
        const GENERATOR: &[InputSpec] = &[required("prompt")];
        const ANSWER: &[InputSpec] = &[required("query"), required("replies"), optional("documents")];
        const EVALUATOR: &[InputSpec] = &[
            optional("questions"),
            optional("contexts"),
            optional("responses"),
            optional("ground_truths"),
            optional("metric"),
            optional("params"),
        ];

        match self {
            Self::Fetcher => FETCHER,
            Self::Converter => CONVERTER,
            Self::Cleaner | Self::Splitter | Self::DocumentEmbedder | Self::Writer => DOCUMENTS,
            Self::TextEmbedder => TEXT_EMBEDDER,
            Self::SparseRetriever => SPARSE,
            Self::DenseRetriever => DENSE,
            Self::DocumentJoiner => JOINER,
            Self::Ranker => RANKER,
            Self::PromptBuilder => PROMPT,
            Self::Generator => GENERATOR,
            Self::AnswerBuilder => ANSWER,
            Self::Evaluator => EVALUATOR,
        }
    }

    /// Outputs produced by stages of this role; the first one is the default source.
    pub fn outputs(self) -> &'static [&'static str] {
        match self {
            Self::Fetcher
            | Self::Converter
            | Self::Cleaner
            | Self::Splitter
            | Self::DocumentEmbedder
            | Self::SparseRetriever
            | Self::DenseRetriever
            | Self::DocumentJoiner
            | Self::Ranker => &["documents"],
            Self::TextEmbedder => &["embedding"],
            Self::PromptBuilder => &["prompt"],
            Self::Generator => &["replies"],
            Self::Writer => &["documents_written"],
            Self::AnswerBuilder => &["answers"],
            Self::Evaluator => &["results"],
        }
    }

    /// Look up a declared input.
    pub fn input(self, name: &str) -> Option<&'static InputSpec> {
        self.inputs().iter().find(|spec| spec.name == name)
    }

    /// Whether the role produces the named output.
    pub fn has_output(self, name: &str) -> bool {
        self.outputs().contains(&name)
    }

    /// Output used when a connection names the whole stage as its source.
    pub fn default_output(self) -> &'static str {
        self.outputs()[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_role_declares_an_output() {
        for role in StageRole::iter() {
            assert!(!role.outputs().is_empty(), "{role} has no outputs");
        }
    }

    #[test]
    fn test_joiner_documents_is_variadic() {
        let spec = StageRole::DocumentJoiner.input("documents").unwrap();
        assert!(spec.variadic);
        assert!(!StageRole::Ranker.input("documents").unwrap().variadic);
    }

    #[test]
    fn test_role_names_round_trip() {
        assert_eq!(StageRole::DenseRetriever.to_string(), "dense_retriever");
        assert_eq!("prompt_builder".parse::<StageRole>().unwrap(), StageRole::PromptBuilder);
    }
}
