//! Prompt rendering for the generation stage.

use async_trait::async_trait;
use pragmatic_core::{
    Document, Result,
    traits::{Component, InvocationContext, StageRole},
    types::{StageInputs, StageOutputs},
};
use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::debug;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(query|documents)\}").expect("placeholder pattern is valid"));

/// Default question-answering prompt.
pub const BASE_RAG_PROMPT: &str = "You are an assistant for question-answering tasks.

Here is the context to use to answer the question:

{documents}

Think carefully about the above context.

Now, review the user question:

{query}

Provide an answer to this question using only the above context.

Answer:
";

/// Renders a template with the query and the retrieved documents.
///
/// `{query}` is replaced by the query and `{documents}` by the document
/// contents separated by blank lines. Substituted text is never expanded
/// again, so a document quoting `{query}` stays as written.
///
/// ```rust
/// use pragmatic_core::Document;
/// use pragmatic_query::prompt::PromptBuilder;
///
/// let builder = PromptBuilder::with_template("Context: {documents}\nQ: {query}");
/// let prompt = builder.render("What is a pod?", &[Document::new("A pod runs containers.")]);
/// assert_eq!(prompt, "Context: A pod runs containers.\nQ: What is a pod?");
/// ```
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    template: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::with_template(BASE_RAG_PROMPT)
    }
}

impl PromptBuilder {
    /// Builder using [`BASE_RAG_PROMPT`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder using a custom template.
    pub fn with_template<S: Into<String>>(template: S) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// The template in use.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Render the prompt.
    pub fn render(&self, query: &str, documents: &[Document]) -> String {
        let context = documents
            .iter()
            .map(|d| d.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        PLACEHOLDER
            .replace_all(&self.template, |caps: &Captures<'_>| match &caps[1] {
                "query" => query.to_string(),
                _ => context.clone(),
            })
            .into_owned()
    }
}

#[async_trait]
impl Component for PromptBuilder {
    fn role(&self) -> StageRole {
        StageRole::PromptBuilder
    }

    async fn invoke(&self, inputs: StageInputs, _ctx: &InvocationContext) -> Result<StageOutputs> {
        let query = inputs.text("query")?;
        let documents = inputs.documents("documents")?;
        let prompt = self.render(query, documents);
        debug!("Rendered prompt with {} documents ({} chars)", documents.len(), prompt.len());
        Ok(StageOutputs::new().with("prompt", prompt))
    }
}
