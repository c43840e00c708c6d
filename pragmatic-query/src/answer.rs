//! Packs generator replies into answers for evaluation.

use async_trait::async_trait;
use pragmatic_core::{
    Answer, Result,
    traits::{Component, InvocationContext, StageRole},
    types::{StageInputs, StageOutputs},
};
use tracing::debug;

/// Builds one [`Answer`] per reply, carrying the query and the retrieved documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnswerBuilder;

impl AnswerBuilder {
    /// Create an answer builder.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Component for AnswerBuilder {
    fn role(&self) -> StageRole {
        StageRole::AnswerBuilder
    }

    async fn invoke(&self, inputs: StageInputs, _ctx: &InvocationContext) -> Result<StageOutputs> {
        let query = inputs.text("query")?;
        let documents = inputs.documents_or_empty("documents")?;
        let answers: Vec<Answer> = inputs
            .text_list("replies")?
            .iter()
            .map(|reply| Answer::new(reply.as_str(), query).with_documents(documents.to_vec()))
            .collect();
        debug!("Built {} answers from {} documents", answers.len(), documents.len());
        Ok(StageOutputs::new().with("answers", answers))
    }
}
