//! The uniform interface every stage collaborator implements.

use async_trait::async_trait;

use super::StageRole;
use crate::{
    Result,
    streaming::ChunkSink,
    types::{StageInputs, StageOutputs},
};

/// An external collaborator wrapped by a pipeline stage.
///
/// The executor hands each component its resolved inputs and stores the
/// returned outputs under the stage name. Collaborator failures are reported
/// through [`PipelineError::Component`](crate::PipelineError::Component) or any
/// other variant; the executor wraps them with the stage name.
///
/// # Examples
///
/// ```rust,no_run
/// use async_trait::async_trait;
/// use pragmatic_core::traits::{Component, InvocationContext, StageRole};
/// use pragmatic_core::types::{StageInputs, StageOutputs};
/// use pragmatic_core::Result;
///
/// #[derive(Debug)]
/// struct EchoGenerator;
///
/// #[async_trait]
/// impl Component for EchoGenerator {
///     fn role(&self) -> StageRole {
///         StageRole::Generator
///     }
///
///     async fn invoke(&self, inputs: StageInputs, ctx: &InvocationContext) -> Result<StageOutputs> {
///         let prompt = inputs.text("prompt")?.to_string();
///         ctx.emit(prompt.clone()).await?;
///         Ok(StageOutputs::new().with("replies", vec![prompt]))
///     }
/// }
/// ```
#[async_trait]
pub trait Component: Send + Sync + std::fmt::Debug {
    /// The role whose port schema this component exposes.
    fn role(&self) -> StageRole;

    /// Run the collaborator on one set of inputs.
    async fn invoke(&self, inputs: StageInputs, ctx: &InvocationContext) -> Result<StageOutputs>;

    /// Get a human-readable name for this component.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Per-run context handed to every component invocation.
///
/// In streaming runs it carries the sink that generators push partial
/// output into; in batch runs [`emit`](Self::emit) is a no-op.
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    sink: Option<ChunkSink>,
}

impl InvocationContext {
    /// Context for a batch run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for a streaming run.
    pub fn streaming(sink: ChunkSink) -> Self {
        Self { sink: Some(sink) }
    }

    /// Whether partial output is being consumed.
    pub fn is_streaming(&self) -> bool {
        self.sink.is_some()
    }

    /// Whether the stream consumer has gone away.
    pub fn is_cancelled(&self) -> bool {
        self.sink.as_ref().is_some_and(ChunkSink::is_cancelled)
    }

    /// Publish a partial output chunk.
    ///
    /// Fails with [`PipelineError::StreamCancelled`](crate::PipelineError::StreamCancelled)
    /// once the consumer has stopped, which lets a producer abort between chunks.
    pub async fn emit<S: Into<String> + Send>(&self, chunk: S) -> Result<()> {
        match &self.sink {
            Some(sink) => sink.send(chunk).await,
            None => Ok(()),
        }
    }
}
