//! Slot-keyed component factories.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::debug;

use crate::{
    PipelineError, Result,
    config::Settings,
    traits::{Component, StageRole},
};

/// Named collaborator slots requested by the topology recipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ComponentSlot {
    /// Downloads remote documents.
    Fetcher,
    /// Turns files or fetched payloads into documents.
    Converter,
    /// Normalizes document text.
    Cleaner,
    /// Built-in word/sentence/passage splitter.
    SimpleSplitter,
    /// Externally provided token-aware splitter.
    ExternalSplitter,
    /// Embeds documents before they are written.
    DocumentEmbedder,
    /// Embeds the query text.
    TextEmbedder,
    /// Keyword retriever.
    SparseRetriever,
    /// Embedding retriever.
    DenseRetriever,
    /// Merges the outputs of several retrievers.
    DocumentJoiner,
    /// Re-orders retrieved documents.
    Ranker,
    /// Renders the generation prompt.
    PromptBuilder,
    /// Generates replies.
    Generator,
    /// Persists documents.
    Writer,
    /// Packs replies and documents into answers.
    AnswerBuilder,
    /// Computes one evaluation metric.
    Evaluator,
}

impl ComponentSlot {
    /// The role a component must expose to fill this slot.
    pub fn role(self) -> StageRole {
        match self {
            Self::Fetcher => StageRole::Fetcher,
            Self::Converter => StageRole::Converter,
            Self::Cleaner => StageRole::Cleaner,
            Self::SimpleSplitter | Self::ExternalSplitter => StageRole::Splitter,
            Self::DocumentEmbedder => StageRole::DocumentEmbedder,
            Self::TextEmbedder => StageRole::TextEmbedder,
            Self::SparseRetriever => StageRole::SparseRetriever,
            Self::DenseRetriever => StageRole::DenseRetriever,
            Self::DocumentJoiner => StageRole::DocumentJoiner,
            Self::Ranker => StageRole::Ranker,
            Self::PromptBuilder => StageRole::PromptBuilder,
            Self::Generator => StageRole::Generator,
            Self::Writer => StageRole::Writer,
            Self::AnswerBuilder => StageRole::AnswerBuilder,
            Self::Evaluator => StageRole::Evaluator,
        }
    }
}

/// Creates the component for one slot from the active settings.
///
/// # Examples
///
/// ```rust,no_run
/// use async_trait::async_trait;
/// use pragmatic_core::config::Settings;
/// use pragmatic_core::factory::ComponentFactory;
/// use pragmatic_core::traits::Component;
/// use pragmatic_core::Result;
/// use std::sync::Arc;
///
/// #[derive(Debug)]
/// struct VllmGeneratorFactory;
///
/// #[async_trait]
/// impl ComponentFactory for VllmGeneratorFactory {
///     async fn create(&self, settings: &Settings) -> Result<Arc<dyn Component>> {
///         // Connect to `settings.llm_base_url` and serve `settings.llm`
///         todo!("Create the generator client")
///     }
/// }
/// ```
#[async_trait]
pub trait ComponentFactory: Send + Sync + fmt::Debug {
    /// Create a component configured from `settings`.
    async fn create(&self, settings: &Settings) -> Result<Arc<dyn Component>>;

    /// Get a human-readable name for this factory.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Factory handing out one shared, ready-made component.
#[derive(Debug, Clone)]
pub struct InstanceFactory {
    component: Arc<dyn Component>,
}

impl InstanceFactory {
    /// Wrap a ready component.
    pub fn new(component: Arc<dyn Component>) -> Self {
        Self { component }
    }
}

#[async_trait]
impl ComponentFactory for InstanceFactory {
    async fn create(&self, _settings: &Settings) -> Result<Arc<dyn Component>> {
        Ok(Arc::clone(&self.component))
    }
}

/// Factory backed by a closure over the settings.
pub struct FnFactory<F> {
    create: F,
}

impl<F> FnFactory<F>
where
    F: Fn(&Settings) -> Result<Arc<dyn Component>> + Send + Sync,
{
    /// Wrap a closure.
    pub fn new(create: F) -> Self {
        Self { create }
    }
}

impl<F> fmt::Debug for FnFactory<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFactory").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> ComponentFactory for FnFactory<F>
where
    F: Fn(&Settings) -> Result<Arc<dyn Component>> + Send + Sync,
{
    async fn create(&self, settings: &Settings) -> Result<Arc<dyn Component>> {
        (self.create)(settings)
    }
}

/// Registry mapping slots to factories.
///
/// ```rust,no_run
/// use pragmatic_core::config::Settings;
/// use pragmatic_core::factory::{ComponentRegistry, ComponentSlot};
/// # use pragmatic_core::traits::Component;
/// # use std::sync::Arc;
/// # async fn example(generator: Arc<dyn Component>) -> pragmatic_core::Result<()> {
/// let mut registry = ComponentRegistry::new();
/// registry.register_instance(ComponentSlot::Generator, generator);
/// let llm = registry.create(ComponentSlot::Generator, &Settings::default()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    factories: HashMap<ComponentSlot, Arc<dyn ComponentFactory>>,
}

impl ComponentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for a slot, replacing any previous one.
    pub fn register(&mut self, slot: ComponentSlot, factory: Arc<dyn ComponentFactory>) -> &mut Self {
        debug!("Registering factory {} for slot {}", factory.name(), slot);
        self.factories.insert(slot, factory);
        self
    }

    /// Register a ready-made component for a slot.
    pub fn register_instance(&mut self, slot: ComponentSlot, component: Arc<dyn Component>) -> &mut Self {
        self.register(slot, Arc::new(InstanceFactory::new(component)))
    }

    /// Register a closure creating the component for a slot.
    pub fn register_fn<F>(&mut self, slot: ComponentSlot, create: F) -> &mut Self
    where
        F: Fn(&Settings) -> Result<Arc<dyn Component>> + Send + Sync + 'static,
    {
        self.register(slot, Arc::new(FnFactory::new(create)))
    }

    /// Whether a factory is registered for the slot.
    pub fn contains(&self, slot: ComponentSlot) -> bool {
        self.factories.contains_key(&slot)
    }

    /// Slots with a registered factory.
    pub fn slots(&self) -> Vec<ComponentSlot> {
        self.factories.keys().copied().collect()
    }

    /// Create the component for a slot.
    ///
    /// Fails with a configuration error when the slot is empty or when the
    /// produced component's role does not match the slot.
    pub async fn create(&self, slot: ComponentSlot, settings: &Settings) -> Result<Arc<dyn Component>> {
        let factory = self.factories.get(&slot).ok_or_else(|| {
            PipelineError::configuration(format!("No component registered for slot: {slot}"))
        })?;

        let component = factory.create(settings).await?;
        let (expected, actual) = (slot.role(), component.role());
        if expected != actual {
            return Err(PipelineError::configuration(format!(
                "Component {} fills slot {slot} with role {actual}, expected {expected}",
                component.name()
            )));
        }
        Ok(component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::InvocationContext;
    use crate::types::{StageInputs, StageOutputs};
    use strum::IntoEnumIterator;

    #[derive(Debug)]
    struct Noop(StageRole);

    #[async_trait]
    impl Component for Noop {
        fn role(&self) -> StageRole {
            self.0
        }

        async fn invoke(&self, _: StageInputs, _: &InvocationContext) -> Result<StageOutputs> {
            Ok(StageOutputs::new())
        }
    }

    #[test]
    fn test_both_splitter_slots_take_splitters() {
        assert_eq!(ComponentSlot::SimpleSplitter.role(), StageRole::Splitter);
        assert_eq!(ComponentSlot::ExternalSplitter.role(), StageRole::Splitter);
        assert_eq!(ComponentSlot::iter().count(), 16);
    }

    #[tokio::test]
    async fn test_empty_slot() {
        let err = ComponentRegistry::new()
            .create(ComponentSlot::Ranker, &Settings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration { ref message } if message.contains("ranker")));
    }

    #[tokio::test]
    async fn test_role_mismatch_is_rejected() {
        let mut registry = ComponentRegistry::new();
        registry.register_instance(ComponentSlot::Ranker, Arc::new(Noop(StageRole::Generator)));
        let err = registry
            .create(ComponentSlot::Ranker, &Settings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_closure_factory_sees_settings() {
        let mut registry = ComponentRegistry::new();
        registry.register_fn(ComponentSlot::Ranker, |settings| {
            if settings.ranker_enabled {
                Ok(Arc::new(Noop(StageRole::Ranker)) as Arc<dyn Component>)
            } else {
                Err(PipelineError::configuration("ranker disabled"))
            }
        });

        let settings = Settings {
            ranker_enabled: true,
            ..Settings::default()
        };
        let ranker = registry.create(ComponentSlot::Ranker, &settings).await.unwrap();
        assert_eq!(ranker.role(), StageRole::Ranker);
        assert!(registry.create(ComponentSlot::Ranker, &Settings::default()).await.is_err());
    }
}
