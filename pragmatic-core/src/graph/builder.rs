//! Incremental graph construction with implicit chaining.
//!
//! The builder keeps a *frontier*: the stage the next auto-connected stage is
//! linked from. Adding a stage with auto-connect moves the frontier onto it,
//! so sequentially added stages form a chain without explicit wiring. Fan-in
//! topologies add their branches unconnected, wire them by hand, and then
//! move the frontier onto the join stage with [`GraphBuilder::set_frontier`].

use std::sync::Arc;
use tracing::debug;

use super::{Graph, Port, StageArgs};
use crate::{PipelineError, Result, traits::Component};

/// How a newly added stage is linked into the graph.
#[derive(Debug, Clone)]
pub struct StageOptions {
    connect_from: Option<Port>,
    connect_to: Option<Port>,
    auto_connect: bool,
}

impl Default for StageOptions {
    fn default() -> Self {
        Self {
            connect_from: None,
            connect_to: None,
            auto_connect: true,
        }
    }
}

impl StageOptions {
    /// Chain from the frontier onto the new stage (the default).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the stage without any automatic connection.
    pub fn unconnected() -> Self {
        Self {
            auto_connect: false,
            ..Self::default()
        }
    }

    /// Use this port instead of the frontier as the source of the auto-connection.
    #[must_use]
    pub fn connect_from<P: Into<Port>>(mut self, port: P) -> Self {
        self.connect_from = Some(port.into());
        self
    }

    /// Use this port instead of the whole new stage as the destination.
    #[must_use]
    pub fn connect_to<P: Into<Port>>(mut self, port: P) -> Self {
        self.connect_to = Some(port.into());
        self
    }

    /// Whether the stage is chained from the frontier.
    pub fn auto_connect(&self) -> bool {
        self.auto_connect
    }
}

/// Builder that populates a [`Graph`] stage by stage.
///
/// # Examples
///
/// ```rust,no_run
/// use pragmatic_core::graph::{GraphBuilder, StageArgs, StageOptions};
/// # use pragmatic_core::traits::Component;
/// # use std::sync::Arc;
/// # fn example(embedder: Arc<dyn Component>, retriever: Arc<dyn Component>) -> pragmatic_core::Result<()> {
/// let mut builder = GraphBuilder::new();
/// builder
///     .add_stage("embedder", embedder, StageArgs::new().with("text", ""), StageOptions::new())?
///     .add_stage(
///         "retriever",
///         retriever,
///         StageArgs::new(),
///         StageOptions::new()
///             .connect_from("embedder.embedding")
///             .connect_to("retriever.query_embedding"),
///     )?;
/// assert_eq!(builder.frontier(), Some("retriever"));
/// let graph = builder.build();
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: Graph,
    frontier: Option<String>,
}

impl GraphBuilder {
    /// Create a builder for an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stage and, unless told otherwise, chain it from the frontier.
    ///
    /// With auto-connect the connection runs from `connect_from` (or the
    /// frontier) to `connect_to` (or the new stage) and the frontier then moves
    /// onto the new stage. When no frontier exists yet, no connection is made.
    /// Arguments bound to upstream ports become connections as well. On any
    /// failure the stage is not added.
    pub fn add_stage<N: Into<String>>(
        &mut self,
        name: N,
        component: Arc<dyn Component>,
        args: StageArgs,
        options: StageOptions,
    ) -> Result<&mut Self> {
        let name = name.into();
        let bindings: Vec<(String, Port)> = args
            .bindings()
            .map(|(field, port)| (field.to_string(), port.clone()))
            .collect();

        self.graph.insert_stage(name.clone(), component, args)?;

        if let Err(err) = self.link(&name, &bindings, options) {
            self.graph.pop_stage(&name);
            return Err(err);
        }
        Ok(self)
    }

    /// Add a stage with no arguments, chained from the frontier.
    pub fn add<N: Into<String>>(
        &mut self,
        name: N,
        component: Arc<dyn Component>,
    ) -> Result<&mut Self> {
        self.add_stage(name, component, StageArgs::new(), StageOptions::new())
    }

    fn link(&mut self, name: &str, bindings: &[(String, Port)], options: StageOptions) -> Result<()> {
        for (field, source) in bindings {
            self.graph.connect(source, &Port::new(name, field.as_str()))?;
        }

        if !options.auto_connect {
            return Ok(());
        }

        if let Some(frontier) = &self.frontier {
            let from = options
                .connect_from
                .unwrap_or_else(|| Port::stage_only(frontier.as_str()));
            let to = options.connect_to.unwrap_or_else(|| Port::stage_only(name));
            self.graph.connect(&from, &to)?;
        }
        self.frontier = Some(name.to_string());
        Ok(())
    }

    /// Add an explicit connection between two ports.
    pub fn connect<F: Into<Port>, T: Into<Port>>(&mut self, from: F, to: T) -> Result<&mut Self> {
        self.graph.connect(&from.into(), &to.into())?;
        Ok(self)
    }

    /// Move the frontier onto an existing stage.
    pub fn set_frontier<S: Into<String>>(&mut self, stage: S) -> Result<&mut Self> {
        let stage = stage.into();
        if !self.graph.contains(&stage) {
            return Err(PipelineError::unknown_stage(stage));
        }
        debug!("Moving frontier to {}", stage);
        self.frontier = Some(stage);
        Ok(self)
    }

    /// The stage the next auto-connected stage will be chained from.
    pub fn frontier(&self) -> Option<&str> {
        self.frontier.as_deref()
    }

    /// The graph built so far.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Finish building.
    pub fn build(self) -> Graph {
        self.graph
    }
}
