//! Stage graphs.
//!
//! A [`Graph`] owns the stages of one pipeline and the directed connections
//! between their ports. Graphs are assembled through
//! [`GraphBuilder`](builder::GraphBuilder) and executed by the
//! [`Executor`](crate::executor::Executor); once built they are never
//! mutated, a rebuild produces a fresh value.

pub mod builder;
pub mod port;

pub use builder::*;
pub use port::*;

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::{
    PipelineError, Result,
    traits::{Component, StageRole},
    types::{Fields, StageValue},
};

/// A static stage argument: either a literal or a binding to another stage's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageArg {
    /// A fixed value passed on every run unless overridden.
    Literal(StageValue),
    /// Read from the output port of an upstream stage.
    Bound(Port),
}

/// Static arguments configured for a stage.
///
/// ```rust
/// use pragmatic_core::graph::StageArgs;
///
/// let args = StageArgs::new()
///     .with("query", "")
///     .with("top_k", 5_usize)
///     .bind("documents", "retriever.documents");
/// assert_eq!(args.literals().len(), 2);
/// assert_eq!(args.bindings().count(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageArgs(BTreeMap<String, StageArg>);

impl StageArgs {
    /// Create an empty argument set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a literal argument.
    #[must_use]
    pub fn with<K: Into<String>, V: Into<StageValue>>(mut self, name: K, value: V) -> Self {
        self.0.insert(name.into(), StageArg::Literal(value.into()));
        self
    }

    /// Bind an argument to the output port of another stage.
    #[must_use]
    pub fn bind<K: Into<String>, P: Into<Port>>(mut self, name: K, port: P) -> Self {
        self.0.insert(name.into(), StageArg::Bound(port.into()));
        self
    }

    /// Get an argument by name.
    pub fn get(&self, name: &str) -> Option<&StageArg> {
        self.0.get(name)
    }

    /// Whether an argument with this name is configured.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterate over all arguments.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StageArg)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Literal arguments as a field map.
    pub fn literals(&self) -> Fields {
        self.0
            .iter()
            .filter_map(|(name, arg)| match arg {
                StageArg::Literal(value) => Some((name.clone(), value.clone())),
                StageArg::Bound(_) => None,
            })
            .collect()
    }

    /// Bound arguments as `(field, source port)` pairs.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &Port)> {
        self.0.iter().filter_map(|(name, arg)| match arg {
            StageArg::Bound(port) => Some((name.as_str(), port)),
            StageArg::Literal(_) => None,
        })
    }

    /// Whether no arguments are configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A named unit of work inside a graph.
#[derive(Debug, Clone)]
pub struct Stage {
    name: String,
    component: Arc<dyn Component>,
    args: StageArgs,
}

impl Stage {
    /// Stage name, unique within its graph.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The wrapped collaborator.
    pub fn component(&self) -> &Arc<dyn Component> {
        &self.component
    }

    /// Role of the wrapped collaborator.
    pub fn role(&self) -> StageRole {
        self.component.role()
    }

    /// Static arguments.
    pub fn args(&self) -> &StageArgs {
        &self.args
    }
}

/// A directed link from an output port to an input port.
///
/// Both ports are always field-qualified once stored in a graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Connection {
    from: Port,
    to: Port,
}

impl Connection {
    /// Source port.
    pub fn source(&self) -> &Port {
        &self.from
    }

    /// Destination port.
    pub fn target(&self) -> &Port {
        &self.to
    }

    /// Field read from the source stage's outputs.
    pub fn source_field(&self) -> &str {
        self.from.field().unwrap_or_default()
    }

    /// Input field fed on the destination stage.
    pub fn target_field(&self) -> &str {
        self.to.field().unwrap_or_default()
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// The stages and connections of one pipeline.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    stages: Vec<Stage>,
    index: HashMap<String, usize>,
    connections: Vec<Connection>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the graph has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Look up a stage by name.
    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.index.get(name).map(|&i| &self.stages[i])
    }

    /// Whether a stage with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Stages in insertion order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Stage names in insertion order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(Stage::name).collect()
    }

    /// All connections in creation order.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Connections ending at the given stage.
    pub fn incoming<'a>(&'a self, stage: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| c.to.stage() == stage)
    }

    /// Connections leaving the given stage.
    pub fn outgoing<'a>(&'a self, stage: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| c.from.stage() == stage)
    }

    /// Whether a stage has any incoming connection.
    pub fn has_incoming(&self, stage: &str) -> bool {
        self.incoming(stage).next().is_some()
    }

    /// Stage names as a set, for structural comparison.
    pub fn stage_set(&self) -> BTreeSet<String> {
        self.index.keys().cloned().collect()
    }

    /// Connections as a set, for structural comparison.
    pub fn connection_set(&self) -> BTreeSet<Connection> {
        self.connections.iter().cloned().collect()
    }

    pub(crate) fn insert_stage(
        &mut self,
        name: String,
        component: Arc<dyn Component>,
        args: StageArgs,
    ) -> Result<()> {
        if self.contains(&name) {
            return Err(PipelineError::duplicate_stage(name));
        }

        let role = component.role();
        for (field, _) in args.iter() {
            if role.input(field).is_none() {
                return Err(PipelineError::invalid_port(
                    &Port::new(name.as_str(), field),
                    format!("{role} stages have no input named '{field}'"),
                ));
            }
        }

        debug!("Adding stage {} ({}) with args: {:?}", name, role, args);
        self.index.insert(name.clone(), self.stages.len());
        self.stages.push(Stage {
            name,
            component,
            args,
        });
        Ok(())
    }

    /// Remove the most recently added stage; used to roll back a failed add.
    pub(crate) fn pop_stage(&mut self, name: &str) {
        if let Some(index) = self.index.remove(name) {
            self.stages.remove(index);
            self.connections
                .retain(|c| c.from.stage() != name && c.to.stage() != name);
            self.index = self
                .stages
                .iter()
                .enumerate()
                .map(|(i, stage)| (stage.name.clone(), i))
                .collect();
        }
    }

    /// Resolve both endpoints against the stage roles and record the connection.
    pub(crate) fn connect(&mut self, from: &Port, to: &Port) -> Result<&Connection> {
        let source = self
            .stage(from.stage())
            .ok_or_else(|| PipelineError::unknown_stage(from.stage()))?;
        let target = self
            .stage(to.stage())
            .ok_or_else(|| PipelineError::unknown_stage(to.stage()))?;
        let (source_role, target_role) = (source.role(), target.role());

        let from_field = match from.field() {
            Some(field) if source_role.has_output(field) => field,
            Some(field) => {
                return Err(PipelineError::invalid_port(
                    from,
                    format!("{source_role} stages produce no output named '{field}'"),
                ));
            }
            None => source_role.default_output(),
        };

        let to_field = match to.field() {
            Some(field) => field,
            None => self.infer_input(to.stage(), target_role, from_field)?,
        };
        let spec = target_role.input(to_field).ok_or_else(|| {
            PipelineError::invalid_port(
                to,
                format!("{target_role} stages have no input named '{to_field}'"),
            )
        })?;

        let resolved = Connection {
            from: Port::new(from.stage(), from_field),
            to: Port::new(to.stage(), to_field),
        };
        if self.connections.contains(&resolved) {
            return Err(PipelineError::invalid_port(&resolved.to, "connection already exists"));
        }
        if !spec.variadic && self.is_input_connected(to.stage(), to_field) {
            return Err(PipelineError::invalid_port(
                &resolved.to,
                "input already has a connection and is not variadic",
            ));
        }

        debug!("Adding pipeline connection: {}", resolved);
        self.connections.push(resolved);
        Ok(&self.connections[self.connections.len() - 1])
    }

    fn is_input_connected(&self, stage: &str, field: &str) -> bool {
        self.incoming(stage).any(|c| c.target_field() == field)
    }

    /// Pick the destination field for a whole-stage connection: the input named
    /// like the source field, otherwise the first input that is still free.
    fn infer_input(&self, stage: &str, role: StageRole, from_field: &str) -> Result<&'static str> {
        if let Some(spec) = role.input(from_field) {
            return Ok(spec.name);
        }
        role.inputs()
            .iter()
            .find(|spec| !self.is_input_connected(stage, spec.name))
            .map(|spec| spec.name)
            .ok_or_else(|| {
                PipelineError::invalid_port(stage, format!("no free input for '{from_field}'"))
            })
    }

    /// Order stages so every stage follows all stages it has incoming connections from.
    ///
    /// A cycle yields [`PipelineError::CyclicGraph`] listing the stages on it,
    /// in insertion order.
    pub fn topological_order(&self) -> Result<Vec<&Stage>> {
        let mut dag: DiGraph<usize, ()> =
            DiGraph::with_capacity(self.stages.len(), self.connections.len());
        let nodes: Vec<NodeIndex> = (0..self.stages.len()).map(|i| dag.add_node(i)).collect();
        for connection in &self.connections {
            let from = nodes[self.index[connection.from.stage()]];
            let to = nodes[self.index[connection.to.stage()]];
            dag.add_edge(from, to, ());
        }

        match toposort(&dag, None) {
            Ok(order) => Ok(order.into_iter().map(|node| &self.stages[dag[node]]).collect()),
            Err(cycle) => {
                debug!("Cycle through stage '{}'", self.stages[dag[cycle.node_id()]].name);
                let mut cyclic: Vec<usize> = tarjan_scc(&dag)
                    .into_iter()
                    .filter(|component| {
                        component.len() > 1 || dag.contains_edge(component[0], component[0])
                    })
                    .flatten()
                    .map(|node| dag[node])
                    .collect();
                cyclic.sort_unstable();
                let stages = cyclic.into_iter().map(|i| self.stages[i].name.clone()).collect();
                Err(PipelineError::CyclicGraph { stages })
            }
        }
    }
}
