//! Mutable node/edge container for the flow being edited.
//!
//! `FlowGraph` is a pure data container plus id generation: add/remove for
//! nodes and edges, the edge queries the branch engine leans on, and lossless
//! conversion to/from the persisted schema. Operations that reference unknown
//! ids are deliberate no-ops; the editor tolerates stale references instead
//! of failing mid-gesture. Structural invariants that span nodes, edges, and
//! branch rules are maintained one level up, in [`crate::branch`].

use std::sync::Arc;

use crate::error::FlowError;
use crate::model::config::{NodeConfig, NodeKind};
use crate::model::ids::{IdGenerator, UuidIdGenerator};
use crate::model::schema::{EdgeData, EdgeSchema, FlowSchema, NodeSchema, Position};

/// Reserved source handle of a condition node for the unmatched case.
pub const DEFAULT_HANDLE: &str = "default";

/// One step of the automation.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowNode {
    pub id: String,
    pub name: String,
    pub position: Position,
    pub config: NodeConfig,
}

impl FlowNode {
    /// The node's kind, derived from its payload so the two cannot disagree.
    pub fn kind(&self) -> NodeKind {
        self.config.kind()
    }

    pub fn from_schema(schema: &NodeSchema) -> Result<FlowNode, FlowError> {
        Ok(FlowNode {
            id: schema.id.clone(),
            name: schema.name.clone(),
            position: schema.position,
            config: NodeConfig::from_value(schema.kind, schema.data.clone())?,
        })
    }

    pub fn to_schema(&self) -> NodeSchema {
        NodeSchema {
            id: self.id.clone(),
            kind: self.kind(),
            name: self.name.clone(),
            position: self.position,
            data: self.config.to_value(),
        }
    }
}

/// A directed connection from one node's output handle to another node.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    /// `None` for the single implicit handle of non-branching sources;
    /// a rule id or [`DEFAULT_HANDLE`] for condition sources.
    pub source_handle: Option<String>,
    pub data: EdgeData,
}

impl FlowEdge {
    /// The rule id this edge is bound to, if it leaves a condition branch.
    pub fn bound_rule_id(&self) -> Option<&str> {
        match self.source_handle.as_deref() {
            Some(DEFAULT_HANDLE) | None => None,
            Some(handle) => Some(handle),
        }
    }

    pub fn from_schema(schema: &EdgeSchema) -> FlowEdge {
        FlowEdge {
            id: schema.id.clone(),
            source: schema.source.clone(),
            target: schema.target.clone(),
            source_handle: schema.source_handle.clone(),
            data: schema.data.clone(),
        }
    }

    pub fn to_schema(&self) -> EdgeSchema {
        EdgeSchema {
            id: self.id.clone(),
            source: self.source.clone(),
            target: self.target.clone(),
            source_handle: self.source_handle.clone(),
            data: self.data.clone(),
        }
    }
}

/// The working set of nodes and edges.
#[derive(Clone)]
pub struct FlowGraph {
    nodes: Vec<FlowNode>,
    edges: Vec<FlowEdge>,
    ids: Arc<dyn IdGenerator>,
}

impl Default for FlowGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FlowGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowGraph")
            .field("nodes", &self.nodes)
            .field("edges", &self.edges)
            .finish()
    }
}

impl PartialEq for FlowGraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.edges == other.edges
    }
}

impl FlowGraph {
    pub fn new() -> Self {
        Self::with_ids(Arc::new(UuidIdGenerator))
    }

    pub fn with_ids(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            ids,
        }
    }

    pub fn ids(&self) -> &Arc<dyn IdGenerator> {
        &self.ids
    }

    // --- Queries ---

    pub fn nodes(&self) -> &[FlowNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[FlowEdge] {
        &self.edges
    }

    pub fn node(&self, node_id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    pub fn node_mut(&mut self, node_id: &str) -> Option<&mut FlowNode> {
        self.nodes.iter_mut().find(|n| n.id == node_id)
    }

    pub fn edge(&self, edge_id: &str) -> Option<&FlowEdge> {
        self.edges.iter().find(|e| e.id == edge_id)
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.node(node_id).is_some()
    }

    /// All edges whose source is the given node.
    pub fn edges_from(&self, node_id: &str) -> Vec<&FlowEdge> {
        self.edges.iter().filter(|e| e.source == node_id).collect()
    }

    /// All edges whose target is the given node.
    pub fn edges_to(&self, node_id: &str) -> Vec<&FlowEdge> {
        self.edges.iter().filter(|e| e.target == node_id).collect()
    }

    /// The edge bound to a condition node's rule, if any.
    ///
    /// When duplicates exist (a persisted flow written by an older builder
    /// could carry them), the most recently added edge wins, matching the
    /// overwrite semantics of dropping a new wire on an occupied branch.
    pub fn edge_bound_to_rule(&self, node_id: &str, rule_id: &str) -> Option<&FlowEdge> {
        self.edges
            .iter()
            .filter(|e| e.source == node_id && e.bound_rule_id() == Some(rule_id))
            .next_back()
    }

    // --- Mutation (structural only) ---

    /// Create a node of the given kind with its factory-default config.
    /// Returns the generated node id.
    pub fn add_node(&mut self, kind: NodeKind, position: Position) -> String {
        let id = self.ids.next_id();
        let config = NodeConfig::default_for(kind, self.ids.as_ref());
        self.nodes.push(FlowNode {
            id: id.clone(),
            name: kind.label().to_string(),
            position,
            config,
        });
        id
    }

    /// Insert a fully formed node, replacing any node with the same id.
    pub fn insert_node(&mut self, node: FlowNode) {
        if let Some(existing) = self.node_mut(&node.id) {
            *existing = node;
        } else {
            self.nodes.push(node);
        }
    }

    /// Remove a node and every edge incident to it. Returns the removed
    /// edges; unknown ids remove nothing.
    pub fn remove_node(&mut self, node_id: &str) -> Vec<FlowEdge> {
        if !self.contains_node(node_id) {
            return Vec::new();
        }
        let mut removed = Vec::new();
        self.edges.retain(|e| {
            if e.source == node_id || e.target == node_id {
                removed.push(e.clone());
                false
            } else {
                true
            }
        });
        self.nodes.retain(|n| n.id != node_id);
        removed
    }

    /// Create an edge between two existing nodes. Returns the generated edge
    /// id, or `None` (no-op) when either endpoint is unknown.
    pub fn add_edge(
        &mut self,
        source: &str,
        target: &str,
        source_handle: Option<String>,
        data: EdgeData,
    ) -> Option<String> {
        if !self.contains_node(source) || !self.contains_node(target) {
            return None;
        }
        let id = self.ids.next_id();
        self.edges.push(FlowEdge {
            id: id.clone(),
            source: source.to_string(),
            target: target.to_string(),
            source_handle,
            data,
        });
        Some(id)
    }

    /// Remove an edge by id. Returns the removed edge for inspection.
    pub fn remove_edge(&mut self, edge_id: &str) -> Option<FlowEdge> {
        let index = self.edges.iter().position(|e| e.id == edge_id)?;
        Some(self.edges.remove(index))
    }

    /// Replace a node's config wholesale. No-op on unknown ids.
    pub fn set_node_config(&mut self, node_id: &str, config: NodeConfig) {
        if let Some(node) = self.node_mut(node_id) {
            node.config = config;
        }
    }

    pub fn set_node_name(&mut self, node_id: &str, name: impl Into<String>) {
        if let Some(node) = self.node_mut(node_id) {
            node.name = name.into();
        }
    }

    pub fn set_node_position(&mut self, node_id: &str, position: Position) {
        if let Some(node) = self.node_mut(node_id) {
            node.position = position;
        }
    }

    /// Swap in a whole new node/edge set (template application).
    pub fn replace_all(&mut self, nodes: Vec<FlowNode>, edges: Vec<FlowEdge>) {
        self.nodes = nodes;
        self.edges = edges;
    }

    // --- Persistence mapping ---

    pub fn from_schema(flow: &FlowSchema, ids: Arc<dyn IdGenerator>) -> Result<Self, FlowError> {
        let nodes = flow
            .nodes
            .iter()
            .map(FlowNode::from_schema)
            .collect::<Result<Vec<_>, _>>()?;
        let edges = flow.edges.iter().map(FlowEdge::from_schema).collect();
        Ok(Self { nodes, edges, ids })
    }

    pub fn to_schema_parts(&self) -> (Vec<NodeSchema>, Vec<EdgeSchema>) {
        (
            self.nodes.iter().map(FlowNode::to_schema).collect(),
            self.edges.iter().map(FlowEdge::to_schema).collect(),
        )
    }
}
