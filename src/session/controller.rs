//! The builder session: one working flow, its selection state, and the
//! orchestration of load/save/template operations against the store.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::branch;
use crate::error::FlowError;
use crate::model::config::NodeKind;
use crate::model::graph::{FlowEdge, FlowGraph, FlowNode};
use crate::model::ids::{IdGenerator, UuidIdGenerator};
use crate::model::schema::{
    ExecutionSummary, FlowSchema, FlowStatus, Position, TemplateSchema,
};
use crate::validation::validate_graph;
use crate::view::{graph_to_view_with, CanvasProbe, ScreenRect, ViewEdge, ViewNode};

use super::store::FlowStore;

/// What the user currently has selected on the canvas. At most one of the
/// two is set; selecting a node deselects the edge and vice versa.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    pub node: Option<String>,
    pub edge: Option<String>,
}

/// Globally bound keyboard gestures, delivered by the host UI. The host also
/// reports whether focus currently sits in a text input so shortcuts never
/// intercept ordinary typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    DeleteSelection,
    CloneNode,
}

/// A working copy of one flow, edited locally and flushed on save.
pub struct FlowSession {
    store: Arc<dyn FlowStore>,
    flow_id: Option<String>,
    pub name: String,
    pub status: FlowStatus,
    pub version: u32,
    pub instance_name: String,
    pub triggers: Vec<Value>,
    pub settings: Value,
    graph: FlowGraph,
    selection: Selection,
    panel_open: bool,
    dirty: bool,
    /// Monotonic save counter: responses from saves older than the latest
    /// issued request are discarded instead of overwriting newer edits.
    save_seq: u64,
    dispatch_names: HashMap<String, String>,
}

impl FlowSession {
    /// Open an existing flow.
    pub async fn load(store: Arc<dyn FlowStore>, flow_id: &str) -> Result<Self, FlowError> {
        Self::load_with_ids(store, flow_id, Arc::new(UuidIdGenerator)).await
    }

    pub async fn load_with_ids(
        store: Arc<dyn FlowStore>,
        flow_id: &str,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self, FlowError> {
        let flow = store.fetch_flow(flow_id).await?;
        let mut graph = FlowGraph::from_schema(&flow, ids)?;
        // A flow written by an older builder may carry stale branch caches;
        // one pass repairs them before the user sees anything.
        branch::reconcile_all(&mut graph);
        tracing::info!(flow_id, name = %flow.name, "flow loaded");
        Ok(Self {
            store,
            flow_id: Some(flow.id),
            name: flow.name,
            status: flow.status,
            version: flow.version,
            instance_name: flow.instance_name,
            triggers: flow.triggers,
            settings: flow.settings,
            graph,
            selection: Selection::default(),
            panel_open: false,
            dirty: false,
            save_seq: 0,
            dispatch_names: HashMap::new(),
        })
    }

    /// Start a fresh draft with a single seed node.
    pub fn scaffold(store: Arc<dyn FlowStore>, name: &str, instance_name: &str) -> Self {
        Self::scaffold_with_ids(store, name, instance_name, Arc::new(UuidIdGenerator))
    }

    pub fn scaffold_with_ids(
        store: Arc<dyn FlowStore>,
        name: &str,
        instance_name: &str,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        let mut graph = FlowGraph::with_ids(ids);
        graph.add_node(NodeKind::Message, Position { x: 80.0, y: 80.0 });
        Self {
            store,
            flow_id: None,
            name: name.to_string(),
            status: FlowStatus::Draft,
            version: 1,
            instance_name: instance_name.to_string(),
            triggers: Vec::new(),
            settings: Value::Null,
            graph,
            selection: Selection::default(),
            panel_open: false,
            dirty: true,
            save_seq: 0,
            dispatch_names: HashMap::new(),
        }
    }

    // --- Accessors ---

    pub fn flow_id(&self) -> Option<&str> {
        self.flow_id.as_deref()
    }

    pub fn graph(&self) -> &FlowGraph {
        &self.graph
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn panel_open(&self) -> bool {
        self.panel_open
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The canvas-renderable shape of the working graph.
    pub fn view(&self) -> (Vec<ViewNode>, Vec<ViewEdge>) {
        graph_to_view_with(&self.graph, Some(&self.dispatch_names))
    }

    /// Screen rectangle of the selected node, for popover anchoring.
    pub fn panel_anchor(&self, probe: &dyn CanvasProbe) -> Option<ScreenRect> {
        self.selection
            .node
            .as_deref()
            .and_then(|id| probe.node_rect(id))
    }

    // --- Selection ---

    pub fn select_node(&mut self, node_id: &str) {
        if self.graph.contains_node(node_id) {
            self.selection = Selection {
                node: Some(node_id.to_string()),
                edge: None,
            };
            self.panel_open = true;
        }
    }

    pub fn select_edge(&mut self, edge_id: &str) {
        if self.graph.edge(edge_id).is_some() {
            self.selection = Selection {
                node: None,
                edge: Some(edge_id.to_string()),
            };
            self.panel_open = false;
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection = Selection::default();
        self.panel_open = false;
    }

    // --- Graph mutation (marks the session dirty) ---

    pub fn add_node(&mut self, kind: NodeKind, position: Position) -> String {
        let id = self.graph.add_node(kind, position);
        self.dirty = true;
        id
    }

    pub fn connect(&mut self, source: &str, target: &str) -> Option<String> {
        self.mutated_opt(|graph| branch::connect(graph, source, target))
    }

    pub fn connect_to_handle(
        &mut self,
        source: &str,
        target: &str,
        handle: Option<&str>,
    ) -> Option<String> {
        self.mutated_opt(|graph| branch::connect_to_handle(graph, source, target, handle))
    }

    pub fn remove_edge(&mut self, edge_id: &str) -> bool {
        let removed = self.mutated(|graph| branch::remove_edge(graph, edge_id));
        if removed && self.selection.edge.as_deref() == Some(edge_id) {
            self.clear_selection();
        }
        removed
    }

    pub fn remove_node(&mut self, node_id: &str) -> bool {
        let removed = self.mutated(|graph| branch::remove_node(graph, node_id));
        if removed {
            if self.selection.node.as_deref() == Some(node_id) {
                self.clear_selection();
            }
            // an incident edge may have been the selected one
            if let Some(edge_id) = self.selection.edge.clone() {
                if self.graph.edge(&edge_id).is_none() {
                    self.clear_selection();
                }
            }
        }
        removed
    }

    pub fn retype_node(&mut self, node_id: &str, kind: NodeKind) -> bool {
        self.mutated(|graph| branch::retype_node(graph, node_id, kind))
    }

    pub fn rename_node(&mut self, node_id: &str, name: &str) -> bool {
        if self.graph.contains_node(node_id) {
            self.graph.set_node_name(node_id, name);
            self.dirty = true;
            true
        } else {
            false
        }
    }

    pub fn move_node(&mut self, node_id: &str, position: Position) -> bool {
        if self.graph.contains_node(node_id) {
            self.graph.set_node_position(node_id, position);
            self.dirty = true;
            true
        } else {
            false
        }
    }

    pub fn set_node_config(&mut self, node_id: &str, config: crate::model::config::NodeConfig) {
        if self.graph.contains_node(node_id) {
            self.graph.set_node_config(node_id, config);
            branch::reconcile(&mut self.graph, node_id);
            self.dirty = true;
        }
    }

    pub fn add_rule(&mut self, node_id: &str) -> Option<String> {
        self.mutated_opt(|graph| branch::add_rule(graph, node_id))
    }

    pub fn remove_rule(&mut self, node_id: &str, rule_id: &str) -> bool {
        let removed = self.mutated(|graph| branch::remove_rule(graph, node_id, rule_id));
        if removed {
            if let Some(edge_id) = self.selection.edge.clone() {
                if self.graph.edge(&edge_id).is_none() {
                    self.clear_selection();
                }
            }
        }
        removed
    }

    pub fn retype_rule(
        &mut self,
        node_id: &str,
        rule_id: &str,
        kind: crate::model::config::PredicateKind,
    ) -> bool {
        self.mutated(|graph| branch::retype_rule(graph, node_id, rule_id, kind))
    }

    pub fn set_rule_value(&mut self, node_id: &str, rule_id: &str, value: &str) -> bool {
        self.mutated(|graph| branch::set_rule_value(graph, node_id, rule_id, value))
    }

    pub fn set_rule_label(&mut self, node_id: &str, rule_id: &str, label: Option<&str>) -> bool {
        self.mutated(|graph| branch::set_rule_label(graph, node_id, rule_id, label))
    }

    /// Handle a global keyboard gesture. Returns whether it was consumed.
    pub fn shortcut(&mut self, shortcut: Shortcut, editing_text: bool) -> bool {
        if editing_text {
            return false;
        }
        match shortcut {
            Shortcut::DeleteSelection => {
                if let Some(edge_id) = self.selection.edge.clone() {
                    self.remove_edge(&edge_id)
                } else if let Some(node_id) = self.selection.node.clone() {
                    self.remove_node(&node_id)
                } else {
                    false
                }
            }
            Shortcut::CloneNode => {
                let Some(node_id) = self.selection.node.clone() else {
                    return false;
                };
                match self.mutated_opt(|graph| branch::clone_node(graph, &node_id)) {
                    Some(copy) => {
                        self.select_node(&copy);
                        true
                    }
                    None => false,
                }
            }
        }
    }

    // --- Persistence ---

    /// Validate and flush the working copy, then adopt the server's
    /// canonical copy. A response that arrives after a newer save request
    /// was issued is discarded.
    pub async fn save(&mut self) -> Result<(), FlowError> {
        if self.instance_name.trim().is_empty() {
            return Err(FlowError::MissingInstance);
        }
        let report = validate_graph(&self.graph);
        if !report.is_valid {
            return Err(FlowError::ValidationFailed(Box::new(report)));
        }

        self.save_seq += 1;
        let seq = self.save_seq;
        let outgoing = self.to_schema();
        let saved = match &self.flow_id {
            Some(id) => self.store.update_flow(id, &outgoing).await?,
            None => self.store.create_flow(&outgoing).await?,
        };

        if self.save_seq != seq {
            tracing::warn!(flow = %saved.id, "stale save response discarded");
            return Ok(());
        }
        self.adopt(saved)?;
        self.dirty = false;
        tracing::info!(flow = %self.flow_id.as_deref().unwrap_or(""), version = self.version, "flow saved");
        Ok(())
    }

    /// Save, then signal the caller it is safe to close. On failure the
    /// session stays open with the unsaved work intact.
    pub async fn close_with_save(&mut self) -> Result<(), FlowError> {
        self.save().await
    }

    /// Replace the working graph, triggers, and settings with a template's
    /// content. Not a merge: previous nodes and edges are gone afterwards,
    /// and any selection is cleared.
    pub fn apply_template(&mut self, template: &TemplateSchema) -> Result<(), FlowError> {
        let nodes = template
            .nodes
            .iter()
            .map(FlowNode::from_schema)
            .collect::<Result<Vec<_>, _>>()?;
        let edges: Vec<FlowEdge> = template.edges.iter().map(FlowEdge::from_schema).collect();

        self.graph.replace_all(nodes, edges);
        branch::reconcile_all(&mut self.graph);
        self.triggers = template.triggers.clone();
        self.settings = template.settings.clone();
        self.clear_selection();
        self.dirty = true;
        tracing::info!(template = %template.id, "template applied");
        Ok(())
    }

    /// Snapshot this flow as a reusable template, server-side.
    pub async fn duplicate_as_template(&self) -> Result<TemplateSchema, FlowError> {
        let flow_id = self.flow_id.as_deref().ok_or(FlowError::NeverSaved)?;
        self.store.duplicate_as_template(flow_id).await
    }

    pub async fn set_status(&mut self, status: FlowStatus) -> Result<(), FlowError> {
        let flow_id = self.flow_id.as_deref().ok_or(FlowError::NeverSaved)?;
        let saved = self.store.set_flow_status(flow_id, status).await?;
        self.status = saved.status;
        Ok(())
    }

    pub async fn executions(&self) -> Result<Vec<ExecutionSummary>, FlowError> {
        let flow_id = self.flow_id.as_deref().ok_or(FlowError::NeverSaved)?;
        self.store.list_executions(flow_id).await
    }

    /// Refresh the template id→name lookup used in dispatch node subtitles.
    pub async fn refresh_dispatch_templates(&mut self) -> Result<(), FlowError> {
        let templates = self.store.list_dispatch_templates().await?;
        self.dispatch_names = templates.into_iter().map(|t| (t.id, t.name)).collect();
        Ok(())
    }

    // --- internals ---

    fn to_schema(&self) -> FlowSchema {
        let (nodes, edges) = self.graph.to_schema_parts();
        FlowSchema {
            id: self.flow_id.clone().unwrap_or_default(),
            name: self.name.clone(),
            status: self.status,
            version: self.version,
            instance_name: self.instance_name.clone(),
            triggers: self.triggers.clone(),
            nodes,
            edges,
            settings: self.settings.clone(),
        }
    }

    fn adopt(&mut self, flow: FlowSchema) -> Result<(), FlowError> {
        let ids = self.graph.ids().clone();
        let mut graph = FlowGraph::from_schema(&flow, ids)?;
        branch::reconcile_all(&mut graph);
        self.graph = graph;
        self.flow_id = Some(flow.id);
        self.name = flow.name;
        self.status = flow.status;
        self.version = flow.version;
        self.instance_name = flow.instance_name;
        self.triggers = flow.triggers;
        self.settings = flow.settings;
        // the canonical copy may have renumbered anything; stale selection
        // is worse than none
        if let Some(node_id) = self.selection.node.clone() {
            if !self.graph.contains_node(&node_id) {
                self.clear_selection();
            }
        }
        if let Some(edge_id) = self.selection.edge.clone() {
            if self.graph.edge(&edge_id).is_none() {
                self.clear_selection();
            }
        }
        Ok(())
    }

    fn mutated(&mut self, op: impl FnOnce(&mut FlowGraph) -> bool) -> bool {
        let changed = op(&mut self.graph);
        if changed {
            self.dirty = true;
        }
        changed
    }

    fn mutated_opt(&mut self, op: impl FnOnce(&mut FlowGraph) -> Option<String>) -> Option<String> {
        let result = op(&mut self.graph);
        if result.is_some() {
            self.dirty = true;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::SequentialIdGenerator;
    use crate::session::store::MemoryFlowStore;

    fn session() -> FlowSession {
        FlowSession::scaffold_with_ids(
            Arc::new(MemoryFlowStore::new()),
            "Test flow",
            "main",
            Arc::new(SequentialIdGenerator::new("id")),
        )
    }

    #[test]
    fn test_scaffold_seeds_one_node() {
        let session = session();
        assert_eq!(session.graph().nodes().len(), 1);
        assert_eq!(session.graph().nodes()[0].kind(), NodeKind::Message);
        assert!(session.is_dirty());
        assert!(session.flow_id().is_none());
    }

    #[test]
    fn test_selection_is_exclusive() {
        let mut session = session();
        let a = session.add_node(NodeKind::Delay, Position::default());
        let seed = session.graph().nodes()[0].id.clone();
        let edge = session.connect(&seed, &a).unwrap();

        session.select_node(&a);
        assert!(session.panel_open());
        assert_eq!(session.selection().node.as_deref(), Some(a.as_str()));

        session.select_edge(&edge);
        assert_eq!(session.selection().node, None);
        assert_eq!(session.selection().edge.as_deref(), Some(edge.as_str()));
        assert!(!session.panel_open());
    }

    #[test]
    fn test_selecting_unknown_ids_is_ignored() {
        let mut session = session();
        session.select_node("ghost");
        assert_eq!(session.selection(), &Selection::default());
    }

    #[test]
    fn test_delete_shortcut_respects_text_focus() {
        let mut session = session();
        let seed = session.graph().nodes()[0].id.clone();
        session.select_node(&seed);

        assert!(!session.shortcut(Shortcut::DeleteSelection, true));
        assert_eq!(session.graph().nodes().len(), 1);

        assert!(session.shortcut(Shortcut::DeleteSelection, false));
        assert!(session.graph().nodes().is_empty());
        assert_eq!(session.selection(), &Selection::default());
    }

    #[test]
    fn test_clone_shortcut_selects_the_copy() {
        let mut session = session();
        let seed = session.graph().nodes()[0].id.clone();
        session.select_node(&seed);

        assert!(session.shortcut(Shortcut::CloneNode, false));
        assert_eq!(session.graph().nodes().len(), 2);
        let selected = session.selection().node.clone().unwrap();
        assert_ne!(selected, seed);
    }

    #[test]
    fn test_removing_selected_edge_clears_selection() {
        let mut session = session();
        let a = session.add_node(NodeKind::Delay, Position::default());
        let seed = session.graph().nodes()[0].id.clone();
        let edge = session.connect(&seed, &a).unwrap();
        session.select_edge(&edge);

        assert!(session.remove_edge(&edge));
        assert_eq!(session.selection(), &Selection::default());
    }
}
