//! The two inverse mapping functions and their display derivations.

use std::collections::HashMap;

use crate::model::config::{NodeConfig, NodeKind};
use crate::model::graph::{FlowEdge, FlowGraph, FlowNode, DEFAULT_HANDLE};
use crate::model::schema::EdgeData;

use super::types::{SourceHandle, ViewEdge, ViewNode};

/// Single implicit output handle of non-branching nodes.
const SOURCE_HANDLE: &str = "source";

pub fn node_to_view(node: &FlowNode) -> ViewNode {
    node_to_view_with(node, None)
}

/// Like [`node_to_view`], with a mass-dispatch template id→name lookup used
/// to show template names instead of raw ids in dispatch subtitles.
pub fn node_to_view_with(
    node: &FlowNode,
    dispatch_names: Option<&HashMap<String, String>>,
) -> ViewNode {
    ViewNode {
        id: node.id.clone(),
        kind: node.kind(),
        label: node.name.clone(),
        subtitle: subtitle(node, dispatch_names),
        position: node.position,
        config: node.config.clone(),
        handles: handles(node),
    }
}

/// Strip the presentational fields back off.
pub fn view_to_node(view: &ViewNode) -> FlowNode {
    FlowNode {
        id: view.id.clone(),
        name: view.label.clone(),
        position: view.position,
        config: view.config.clone(),
    }
}

pub fn edge_to_view(edge: &FlowEdge, graph: &FlowGraph) -> ViewEdge {
    let from_condition = graph
        .node(&edge.source)
        .map(|n| n.kind() == NodeKind::Condition)
        .unwrap_or(false);
    ViewEdge {
        id: edge.id.clone(),
        source: edge.source.clone(),
        target: edge.target.clone(),
        source_handle: edge.source_handle.clone(),
        branch_id: edge.data.branch_id.clone(),
        label: edge_label(edge, graph),
        animated: from_condition,
    }
}

pub fn view_to_edge(view: &ViewEdge) -> FlowEdge {
    FlowEdge {
        id: view.id.clone(),
        source: view.source.clone(),
        target: view.target.clone(),
        source_handle: view.source_handle.clone(),
        data: EdgeData {
            branch_id: view.branch_id.clone(),
        },
    }
}

pub fn graph_to_view(graph: &FlowGraph) -> (Vec<ViewNode>, Vec<ViewEdge>) {
    graph_to_view_with(graph, None)
}

pub fn graph_to_view_with(
    graph: &FlowGraph,
    dispatch_names: Option<&HashMap<String, String>>,
) -> (Vec<ViewNode>, Vec<ViewEdge>) {
    (
        graph
            .nodes()
            .iter()
            .map(|n| node_to_view_with(n, dispatch_names))
            .collect(),
        graph
            .edges()
            .iter()
            .map(|e| edge_to_view(e, graph))
            .collect(),
    )
}

/// Handle geometry. A condition node with `k` rules exposes `k + 1` handles,
/// evenly spaced: one per rule in list order, then the default handle.
/// Terminal nodes expose none; everything else a single centered handle.
fn handles(node: &FlowNode) -> Vec<SourceHandle> {
    match &node.config {
        NodeConfig::Condition(cfg) => {
            let count = cfg.rules.len() + 1;
            cfg.rules
                .iter()
                .map(|r| r.id.as_str())
                .chain(std::iter::once(DEFAULT_HANDLE))
                .enumerate()
                .map(|(i, id)| SourceHandle {
                    id: id.to_string(),
                    offset: (i + 1) as f64 / (count + 1) as f64,
                })
                .collect()
        }
        NodeConfig::Terminal(_) => Vec::new(),
        _ => vec![SourceHandle {
            id: SOURCE_HANDLE.to_string(),
            offset: 0.5,
        }],
    }
}

fn subtitle(node: &FlowNode, dispatch_names: Option<&HashMap<String, String>>) -> String {
    match &node.config {
        NodeConfig::Message(cfg) => preview(&cfg.content.text, "Empty message"),
        NodeConfig::Delay(cfg) => match cfg.delay_type {
            crate::model::config::DelayType::Duration => {
                format!("Wait {} {}", cfg.duration, unit_name(cfg.unit, cfg.duration))
            }
            crate::model::config::DelayType::ExactTime => {
                if cfg.exact_time.is_empty() {
                    "Wait until a set time".to_string()
                } else {
                    format!("Wait until {}", cfg.exact_time)
                }
            }
        },
        NodeConfig::Condition(cfg) => match cfg.rules.len() {
            1 => "1 branch".to_string(),
            n => format!("{} branches", n),
        },
        NodeConfig::Webhook(cfg) => {
            if cfg.url.is_empty() {
                "No URL set".to_string()
            } else {
                format!("{} {}", cfg.method, cfg.url)
            }
        }
        NodeConfig::AiReply(cfg) => preview(&cfg.prompt, "No prompt set"),
        NodeConfig::MassDispatch(cfg) => {
            if cfg.template_id.is_empty() {
                "No template selected".to_string()
            } else {
                dispatch_names
                    .and_then(|names| names.get(&cfg.template_id).cloned())
                    .unwrap_or_else(|| format!("Template {}", cfg.template_id))
            }
        }
        NodeConfig::TagMutation(cfg) => {
            format!("+{} / -{} tags", cfg.apply.len(), cfg.remove.len())
        }
        NodeConfig::Terminal(_) => "Ends the conversation".to_string(),
    }
}

fn edge_label(edge: &FlowEdge, graph: &FlowGraph) -> Option<String> {
    match edge.source_handle.as_deref() {
        None => None,
        Some(DEFAULT_HANDLE) => Some("Otherwise".to_string()),
        Some(rule_id) => match graph.node(&edge.source).map(|n| &n.config) {
            Some(NodeConfig::Condition(cfg)) => cfg
                .rules
                .iter()
                .find(|r| r.id == rule_id)
                .map(|r| r.label.clone()),
            _ => None,
        },
    }
}

fn preview(text: &str, empty: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return empty.to_string();
    }
    let mut chars = trimmed.chars();
    let head: String = chars.by_ref().take(40).collect();
    if chars.next().is_some() {
        format!("{}…", head)
    } else {
        head
    }
}

fn unit_name(unit: crate::model::config::DelayUnit, count: u64) -> &'static str {
    use crate::model::config::DelayUnit;
    match (unit, count) {
        (DelayUnit::Seconds, 1) => "second",
        (DelayUnit::Seconds, _) => "seconds",
        (DelayUnit::Minutes, 1) => "minute",
        (DelayUnit::Minutes, _) => "minutes",
        (DelayUnit::Hours, 1) => "hour",
        (DelayUnit::Hours, _) => "hours",
    }
}
