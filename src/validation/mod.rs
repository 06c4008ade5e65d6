//! Pre-save flow validation.
//!
//! Structural findings (E-codes) abort a save; advisory findings (W-codes)
//! are surfaced but do not block. The branch engine keeps the graph
//! consistent during editing, so error-level findings here normally mean the
//! flow was loaded from an older builder or edited outside the engine.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::config::{DelayType, NodeConfig};
use crate::model::graph::FlowGraph;

/// Longest permitted duration-type wait, in whole units.
pub const MAX_WAIT_TIME: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub code: String,
    pub message: String,
    pub node_id: Option<String>,
    pub edge_id: Option<String>,
    pub field: Option<String>,
}

/// Aggregated result of flow validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Error)
            .collect()
    }

    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Warning)
            .collect()
    }
}

pub fn validate_graph(graph: &FlowGraph) -> ValidationReport {
    let mut diags = Vec::new();

    // --- structure ---

    let mut ids = HashSet::new();
    for node in graph.nodes() {
        if node.id.trim().is_empty() {
            diags.push(error("E001", "Node id is empty", None, None, Some("id")));
        }
        if !ids.insert(node.id.clone()) {
            diags.push(error(
                "E002",
                format!("Duplicate node id: {}", node.id),
                Some(&node.id),
                None,
                None,
            ));
        }
    }

    for edge in graph.edges() {
        if !graph.contains_node(&edge.source) {
            diags.push(error(
                "E003",
                format!("Edge source not found: {}", edge.source),
                None,
                Some(&edge.id),
                Some("source"),
            ));
        }
        if !graph.contains_node(&edge.target) {
            diags.push(error(
                "E004",
                format!("Edge target not found: {}", edge.target),
                None,
                Some(&edge.id),
                Some("target"),
            ));
        }
        if let Some(rule_id) = edge.bound_rule_id() {
            let names_rule = match graph.node(&edge.source).map(|n| &n.config) {
                Some(NodeConfig::Condition(cfg)) => cfg.rules.iter().any(|r| r.id == rule_id),
                Some(_) => false,
                None => continue,
            };
            if !names_rule {
                diags.push(error(
                    "E005",
                    format!("Edge handle names no branch rule: {}", rule_id),
                    None,
                    Some(&edge.id),
                    Some("sourceHandle"),
                ));
            }
        }
    }

    // --- semantics ---

    for node in graph.nodes() {
        if node.name.trim().is_empty() {
            diags.push(warn(
                "W001",
                "Node name is empty",
                Some(&node.id),
                Some("name"),
            ));
        }
        match &node.config {
            NodeConfig::Delay(cfg) => {
                if cfg.delay_type == DelayType::Duration && cfg.duration > MAX_WAIT_TIME {
                    diags.push(error(
                        "E006",
                        format!("Wait time must be between 0 and {}", MAX_WAIT_TIME),
                        Some(&node.id),
                        None,
                        Some("duration"),
                    ));
                }
            }
            NodeConfig::Webhook(cfg) => {
                if cfg.url.trim().is_empty() {
                    diags.push(warn("W002", "Webhook URL is empty", Some(&node.id), Some("url")));
                }
            }
            NodeConfig::Condition(cfg) => {
                if cfg.rules.is_empty() {
                    diags.push(warn(
                        "W003",
                        "Condition node has no branch rules",
                        Some(&node.id),
                        None,
                    ));
                }
                for rule in &cfg.rules {
                    if let Some(next) = &rule.next_node_id {
                        if !graph.contains_node(next) {
                            diags.push(warn(
                                "W004",
                                format!("Branch points at a missing node: {}", next),
                                Some(&node.id),
                                Some("nextNodeId"),
                            ));
                        }
                    }
                }
            }
            _ => {}
        }
    }

    let is_valid = diags.iter().all(|d| d.level != DiagnosticLevel::Error);
    ValidationReport {
        is_valid,
        diagnostics: diags,
    }
}

fn error(
    code: &str,
    message: impl Into<String>,
    node_id: Option<&str>,
    edge_id: Option<&str>,
    field: Option<&str>,
) -> Diagnostic {
    Diagnostic {
        level: DiagnosticLevel::Error,
        code: code.to_string(),
        message: message.into(),
        node_id: node_id.map(str::to_string),
        edge_id: edge_id.map(str::to_string),
        field: field.map(str::to_string),
    }
}

fn warn(
    code: &str,
    message: impl Into<String>,
    node_id: Option<&str>,
    field: Option<&str>,
) -> Diagnostic {
    Diagnostic {
        level: DiagnosticLevel::Warning,
        code: code.to_string(),
        message: message.into(),
        node_id: node_id.map(str::to_string),
        edge_id: None,
        field: field.map(str::to_string),
    }
}
