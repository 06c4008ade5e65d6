//! Persisted flow and template JSON shapes.
//!
//! These mirror the backend's documents field for field: `_id`, camelCase
//! names, `data` payloads keyed by the node `type`. Conversion to and from
//! the domain model lives in [`crate::model::graph`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ================================
// Flow
// ================================

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlowSchema {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: FlowStatus,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub instance_name: String,
    /// Trigger descriptors are carried opaquely: the builder stores and
    /// copies them but never interprets them.
    #[serde(default)]
    pub triggers: Vec<Value>,
    #[serde(default)]
    pub nodes: Vec<NodeSchema>,
    #[serde(default)]
    pub edges: Vec<EdgeSchema>,
    #[serde(default)]
    pub settings: Value,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FlowStatus {
    #[default]
    Draft,
    Active,
}

fn default_version() -> u32 {
    1
}

// ================================
// Nodes and Edges
// ================================

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct NodeSchema {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: crate::model::config::NodeKind,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub data: Value,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EdgeSchema {
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, alias = "source_handle")]
    pub source_handle: Option<String>,
    #[serde(default)]
    pub data: EdgeData,
}

/// Opaque edge data bag. For edges leaving a condition node it carries the
/// bound branch id, kept equal to the source handle.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct EdgeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,
}

// ================================
// Templates
// ================================

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSchema {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub triggers: Vec<Value>,
    #[serde(default)]
    pub nodes: Vec<NodeSchema>,
    #[serde(default)]
    pub edges: Vec<EdgeSchema>,
    #[serde(default)]
    pub settings: Value,
}

// ================================
// Read-only listings
// ================================

/// Execution history row, consumed for display only.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub flow_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub started_at: String,
    #[serde(default)]
    pub current_node_id: Option<String>,
}

/// Mass-dispatch template lookup row, used to enrich dispatch node subtitles.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DispatchTemplate {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub name: String,
}
