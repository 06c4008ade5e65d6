//! Canvas-facing record types.

use crate::model::config::{NodeConfig, NodeKind};
use crate::model::schema::Position;

/// A node as the canvas renders it: the domain node plus display metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewNode {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    /// One-line summary under the label, derived from the config.
    pub subtitle: String,
    pub position: Position,
    pub config: NodeConfig,
    /// Outgoing connection points, top to bottom.
    pub handles: Vec<SourceHandle>,
}

/// A named connection point on a node's output side.
///
/// `offset` is the handle's fractional vertical position in `(0, 1)`; the
/// canvas multiplies it by the rendered node height. Purely presentational.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceHandle {
    pub id: String,
    pub offset: f64,
}

/// An edge as the canvas renders it.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_handle: Option<String>,
    pub branch_id: Option<String>,
    /// Branch label shown along the wire, for condition-sourced edges.
    pub label: Option<String>,
    pub animated: bool,
}

/// Screen-space rectangle reported by the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Capability implemented by the external canvas component.
///
/// The session asks it where a node sits on screen (popover anchoring); the
/// core never queries any rendering surface itself.
pub trait CanvasProbe: Send + Sync {
    fn node_rect(&self, node_id: &str) -> Option<ScreenRect>;
}
