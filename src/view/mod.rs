//! View adapter: lossless mapping between the domain graph and the shape the
//! external canvas component renders.
//!
//! The canvas needs handle geometry, display labels, and subtitles; none of
//! that is part of the persisted model, so the adapter adds it on the way out
//! and strips it on the way back. `view_to_node(node_to_view(n)) == n` holds
//! for every domain node, and likewise for edges.

mod adapter;
mod types;

pub use adapter::{
    edge_to_view, graph_to_view, graph_to_view_with, node_to_view, node_to_view_with,
    view_to_edge, view_to_node,
};
pub use types::{CanvasProbe, ScreenRect, SourceHandle, ViewEdge, ViewNode};
