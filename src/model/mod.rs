//! Flow domain model: node/edge containers, typed node configuration, and
//! the persisted JSON shapes.

pub mod config;
pub mod graph;
pub mod ids;
pub mod schema;

pub use config::{NodeConfig, NodeKind};
pub use graph::{FlowEdge, FlowGraph, FlowNode, DEFAULT_HANDLE};
pub use ids::{IdGenerator, SequentialIdGenerator, UuidIdGenerator};
pub use schema::{FlowSchema, FlowStatus, Position};
