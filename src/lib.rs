//! # MindClerky Flow Builder Core
//!
//! `mindclerky` is the graph core of the MindClerky visual automation builder:
//! the in-memory flow model, the persisted-flow mapping, and the engine that
//! keeps a condition node's branch rules and its outgoing edges describing the
//! same routing table while the user edits freely.
//!
//! - **Model**: nodes and edges with stable string identities, a closed
//!   [`NodeKind`] set, and one typed configuration payload per kind.
//! - **Branch engine**: every structural mutation (connect, disconnect, node
//!   removal, rule edits, retyping) goes through [`branch`], which re-derives
//!   branch bindings, compiled predicate expressions, and labels afterwards.
//! - **View adapter**: lossless conversion between the domain graph and the
//!   canvas-renderable shape, including per-branch handle geometry.
//! - **Session**: load/save/template orchestration against the persistence
//!   API behind the [`FlowStore`] trait, plus selection and shortcut handling.
//!
//! # Quick Start
//!
//! ```rust
//! use mindclerky::{branch, FlowGraph, NodeKind, Position};
//!
//! let mut graph = FlowGraph::new();
//! let cond = graph.add_node(NodeKind::Condition, Position { x: 0.0, y: 0.0 });
//! let reply = graph.add_node(NodeKind::Message, Position { x: 240.0, y: 0.0 });
//!
//! // Connecting from a condition node binds the first free branch rule.
//! let edge = branch::connect(&mut graph, &cond, &reply);
//! assert!(edge.is_some());
//! ```

pub mod branch;
pub mod error;
pub mod model;
pub mod session;
pub mod validation;
pub mod view;

pub use crate::error::FlowError;
pub use crate::model::config::{
    AiReplyConfig, CompiledExpression, ConditionConfig, ConditionRule, DelayConfig, DelayType,
    DelayUnit, DispatchSettings, DispatchSpeed, HttpMethod, KeyValuePair, MassDispatchConfig,
    MessageConfig, MessageContent, NodeConfig, NodeKind, PredicateKind, TagMutationConfig,
    TerminalConfig, ValueContract, WebhookConfig, MESSAGE_TYPE_OPTIONS,
};
pub use crate::model::graph::{FlowEdge, FlowGraph, FlowNode, DEFAULT_HANDLE};
pub use crate::model::ids::{IdGenerator, SequentialIdGenerator, UuidIdGenerator};
pub use crate::model::schema::{
    DispatchTemplate, EdgeData, EdgeSchema, ExecutionSummary, FlowSchema, FlowStatus, NodeSchema,
    Position, TemplateSchema,
};
pub use crate::session::{
    FlowSession, FlowStore, HttpFlowStore, MemoryFlowStore, Selection, Shortcut,
};
pub use crate::validation::{validate_graph, Diagnostic, DiagnosticLevel, ValidationReport};
pub use crate::view::{
    edge_to_view, graph_to_view, node_to_view, view_to_edge, view_to_node, CanvasProbe,
    ScreenRect, SourceHandle, ViewEdge, ViewNode,
};
