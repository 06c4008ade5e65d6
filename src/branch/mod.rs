//! Branch-consistency engine.
//!
//! A condition node's rule list and its outgoing edges describe the same
//! routing table. The user can break that agreement from either side: by
//! rewiring edges or by editing rules. Every mutation entry point in this
//! module re-establishes the invariants afterwards, so callers never see a
//! rule whose `next_node_id` disagrees with the edge set.

mod compile;
mod engine;

pub use compile::{coerce_value, compile, derived_label};
pub use engine::{
    add_rule, clone_node, connect, connect_to_handle, reconcile, reconcile_all, remove_edge,
    remove_node, remove_rule, retype_node, retype_rule, set_rule_label, set_rule_value,
};
