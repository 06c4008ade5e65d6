//! Structural mutation entry points and the consistency pass.
//!
//! All operations here are total over the given graph state: unknown node,
//! edge, or rule ids make the operation a no-op that returns `false`/`None`.
//! There is no fallible I/O inside the engine, so nothing raises.

use crate::model::config::{ConditionRule, NodeConfig, NodeKind, PredicateKind};
use crate::model::graph::{FlowGraph, FlowNode, DEFAULT_HANDLE};
use crate::model::schema::{EdgeData, Position};

use super::compile::{coerce_value, compile, derived_label};

/// Re-derive a condition node's rule list from the current graph state.
///
/// For each rule, in list order: coerce the value into the kind's contract,
/// recompile the predicate expression, re-derive the label unless the user
/// overrode it, and recompute `next_node_id` from the edge bound to the rule.
/// The rule list is replaced only when something actually changed, so
/// downstream change notifications stay quiet on redundant passes.
///
/// Returns `true` when the stored rules were updated. Non-condition nodes
/// and unknown ids return `false`.
pub fn reconcile(graph: &mut FlowGraph, node_id: &str) -> bool {
    let rules = match graph.node(node_id).map(|n| &n.config) {
        Some(NodeConfig::Condition(cfg)) => cfg.rules.clone(),
        _ => return false,
    };

    let mut next = rules.clone();
    for rule in &mut next {
        rule.value = coerce_value(rule.kind, &rule.value);
        rule.expression = compile(rule.kind, &rule.value);
        if !rule.custom_label {
            rule.label = derived_label(rule.kind, &rule.value);
        }
        rule.next_node_id = graph
            .edge_bound_to_rule(node_id, &rule.id)
            .map(|e| e.target.clone());
    }

    if next == rules {
        return false;
    }
    if let Some(node) = graph.node_mut(node_id) {
        if let NodeConfig::Condition(cfg) = &mut node.config {
            cfg.rules = next;
        }
    }
    tracing::debug!(node_id, "branch rules reconciled");
    true
}

/// Run the consistency pass over every condition node. Returns how many
/// nodes were updated.
pub fn reconcile_all(graph: &mut FlowGraph) -> usize {
    let condition_ids: Vec<String> = graph
        .nodes()
        .iter()
        .filter(|n| n.kind() == NodeKind::Condition)
        .map(|n| n.id.clone())
        .collect();
    condition_ids
        .iter()
        .filter(|id| reconcile(graph, id))
        .count()
}

/// Connect two nodes from the source's generic anchor.
///
/// For condition sources this picks the first rule not already bound to an
/// edge. When every rule is occupied the first rule is reused and its
/// previous edge is dropped, so dropping one more wire on a fully wired
/// condition silently rewires the first branch. Returns the new edge id, or
/// `None` when either endpoint is unknown.
pub fn connect(graph: &mut FlowGraph, source: &str, target: &str) -> Option<String> {
    match graph.node(source).map(|n| n.kind()) {
        Some(NodeKind::Condition) => connect_condition(graph, source, target, None),
        Some(_) => graph.add_edge(source, target, None, EdgeData::default()),
        None => None,
    }
}

/// Connect two nodes through a specific source handle.
///
/// Non-condition sources have a single implicit handle, so the handle
/// argument is ignored for them. For condition sources the handle must name
/// an existing rule or [`DEFAULT_HANDLE`]; anything else is a no-op.
pub fn connect_to_handle(
    graph: &mut FlowGraph,
    source: &str,
    target: &str,
    handle: Option<&str>,
) -> Option<String> {
    match graph.node(source).map(|n| n.kind()) {
        Some(NodeKind::Condition) => connect_condition(graph, source, target, handle),
        Some(_) => graph.add_edge(source, target, None, EdgeData::default()),
        None => None,
    }
}

fn connect_condition(
    graph: &mut FlowGraph,
    source: &str,
    target: &str,
    handle: Option<&str>,
) -> Option<String> {
    if !graph.contains_node(target) {
        return None;
    }
    let rule_ids: Vec<String> = match graph.node(source).map(|n| &n.config) {
        Some(NodeConfig::Condition(cfg)) => cfg.rules.iter().map(|r| r.id.clone()).collect(),
        _ => return None,
    };

    let chosen = match handle {
        Some(DEFAULT_HANDLE) => DEFAULT_HANDLE.to_string(),
        Some(explicit) => {
            if !rule_ids.iter().any(|id| id == explicit) {
                tracing::warn!(source, handle = explicit, "connect to unknown branch handle");
                return None;
            }
            explicit.to_string()
        }
        None if rule_ids.is_empty() => DEFAULT_HANDLE.to_string(),
        None => match rule_ids
            .iter()
            .find(|id| graph.edge_bound_to_rule(source, id).is_none())
        {
            Some(free) => free.clone(),
            // Every branch is occupied: reuse the first rule. The previous
            // wiring of that branch is overwritten.
            None => rule_ids.first()?.clone(),
        },
    };

    // One edge per handle: a new wire on an occupied handle replaces the
    // old one rather than stacking a second edge onto the same branch.
    let superseded: Vec<String> = graph
        .edges_from(source)
        .iter()
        .filter(|e| e.source_handle.as_deref() == Some(chosen.as_str()))
        .map(|e| e.id.clone())
        .collect();
    for edge_id in superseded {
        tracing::debug!(source, handle = %chosen, edge_id = %edge_id, "branch rewired, dropping old edge");
        graph.remove_edge(&edge_id);
    }

    let edge_id = graph.add_edge(
        source,
        target,
        Some(chosen.clone()),
        EdgeData {
            branch_id: Some(chosen),
        },
    );
    reconcile(graph, source);
    edge_id
}

/// Remove an edge. When the edge left a condition node, the rule bound to
/// it keeps existing but loses its `next_node_id`.
pub fn remove_edge(graph: &mut FlowGraph, edge_id: &str) -> bool {
    match graph.remove_edge(edge_id) {
        Some(edge) => {
            reconcile(graph, &edge.source);
            true
        }
        None => false,
    }
}

/// Remove a node and every edge incident to it, then repair the branch
/// caches of any condition node that was wired into it.
pub fn remove_node(graph: &mut FlowGraph, node_id: &str) -> bool {
    if !graph.contains_node(node_id) {
        return false;
    }
    let removed_edges = graph.remove_node(node_id);
    let mut affected: Vec<String> = removed_edges
        .iter()
        .filter(|e| e.source != node_id)
        .map(|e| e.source.clone())
        .collect();
    affected.sort();
    affected.dedup();
    for source in affected {
        reconcile(graph, &source);
    }
    true
}

/// Replace a node's config with the new kind's factory default.
///
/// No field migration is attempted; the previous payload is discarded even
/// when both kinds share fields. Retyping away from `condition` destroys
/// its rules, and the rule-removal cascade applies: edges bound to the
/// destroyed rules are removed. Other edges stay in place.
pub fn retype_node(graph: &mut FlowGraph, node_id: &str, kind: NodeKind) -> bool {
    let was_condition = match graph.node(node_id) {
        Some(node) => node.kind() == NodeKind::Condition,
        None => return false,
    };
    let ids = graph.ids().clone();
    graph.set_node_config(node_id, NodeConfig::default_for(kind, ids.as_ref()));

    if was_condition {
        let stale: Vec<String> = graph
            .edges_from(node_id)
            .iter()
            .filter(|e| match e.source_handle.as_deref() {
                None => false,
                // the default handle survives a condition-to-condition reset
                Some(DEFAULT_HANDLE) => kind != NodeKind::Condition,
                // old rule ids exist in neither the new config nor any other
                Some(_) => true,
            })
            .map(|e| e.id.clone())
            .collect();
        for edge_id in stale {
            graph.remove_edge(&edge_id);
        }
    }

    reconcile(graph, node_id);
    true
}

/// Append a fresh branch rule to a condition node. Returns the new rule id.
pub fn add_rule(graph: &mut FlowGraph, node_id: &str) -> Option<String> {
    let ids = graph.ids().clone();
    let node = graph.node_mut(node_id)?;
    let NodeConfig::Condition(cfg) = &mut node.config else {
        return None;
    };
    let kind = PredicateKind::TextContains;
    let rule = ConditionRule {
        id: ids.next_id(),
        kind,
        value: String::new(),
        expression: compile(kind, ""),
        label: derived_label(kind, ""),
        custom_label: false,
        next_node_id: None,
    };
    let rule_id = rule.id.clone();
    cfg.rules.push(rule);
    Some(rule_id)
}

/// Remove a branch rule and any edge currently bound to it.
pub fn remove_rule(graph: &mut FlowGraph, node_id: &str, rule_id: &str) -> bool {
    if !rule_exists(graph, node_id, rule_id) {
        return false;
    }
    for edge_id in bound_edge_ids(graph, node_id, rule_id) {
        graph.remove_edge(&edge_id);
    }
    if let Some(node) = graph.node_mut(node_id) {
        if let NodeConfig::Condition(cfg) = &mut node.config {
            cfg.rules.retain(|r| r.id != rule_id);
        }
    }
    reconcile(graph, node_id);
    true
}

/// Change a rule's predicate kind.
///
/// The value resets to a kind-appropriate default, the expression and
/// derived label are recomputed, and the old wiring is dropped: the edge
/// bound to the rule is removed and `next_node_id` cleared, because a
/// predicate of a different kind routes different traffic and the user must
/// re-make the connection deliberately.
pub fn retype_rule(
    graph: &mut FlowGraph,
    node_id: &str,
    rule_id: &str,
    kind: PredicateKind,
) -> bool {
    let current = rule_kind(graph, node_id, rule_id);
    match current {
        Some(existing) if existing != kind => {}
        _ => return false,
    }
    for edge_id in bound_edge_ids(graph, node_id, rule_id) {
        graph.remove_edge(&edge_id);
    }
    if let Some(node) = graph.node_mut(node_id) {
        if let NodeConfig::Condition(cfg) = &mut node.config {
            if let Some(rule) = cfg.rules.iter_mut().find(|r| r.id == rule_id) {
                rule.kind = kind;
                rule.value = coerce_value(kind, "");
                rule.next_node_id = None;
            }
        }
    }
    reconcile(graph, node_id);
    true
}

/// Set a rule's predicate value. The consistency pass coerces it into the
/// kind's contract and recompiles the expression.
pub fn set_rule_value(graph: &mut FlowGraph, node_id: &str, rule_id: &str, value: &str) -> bool {
    if !rule_exists(graph, node_id, rule_id) {
        return false;
    }
    if let Some(node) = graph.node_mut(node_id) {
        if let NodeConfig::Condition(cfg) = &mut node.config {
            if let Some(rule) = cfg.rules.iter_mut().find(|r| r.id == rule_id) {
                rule.value = value.to_string();
            }
        }
    }
    reconcile(graph, node_id);
    true
}

/// Override a rule's label, or pass `None` to revert to the derived one.
pub fn set_rule_label(
    graph: &mut FlowGraph,
    node_id: &str,
    rule_id: &str,
    label: Option<&str>,
) -> bool {
    if !rule_exists(graph, node_id, rule_id) {
        return false;
    }
    if let Some(node) = graph.node_mut(node_id) {
        if let NodeConfig::Condition(cfg) = &mut node.config {
            if let Some(rule) = cfg.rules.iter_mut().find(|r| r.id == rule_id) {
                match label {
                    Some(text) => {
                        rule.custom_label = true;
                        rule.label = text.to_string();
                    }
                    None => {
                        rule.custom_label = false;
                    }
                }
            }
        }
    }
    reconcile(graph, node_id);
    true
}

/// Duplicate a node next to the original. Condition rules get fresh ids and
/// no bindings; incident edges are not cloned.
pub fn clone_node(graph: &mut FlowGraph, node_id: &str) -> Option<String> {
    let original = graph.node(node_id)?.clone();
    let ids = graph.ids().clone();
    let new_id = ids.next_id();

    let config = match original.config {
        NodeConfig::Condition(cfg) => NodeConfig::Condition(crate::model::config::ConditionConfig {
            rules: cfg
                .rules
                .into_iter()
                .map(|rule| ConditionRule {
                    id: ids.next_id(),
                    next_node_id: None,
                    ..rule
                })
                .collect(),
        }),
        other => other,
    };

    graph.insert_node(FlowNode {
        id: new_id.clone(),
        name: original.name,
        position: Position {
            x: original.position.x + 48.0,
            y: original.position.y + 48.0,
        },
        config,
    });
    Some(new_id)
}

// --- helpers ---

fn rule_exists(graph: &FlowGraph, node_id: &str, rule_id: &str) -> bool {
    rule_kind(graph, node_id, rule_id).is_some()
}

fn rule_kind(graph: &FlowGraph, node_id: &str, rule_id: &str) -> Option<PredicateKind> {
    match graph.node(node_id).map(|n| &n.config) {
        Some(NodeConfig::Condition(cfg)) => {
            cfg.rules.iter().find(|r| r.id == rule_id).map(|r| r.kind)
        }
        _ => None,
    }
}

fn bound_edge_ids(graph: &FlowGraph, node_id: &str, rule_id: &str) -> Vec<String> {
    graph
        .edges_from(node_id)
        .iter()
        .filter(|e| e.bound_rule_id() == Some(rule_id))
        .map(|e| e.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::{CompiledExpression, ConditionConfig};
    use crate::model::ids::SequentialIdGenerator;
    use std::sync::Arc;

    fn test_graph() -> FlowGraph {
        FlowGraph::with_ids(Arc::new(SequentialIdGenerator::new("id")))
    }

    fn rules(graph: &FlowGraph, node_id: &str) -> Vec<ConditionRule> {
        match &graph.node(node_id).unwrap().config {
            NodeConfig::Condition(cfg) => cfg.rules.clone(),
            other => panic!("not a condition node: {:?}", other),
        }
    }

    fn condition_with_targets(graph: &mut FlowGraph) -> (String, String, String) {
        let cond = graph.add_node(NodeKind::Condition, Position::default());
        let t1 = graph.add_node(NodeKind::Message, Position::default());
        let t2 = graph.add_node(NodeKind::Message, Position::default());
        (cond, t1, t2)
    }

    #[test]
    fn test_connect_binds_first_free_rule_then_second() {
        let mut graph = test_graph();
        let (cond, t1, t2) = condition_with_targets(&mut graph);

        connect(&mut graph, &cond, &t1).unwrap();
        let r = rules(&graph, &cond);
        assert_eq!(r[0].next_node_id.as_deref(), Some(t1.as_str()));
        assert_eq!(r[1].next_node_id, None);

        connect(&mut graph, &cond, &t2).unwrap();
        let r = rules(&graph, &cond);
        assert_eq!(r[0].next_node_id.as_deref(), Some(t1.as_str()));
        assert_eq!(r[1].next_node_id.as_deref(), Some(t2.as_str()));

        // edges carry the rule id as handle and branch tag
        for edge in graph.edges() {
            assert_eq!(edge.source_handle, edge.data.branch_id);
        }
    }

    #[test]
    fn test_connect_when_all_rules_bound_reuses_first() {
        let mut graph = test_graph();
        let (cond, t1, t2) = condition_with_targets(&mut graph);
        let t3 = graph.add_node(NodeKind::Terminal, Position::default());

        connect(&mut graph, &cond, &t1);
        connect(&mut graph, &cond, &t2);
        connect(&mut graph, &cond, &t3);

        let r = rules(&graph, &cond);
        assert_eq!(r[0].next_node_id.as_deref(), Some(t3.as_str()));
        assert_eq!(r[1].next_node_id.as_deref(), Some(t2.as_str()));
        // the superseded edge is gone: one edge per rule
        assert_eq!(graph.edges_from(&cond).len(), 2);
    }

    #[test]
    fn test_connect_to_default_handle() {
        let mut graph = test_graph();
        let (cond, t1, _) = condition_with_targets(&mut graph);

        let edge_id = connect_to_handle(&mut graph, &cond, &t1, Some(DEFAULT_HANDLE)).unwrap();
        let edge = graph.edge(&edge_id).unwrap();
        assert_eq!(edge.source_handle.as_deref(), Some(DEFAULT_HANDLE));
        assert_eq!(edge.data.branch_id.as_deref(), Some(DEFAULT_HANDLE));
        // no rule binding happened
        assert!(rules(&graph, &cond).iter().all(|r| r.next_node_id.is_none()));
    }

    #[test]
    fn test_connect_to_unknown_handle_is_noop() {
        let mut graph = test_graph();
        let (cond, t1, _) = condition_with_targets(&mut graph);
        assert!(connect_to_handle(&mut graph, &cond, &t1, Some("ghost-rule")).is_none());
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn test_connect_to_occupied_handle_replaces_edge() {
        let mut graph = test_graph();
        let (cond, t1, t2) = condition_with_targets(&mut graph);
        let rule_id = rules(&graph, &cond)[0].id.clone();

        connect_to_handle(&mut graph, &cond, &t1, Some(&rule_id)).unwrap();
        connect_to_handle(&mut graph, &cond, &t2, Some(&rule_id)).unwrap();

        assert_eq!(graph.edges_from(&cond).len(), 1);
        assert_eq!(
            rules(&graph, &cond)[0].next_node_id.as_deref(),
            Some(t2.as_str())
        );
    }

    #[test]
    fn test_remove_edge_unbinds_rule_but_keeps_it() {
        let mut graph = test_graph();
        let (cond, t1, _) = condition_with_targets(&mut graph);
        let edge_id = connect(&mut graph, &cond, &t1).unwrap();

        assert!(remove_edge(&mut graph, &edge_id));
        let r = rules(&graph, &cond);
        assert_eq!(r.len(), 2);
        assert_eq!(r[0].next_node_id, None);
    }

    #[test]
    fn test_remove_target_node_clears_binding() {
        let mut graph = test_graph();
        let (cond, t1, t2) = condition_with_targets(&mut graph);
        connect(&mut graph, &cond, &t1);
        connect(&mut graph, &cond, &t2);

        assert!(remove_node(&mut graph, &t1));
        assert!(graph.edges_from(&cond).len() == 1);
        let r = rules(&graph, &cond);
        assert_eq!(r[0].next_node_id, None);
        assert_eq!(r[1].next_node_id.as_deref(), Some(t2.as_str()));
    }

    #[test]
    fn test_remove_rule_drops_bound_edge() {
        let mut graph = test_graph();
        let (cond, t1, _) = condition_with_targets(&mut graph);
        connect(&mut graph, &cond, &t1);
        let rule_id = rules(&graph, &cond)[0].id.clone();

        assert!(remove_rule(&mut graph, &cond, &rule_id));
        assert_eq!(rules(&graph, &cond).len(), 1);
        assert!(graph.edges_from(&cond).is_empty());
    }

    #[test]
    fn test_retype_rule_resets_value_and_unwires() {
        let mut graph = test_graph();
        let (cond, t1, _) = condition_with_targets(&mut graph);
        connect(&mut graph, &cond, &t1);
        let rule_id = rules(&graph, &cond)[0].id.clone();

        assert!(retype_rule(
            &mut graph,
            &cond,
            &rule_id,
            PredicateKind::MessageTypeIs
        ));
        let rule = rules(&graph, &cond)[0].clone();
        assert_eq!(rule.kind, PredicateKind::MessageTypeIs);
        assert_eq!(rule.value, "text");
        assert_eq!(rule.label, "Message is text");
        assert_eq!(rule.next_node_id, None);
        assert_eq!(
            rule.expression,
            Some(CompiledExpression::MessageTypeIs {
                value: "text".into()
            })
        );
        assert!(graph.edges_from(&cond).is_empty());
    }

    #[test]
    fn test_retype_rule_to_same_kind_is_noop() {
        let mut graph = test_graph();
        let (cond, t1, _) = condition_with_targets(&mut graph);
        connect(&mut graph, &cond, &t1);
        let rule_id = rules(&graph, &cond)[0].id.clone();

        assert!(!retype_rule(
            &mut graph,
            &cond,
            &rule_id,
            PredicateKind::TextContains
        ));
        // wiring untouched
        assert_eq!(graph.edges_from(&cond).len(), 1);
    }

    #[test]
    fn test_retype_rule_to_valueless_kind_clears_expression() {
        let mut graph = test_graph();
        let (cond, _, _) = condition_with_targets(&mut graph);
        let rule_id = rules(&graph, &cond)[0].id.clone();

        retype_rule(&mut graph, &cond, &rule_id, PredicateKind::AffirmativeReply);
        let rule = rules(&graph, &cond)[0].clone();
        assert_eq!(rule.value, "");
        assert_eq!(rule.expression, None);
        assert_eq!(rule.label, "Affirmative reply");
    }

    #[test]
    fn test_set_rule_value_recompiles_and_relabels() {
        let mut graph = test_graph();
        let (cond, _, _) = condition_with_targets(&mut graph);
        let rule_id = rules(&graph, &cond)[0].id.clone();

        set_rule_value(&mut graph, &cond, &rule_id, "stop");
        let rule = rules(&graph, &cond)[0].clone();
        assert_eq!(rule.value, "stop");
        assert_eq!(rule.label, "Contains \"stop\"");
        assert_eq!(
            rule.expression,
            Some(CompiledExpression::Contains {
                text: "stop".into()
            })
        );
    }

    #[test]
    fn test_custom_label_survives_reconciliation() {
        let mut graph = test_graph();
        let (cond, t1, _) = condition_with_targets(&mut graph);
        let rule_id = rules(&graph, &cond)[0].id.clone();

        set_rule_label(&mut graph, &cond, &rule_id, Some("VIP path"));
        set_rule_value(&mut graph, &cond, &rule_id, "vip");
        connect(&mut graph, &cond, &t1);

        let rule = rules(&graph, &cond)[0].clone();
        assert_eq!(rule.label, "VIP path");
        assert!(rule.custom_label);

        // reverting the override re-derives on the next pass
        set_rule_label(&mut graph, &cond, &rule_id, None);
        let rule = rules(&graph, &cond)[0].clone();
        assert_eq!(rule.label, "Contains \"vip\"");
    }

    #[test]
    fn test_reconcile_coerces_enumerated_value() {
        let mut graph = test_graph();
        let cond = graph.add_node(NodeKind::Condition, Position::default());
        // simulate a stale persisted value that is no longer a legal option
        if let Some(node) = graph.node_mut(&cond) {
            if let NodeConfig::Condition(cfg) = &mut node.config {
                cfg.rules[0].kind = PredicateKind::MessageTypeIs;
                cfg.rules[0].value = "bogus".into();
            }
        }
        assert!(reconcile(&mut graph, &cond));
        assert_eq!(rules(&graph, &cond)[0].value, "text");
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut graph = test_graph();
        let (cond, t1, _) = condition_with_targets(&mut graph);
        connect(&mut graph, &cond, &t1);
        assert!(!reconcile(&mut graph, &cond));
        assert!(!reconcile(&mut graph, &cond));
    }

    #[test]
    fn test_reconcile_all_reports_updates() {
        let mut graph = test_graph();
        let cond_a = graph.add_node(NodeKind::Condition, Position::default());
        let _cond_b = graph.add_node(NodeKind::Condition, Position::default());
        // break one node's cache by hand
        if let Some(node) = graph.node_mut(&cond_a) {
            if let NodeConfig::Condition(cfg) = &mut node.config {
                cfg.rules[0].next_node_id = Some("vanished".into());
            }
        }
        assert_eq!(reconcile_all(&mut graph), 1);
        assert_eq!(reconcile_all(&mut graph), 0);
    }

    #[test]
    fn test_retype_node_resets_config() {
        let mut graph = test_graph();
        let node = graph.add_node(NodeKind::Message, Position::default());
        if let Some(n) = graph.node_mut(&node) {
            if let NodeConfig::Message(cfg) = &mut n.config {
                cfg.content.text = "about to vanish".into();
            }
        }
        assert!(retype_node(&mut graph, &node, NodeKind::Webhook));
        let ids = graph.ids().clone();
        assert_eq!(
            graph.node(&node).unwrap().config,
            NodeConfig::default_for(NodeKind::Webhook, ids.as_ref())
        );
    }

    #[test]
    fn test_retype_away_from_condition_drops_rule_edges() {
        let mut graph = test_graph();
        let (cond, t1, t2) = condition_with_targets(&mut graph);
        connect(&mut graph, &cond, &t1);
        connect_to_handle(&mut graph, &cond, &t2, Some(DEFAULT_HANDLE));
        let incoming_src = graph.add_node(NodeKind::Message, Position::default());
        connect(&mut graph, &incoming_src, &cond);

        assert!(retype_node(&mut graph, &cond, NodeKind::Message));
        // rule-bound and default edges are gone, the incoming edge stays
        assert!(graph.edges_from(&cond).is_empty());
        assert_eq!(graph.edges_to(&cond).len(), 1);
    }

    #[test]
    fn test_retype_node_to_condition_seeds_unbound_rules() {
        let mut graph = test_graph();
        let a = graph.add_node(NodeKind::Message, Position::default());
        let b = graph.add_node(NodeKind::Terminal, Position::default());
        connect(&mut graph, &a, &b);

        assert!(retype_node(&mut graph, &a, NodeKind::Condition));
        let r = rules(&graph, &a);
        assert_eq!(r.len(), 2);
        // the old implicit-handle edge binds to no branch
        assert!(r.iter().all(|rule| rule.next_node_id.is_none()));
        assert_eq!(graph.edges_from(&a).len(), 1);
    }

    #[test]
    fn test_clone_condition_node_gets_fresh_rule_ids() {
        let mut graph = test_graph();
        let (cond, t1, _) = condition_with_targets(&mut graph);
        connect(&mut graph, &cond, &t1);

        let copy = clone_node(&mut graph, &cond).unwrap();
        let original_rules = rules(&graph, &cond);
        let copy_rules = rules(&graph, &copy);
        assert_eq!(copy_rules.len(), original_rules.len());
        for (a, b) in original_rules.iter().zip(copy_rules.iter()) {
            assert_ne!(a.id, b.id);
            assert_eq!(a.kind, b.kind);
            assert_eq!(a.value, b.value);
        }
        assert!(copy_rules.iter().all(|r| r.next_node_id.is_none()));
        assert!(graph.edges_from(&copy).is_empty());
        let (orig, cloned) = (graph.node(&cond).unwrap(), graph.node(&copy).unwrap());
        assert_eq!(cloned.position.x, orig.position.x + 48.0);
    }

    #[test]
    fn test_operations_on_unknown_ids_are_noops() {
        let mut graph = test_graph();
        let cond = graph.add_node(NodeKind::Condition, Position::default());

        assert!(connect(&mut graph, "ghost", &cond).is_none());
        assert!(connect(&mut graph, &cond, "ghost").is_none());
        assert!(!remove_edge(&mut graph, "ghost"));
        assert!(!remove_node(&mut graph, "ghost"));
        assert!(!retype_node(&mut graph, "ghost", NodeKind::Delay));
        assert!(add_rule(&mut graph, "ghost").is_none());
        assert!(!remove_rule(&mut graph, &cond, "ghost"));
        assert!(!set_rule_value(&mut graph, &cond, "ghost", "x"));
        assert!(!set_rule_label(&mut graph, &cond, "ghost", Some("x")));
        assert!(clone_node(&mut graph, "ghost").is_none());
    }

    #[test]
    fn test_add_rule_on_non_condition_is_noop() {
        let mut graph = test_graph();
        let msg = graph.add_node(NodeKind::Message, Position::default());
        assert!(add_rule(&mut graph, &msg).is_none());
    }

    #[test]
    fn test_add_rule_extends_routing_table() {
        let mut graph = test_graph();
        let (cond, t1, t2) = condition_with_targets(&mut graph);
        let t3 = graph.add_node(NodeKind::Terminal, Position::default());
        connect(&mut graph, &cond, &t1);
        connect(&mut graph, &cond, &t2);

        let new_rule = add_rule(&mut graph, &cond).unwrap();
        // the fresh rule is the next free slot for the generic anchor
        connect(&mut graph, &cond, &t3);
        let r = rules(&graph, &cond);
        assert_eq!(r.len(), 3);
        assert_eq!(r[2].id, new_rule);
        assert_eq!(r[2].next_node_id.as_deref(), Some(t3.as_str()));
    }

    #[test]
    fn test_connect_condition_without_rules_uses_default_handle() {
        let mut graph = test_graph();
        let cond = graph.add_node(NodeKind::Condition, Position::default());
        let t = graph.add_node(NodeKind::Terminal, Position::default());
        if let Some(node) = graph.node_mut(&cond) {
            node.config = NodeConfig::Condition(ConditionConfig { rules: vec![] });
        }
        let edge_id = connect(&mut graph, &cond, &t).unwrap();
        assert_eq!(
            graph.edge(&edge_id).unwrap().source_handle.as_deref(),
            Some(DEFAULT_HANDLE)
        );
    }
}
