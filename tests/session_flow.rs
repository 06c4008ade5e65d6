//! Session orchestration against the in-memory store: scaffold, save,
//! canonical adoption, template application, and failure behavior.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use mindclerky::{
    DispatchTemplate, FlowError, FlowSession, FlowStatus, FlowStore, MemoryFlowStore, NodeConfig,
    NodeKind, Position, SequentialIdGenerator, TemplateSchema,
};

fn scaffolded(store: Arc<MemoryFlowStore>) -> FlowSession {
    FlowSession::scaffold_with_ids(
        store,
        "Welcome flow",
        "main",
        Arc::new(SequentialIdGenerator::new("id")),
    )
}

#[tokio::test]
async fn scaffold_save_creates_and_adopts_canonical_copy() {
    let store = Arc::new(MemoryFlowStore::new());
    let mut session = scaffolded(store.clone());
    assert!(session.is_dirty());

    session.save().await.unwrap();

    assert!(!session.is_dirty());
    let flow_id = session.flow_id().unwrap().to_string();
    assert!(!flow_id.is_empty());
    // the server copy is what the session now holds
    let stored = store.fetch_flow(&flow_id).await.unwrap();
    assert_eq!(stored.nodes.len(), session.graph().nodes().len());
    assert_eq!(session.version, stored.version);
}

#[tokio::test]
async fn second_save_updates_in_place() {
    let store = Arc::new(MemoryFlowStore::new());
    let mut session = scaffolded(store.clone());
    session.save().await.unwrap();
    let flow_id = session.flow_id().unwrap().to_string();

    session.add_node(NodeKind::Delay, Position { x: 300.0, y: 80.0 });
    session.save().await.unwrap();

    assert_eq!(session.flow_id().unwrap(), flow_id);
    assert_eq!(session.version, 2);
    let stored = store.fetch_flow(&flow_id).await.unwrap();
    assert_eq!(stored.nodes.len(), 2);
}

#[tokio::test]
async fn load_restores_graph_and_repairs_branch_caches() {
    let store = Arc::new(MemoryFlowStore::new());
    let mut session = scaffolded(store.clone());
    let seed = session.graph().nodes()[0].id.clone();
    let cond = session.add_node(NodeKind::Condition, Position { x: 200.0, y: 0.0 });
    session.connect(&seed, &cond);
    session.connect(&cond, &seed);
    session.save().await.unwrap();
    let flow_id = session.flow_id().unwrap().to_string();

    // corrupt the stored copy's rule cache the way an older builder could
    let mut stored = store.fetch_flow(&flow_id).await.unwrap();
    for node in &mut stored.nodes {
        if node.kind == NodeKind::Condition {
            node.data["rules"][1]["nextNodeId"] = json!("vanished-node");
        }
    }
    store.update_flow(&flow_id, &stored).await.unwrap();

    let loaded = FlowSession::load_with_ids(
        store.clone(),
        &flow_id,
        Arc::new(SequentialIdGenerator::new("ld")),
    )
    .await
    .unwrap();

    let cond_node = loaded
        .graph()
        .nodes()
        .iter()
        .find(|n| n.kind() == NodeKind::Condition)
        .unwrap();
    let NodeConfig::Condition(cfg) = &cond_node.config else {
        panic!("expected condition");
    };
    assert_eq!(cfg.rules[1].next_node_id, None, "stale cache must be repaired");
    assert_eq!(cfg.rules[0].next_node_id.as_deref(), Some(seed.as_str()));
}

#[tokio::test]
async fn save_requires_an_instance() {
    let store = Arc::new(MemoryFlowStore::new());
    let mut session = FlowSession::scaffold(store, "No instance", "");
    let err = session.save().await.unwrap_err();
    assert!(matches!(err, FlowError::MissingInstance));
    assert!(session.is_dirty(), "nothing was flushed");
}

#[tokio::test]
async fn save_aborts_locally_on_validation_errors() {
    let store = Arc::new(MemoryFlowStore::new());
    let mut session = scaffolded(store.clone());
    let delay = session.add_node(NodeKind::Delay, Position::default());
    session.set_node_config(
        &delay,
        NodeConfig::Delay(mindclerky::DelayConfig {
            duration: 999,
            ..mindclerky::DelayConfig::default()
        }),
    );

    let err = session.save().await.unwrap_err();
    let FlowError::ValidationFailed(report) = err else {
        panic!("expected validation failure");
    };
    assert!(report.errors().iter().any(|d| d.code == "E006"));
    // no remote call happened
    assert!(store.list_flows().await.unwrap().is_empty());
}

struct FailingStore;

#[async_trait]
impl FlowStore for FailingStore {
    async fn list_flows(&self) -> Result<Vec<mindclerky::FlowSchema>, FlowError> {
        Err(unavailable())
    }
    async fn fetch_flow(&self, _: &str) -> Result<mindclerky::FlowSchema, FlowError> {
        Err(unavailable())
    }
    async fn create_flow(
        &self,
        _: &mindclerky::FlowSchema,
    ) -> Result<mindclerky::FlowSchema, FlowError> {
        Err(unavailable())
    }
    async fn update_flow(
        &self,
        _: &str,
        _: &mindclerky::FlowSchema,
    ) -> Result<mindclerky::FlowSchema, FlowError> {
        Err(unavailable())
    }
    async fn delete_flow(&self, _: &str) -> Result<(), FlowError> {
        Err(unavailable())
    }
    async fn set_flow_status(
        &self,
        _: &str,
        _: FlowStatus,
    ) -> Result<mindclerky::FlowSchema, FlowError> {
        Err(unavailable())
    }
    async fn duplicate_as_template(&self, _: &str) -> Result<TemplateSchema, FlowError> {
        Err(unavailable())
    }
    async fn list_templates(&self) -> Result<Vec<TemplateSchema>, FlowError> {
        Err(unavailable())
    }
    async fn list_executions(
        &self,
        _: &str,
    ) -> Result<Vec<mindclerky::ExecutionSummary>, FlowError> {
        Err(unavailable())
    }
    async fn list_dispatch_templates(&self) -> Result<Vec<DispatchTemplate>, FlowError> {
        Err(unavailable())
    }
}

fn unavailable() -> FlowError {
    FlowError::Api {
        status: 503,
        message: "service unavailable".into(),
    }
}

#[tokio::test]
async fn failed_close_keeps_the_session_intact() {
    let mut session = FlowSession::scaffold_with_ids(
        Arc::new(FailingStore),
        "Doomed",
        "main",
        Arc::new(SequentialIdGenerator::new("id")),
    );
    let node_count = session.graph().nodes().len();

    let err = session.close_with_save().await.unwrap_err();
    assert!(err.is_retryable());
    // unsaved work is still there for the retry
    assert!(session.is_dirty());
    assert_eq!(session.graph().nodes().len(), node_count);
}

#[tokio::test]
async fn template_application_replaces_wholesale() {
    let store = Arc::new(MemoryFlowStore::new());
    let mut session = scaffolded(store);

    // n1 + n2 and one edge, with n2 selected
    let seed = session.graph().nodes()[0].id.clone();
    let extra = session.add_node(NodeKind::Delay, Position::default());
    session.connect(&seed, &extra).unwrap();
    session.select_node(&extra);
    assert!(session.panel_open());

    let template: TemplateSchema = serde_json::from_value(json!({
        "_id": "t1",
        "name": "Single step",
        "triggers": [{"type": "keyword", "value": "start"}],
        "nodes": [
            {"id": "tpl-1", "type": "ai-reply", "name": "Assistant",
             "position": {"x": 40.0, "y": 40.0}, "data": {"prompt": "Be helpful"}}
        ],
        "edges": [],
        "settings": {"pauseOnHumanReply": true}
    }))
    .unwrap();

    session.apply_template(&template).unwrap();

    assert_eq!(session.graph().nodes().len(), 1);
    assert_eq!(session.graph().nodes()[0].id, "tpl-1");
    assert!(session.graph().edges().is_empty());
    assert_eq!(session.triggers.len(), 1);
    assert_eq!(session.settings["pauseOnHumanReply"], json!(true));
    // selection cleared, not remapped
    assert_eq!(session.selection().node, None);
    assert!(!session.panel_open());
}

#[tokio::test]
async fn duplicate_as_template_requires_a_saved_flow() {
    let store = Arc::new(MemoryFlowStore::new());
    let mut session = scaffolded(store.clone());

    let err = session.duplicate_as_template().await.unwrap_err();
    assert!(matches!(err, FlowError::NeverSaved));

    session.save().await.unwrap();
    let template = session.duplicate_as_template().await.unwrap();
    assert_eq!(template.name, "Welcome flow");
    assert_eq!(store.list_templates().await.unwrap().len(), 1);
}

#[tokio::test]
async fn status_toggle_round_trips_through_the_store() {
    let store = Arc::new(MemoryFlowStore::new());
    let mut session = scaffolded(store.clone());
    session.save().await.unwrap();

    session.set_status(FlowStatus::Active).await.unwrap();
    assert_eq!(session.status, FlowStatus::Active);
    let stored = store
        .fetch_flow(session.flow_id().unwrap())
        .await
        .unwrap();
    assert_eq!(stored.status, FlowStatus::Active);
}

#[tokio::test]
async fn dispatch_template_names_enrich_subtitles() {
    let store = Arc::new(MemoryFlowStore::new());
    store
        .seed_dispatch_template(DispatchTemplate {
            id: "dt-1".into(),
            name: "Black Friday blast".into(),
        })
        .await;
    let mut session = scaffolded(store);
    let node = session.add_node(NodeKind::MassDispatch, Position::default());
    session.set_node_config(
        &node,
        NodeConfig::MassDispatch(mindclerky::MassDispatchConfig {
            template_id: "dt-1".into(),
            ..mindclerky::MassDispatchConfig::default()
        }),
    );

    session.refresh_dispatch_templates().await.unwrap();

    let (nodes, _) = session.view();
    let dispatch = nodes
        .iter()
        .find(|n| n.kind == NodeKind::MassDispatch)
        .unwrap();
    assert_eq!(dispatch.subtitle, "Black Friday blast");
}
