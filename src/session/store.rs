//! Persistence boundary for flows, templates, and execution history.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::FlowError;
use crate::model::schema::{
    DispatchTemplate, ExecutionSummary, FlowSchema, FlowStatus, TemplateSchema,
};

/// The backend surface the builder consumes.
///
/// Implementations must be shareable across the UI runtime's tasks. Calls
/// are fire-and-forget from the engine's perspective: the session awaits
/// them only to update its own state and never blocks graph edits.
#[async_trait]
pub trait FlowStore: Send + Sync {
    async fn list_flows(&self) -> Result<Vec<FlowSchema>, FlowError>;
    async fn fetch_flow(&self, flow_id: &str) -> Result<FlowSchema, FlowError>;
    async fn create_flow(&self, flow: &FlowSchema) -> Result<FlowSchema, FlowError>;
    async fn update_flow(&self, flow_id: &str, flow: &FlowSchema) -> Result<FlowSchema, FlowError>;
    async fn delete_flow(&self, flow_id: &str) -> Result<(), FlowError>;
    async fn set_flow_status(
        &self,
        flow_id: &str,
        status: FlowStatus,
    ) -> Result<FlowSchema, FlowError>;
    async fn duplicate_as_template(&self, flow_id: &str) -> Result<TemplateSchema, FlowError>;
    async fn list_templates(&self) -> Result<Vec<TemplateSchema>, FlowError>;
    async fn list_executions(&self, flow_id: &str) -> Result<Vec<ExecutionSummary>, FlowError>;
    async fn list_dispatch_templates(&self) -> Result<Vec<DispatchTemplate>, FlowError>;
}

/// In-memory store used by tests and offline demos.
///
/// Mimics the backend's canonical-copy behavior: `create` assigns an id,
/// `update` bumps the version, and both return the stored copy.
#[derive(Default)]
pub struct MemoryFlowStore {
    flows: tokio::sync::RwLock<HashMap<String, FlowSchema>>,
    templates: tokio::sync::RwLock<HashMap<String, TemplateSchema>>,
    executions: tokio::sync::RwLock<Vec<ExecutionSummary>>,
    dispatch_templates: tokio::sync::RwLock<Vec<DispatchTemplate>>,
    next_id: std::sync::atomic::AtomicU64,
}

impl MemoryFlowStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_id(&self, prefix: &str) -> String {
        let n = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        format!("{}-{}", prefix, n)
    }

    pub async fn seed_template(&self, template: TemplateSchema) {
        self.templates
            .write()
            .await
            .insert(template.id.clone(), template);
    }

    pub async fn seed_execution(&self, execution: ExecutionSummary) {
        self.executions.write().await.push(execution);
    }

    pub async fn seed_dispatch_template(&self, template: DispatchTemplate) {
        self.dispatch_templates.write().await.push(template);
    }
}

#[async_trait]
impl FlowStore for MemoryFlowStore {
    async fn list_flows(&self) -> Result<Vec<FlowSchema>, FlowError> {
        Ok(self.flows.read().await.values().cloned().collect())
    }

    async fn fetch_flow(&self, flow_id: &str) -> Result<FlowSchema, FlowError> {
        self.flows
            .read()
            .await
            .get(flow_id)
            .cloned()
            .ok_or_else(|| FlowError::FlowNotFound(flow_id.to_string()))
    }

    async fn create_flow(&self, flow: &FlowSchema) -> Result<FlowSchema, FlowError> {
        let mut stored = flow.clone();
        stored.id = self.fresh_id("flow");
        stored.version = 1;
        self.flows
            .write()
            .await
            .insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn update_flow(&self, flow_id: &str, flow: &FlowSchema) -> Result<FlowSchema, FlowError> {
        let mut flows = self.flows.write().await;
        let existing = flows
            .get(flow_id)
            .ok_or_else(|| FlowError::FlowNotFound(flow_id.to_string()))?;
        let mut stored = flow.clone();
        stored.id = flow_id.to_string();
        stored.version = existing.version + 1;
        flows.insert(flow_id.to_string(), stored.clone());
        Ok(stored)
    }

    async fn delete_flow(&self, flow_id: &str) -> Result<(), FlowError> {
        self.flows.write().await.remove(flow_id);
        Ok(())
    }

    async fn set_flow_status(
        &self,
        flow_id: &str,
        status: FlowStatus,
    ) -> Result<FlowSchema, FlowError> {
        let mut flows = self.flows.write().await;
        let flow = flows
            .get_mut(flow_id)
            .ok_or_else(|| FlowError::FlowNotFound(flow_id.to_string()))?;
        flow.status = status;
        Ok(flow.clone())
    }

    async fn duplicate_as_template(&self, flow_id: &str) -> Result<TemplateSchema, FlowError> {
        let flow = self.fetch_flow(flow_id).await?;
        let template = TemplateSchema {
            id: self.fresh_id("template"),
            name: flow.name.clone(),
            description: String::new(),
            triggers: flow.triggers.clone(),
            nodes: flow.nodes.clone(),
            edges: flow.edges.clone(),
            settings: flow.settings.clone(),
        };
        self.templates
            .write()
            .await
            .insert(template.id.clone(), template.clone());
        Ok(template)
    }

    async fn list_templates(&self) -> Result<Vec<TemplateSchema>, FlowError> {
        Ok(self.templates.read().await.values().cloned().collect())
    }

    async fn list_executions(&self, flow_id: &str) -> Result<Vec<ExecutionSummary>, FlowError> {
        Ok(self
            .executions
            .read()
            .await
            .iter()
            .filter(|e| e.flow_id == flow_id)
            .cloned()
            .collect())
    }

    async fn list_dispatch_templates(&self) -> Result<Vec<DispatchTemplate>, FlowError> {
        Ok(self.dispatch_templates.read().await.clone())
    }
}
