//! HTTP implementation of the persistence boundary.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::error::FlowError;
use crate::model::schema::{
    DispatchTemplate, ExecutionSummary, FlowSchema, FlowStatus, TemplateSchema,
};

use super::store::FlowStore;

/// REST client for the console backend.
#[derive(Debug, Clone)]
pub struct HttpFlowStore {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpFlowStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, self.url(path));
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Map non-success responses to [`FlowError::Api`], using the backend's
    /// `message` field when the body carries one.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, FlowError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| body.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or_else(|| status.to_string());
        Err(FlowError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl FlowStore for HttpFlowStore {
    async fn list_flows(&self) -> Result<Vec<FlowSchema>, FlowError> {
        let response = self.request(reqwest::Method::GET, "/flows").send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn fetch_flow(&self, flow_id: &str) -> Result<FlowSchema, FlowError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/flows/{}", flow_id))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn create_flow(&self, flow: &FlowSchema) -> Result<FlowSchema, FlowError> {
        let response = self
            .request(reqwest::Method::POST, "/flows")
            .json(flow)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn update_flow(&self, flow_id: &str, flow: &FlowSchema) -> Result<FlowSchema, FlowError> {
        let response = self
            .request(reqwest::Method::PUT, &format!("/flows/{}", flow_id))
            .json(flow)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn delete_flow(&self, flow_id: &str) -> Result<(), FlowError> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/flows/{}", flow_id))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn set_flow_status(
        &self,
        flow_id: &str,
        status: FlowStatus,
    ) -> Result<FlowSchema, FlowError> {
        let response = self
            .request(reqwest::Method::POST, &format!("/flows/{}/status", flow_id))
            .json(&json!({ "status": status }))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn duplicate_as_template(&self, flow_id: &str) -> Result<TemplateSchema, FlowError> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/flows/{}/duplicate-template", flow_id),
            )
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn list_templates(&self) -> Result<Vec<TemplateSchema>, FlowError> {
        let response = self
            .request(reqwest::Method::GET, "/templates")
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn list_executions(&self, flow_id: &str) -> Result<Vec<ExecutionSummary>, FlowError> {
        let response = self
            .request(reqwest::Method::GET, "/executions")
            .query(&[("flowId", flow_id)])
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn list_dispatch_templates(&self) -> Result<Vec<DispatchTemplate>, FlowError> {
        let response = self
            .request(reqwest::Method::GET, "/mass-dispatch/templates/list")
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }
}
