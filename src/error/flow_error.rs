//! Crate-level error types.

use thiserror::Error;

use crate::validation::ValidationReport;

/// Errors surfaced by the flow builder core.
///
/// The branch engine itself never produces errors: graph operations on
/// unknown identifiers are tolerated no-ops. Everything here is either a
/// pre-save validation failure or a persistence-boundary failure, both of
/// which leave the working state untouched and retryable.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Flow validation failed")]
    ValidationFailed(Box<ValidationReport>),
    #[error("No instance selected for this flow")]
    MissingInstance,
    #[error("Flow has not been saved yet")]
    NeverSaved,
    #[error("Flow not found: {0}")]
    FlowNotFound(String),
    #[error("Template not found: {0}")]
    TemplateNotFound(String),
    #[error("Invalid config for {kind} node: {message}")]
    ConfigShape { kind: String, message: String },
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FlowError {
    /// True when retrying the same operation could succeed (remote failures).
    pub fn is_retryable(&self) -> bool {
        matches!(self, FlowError::Api { .. } | FlowError::Transport(_))
    }
}
