//! Error taxonomy for the runtime services.
//!
//! Store, handler, and source internals use `anyhow`; the service
//! boundaries ([`ToolDispatcher`](crate::dispatcher::ToolDispatcher),
//! [`ContextExtractor`](crate::extractor::ContextExtractor),
//! [`PrBot`](crate::bot::PrBot)) speak [`McpError`] so callers can tell a
//! bad request from a missing entity from a broken backend.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpError {
    // ── input validation ──
    #[error("invalid tool id: {0} (must be a positive integer)")]
    InvalidToolId(i64),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("missing required parameter: {0}")]
    MissingParameter(String),

    #[error("invalid query: must not be empty")]
    InvalidQuery,

    #[error("invalid webhook payload: {0}")]
    InvalidPayload(String),

    // ── lookup ──
    #[error("tool with id {0} not found")]
    ToolNotFound(i64),

    #[error("tool {0} is disabled")]
    ToolDisabled(String),

    #[error("no handler registered for tool: {0}")]
    NoHandler(String),

    #[error("provider with id {0} not found")]
    ProviderNotFound(i64),

    #[error("provider {0} is disabled")]
    ProviderDisabled(String),

    #[error("no extractor available for provider type: {0}")]
    NoExtractor(String),

    // ── execution ──
    #[error("tool execution timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("{0}")]
    Handler(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("comment delivery failed: {0}")]
    Comment(String),

    // ── backend ──
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl McpError {
    /// Errors caused by the caller's input, mapped to 400 at the HTTP edge.
    ///
    /// `InvalidToolId` and `InvalidParams` are raised before dispatch and
    /// leave no ledger entry. `MissingParameter` is detected inside the
    /// dispatch and is recorded as a failed request like any handler error.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            McpError::InvalidToolId(_)
                | McpError::InvalidParams(_)
                | McpError::MissingParameter(_)
                | McpError::InvalidQuery
                | McpError::InvalidPayload(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            McpError::ToolNotFound(_) | McpError::ProviderNotFound(_)
        )
    }
}

pub type McpResult<T> = std::result::Result<T, McpError>;
