//! Tool dispatch: validate, sanitize, execute, and record.
//!
//! # Pipeline
//!
//! ```text
//! execute(tool_id, params)
//!   ├─ tool_id > 0, params is an object ──────────── else Err (no ledger entry)
//!   ├─ look up tool ─────────────────────────────── not found / disabled
//!   ├─ sanitize params (see crate::sanitize)
//!   ├─ check schema `required` on the sanitized copy ─ missing parameter
//!   ├─ find handler by tool *name* ───────────────── no handler
//!   └─ run handler under the timeout ─────────────── handler error / timeout
//!         │
//!         ▼
//!   one Request ledger entry (completed | failed), input = original params
//! ```
//!
//! Validation of the tool id and the params shape happens before dispatch
//! and is reported as `Err`. Every later failure is a `ToolOutcome` with
//! `success: false` plus a failed ledger entry.
//!
//! The handler runs on its own task. On timeout that task is aborted, so a
//! late result can never produce a second ledger entry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::{Map, Value};

use mcp_runtime_core::models::{NewRequest, Tool};
use mcp_runtime_core::store::Store;

use crate::error::{McpError, McpResult};
use crate::sanitize::sanitize_params;
use crate::traits::HandlerRegistry;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of one tool invocation, as returned to API callers.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Milliseconds.
    pub execution_time: u64,
}

pub struct ToolDispatcher {
    store: Arc<dyn Store>,
    handlers: Arc<HandlerRegistry>,
    timeout: Duration,
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl ToolDispatcher {
    pub fn new(store: Arc<dyn Store>, handlers: Arc<HandlerRegistry>) -> Self {
        Self {
            store,
            handlers,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Enabled tools only.
    pub async fn available_tools(&self) -> McpResult<Vec<Tool>> {
        let tools = self.store.list_tools().await?;
        Ok(tools.into_iter().filter(|t| t.enabled).collect())
    }

    /// Execute a tool by id.
    ///
    /// `params = None` (or JSON `null`) is treated as an empty object.
    /// Returns `Err` only for a non-positive id, a non-object `params`, or
    /// a store failure while writing the ledger entry.
    pub async fn execute(&self, tool_id: i64, params: Option<Value>) -> McpResult<ToolOutcome> {
        if tool_id <= 0 {
            return Err(McpError::InvalidToolId(tool_id));
        }
        let raw = match params {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(McpError::InvalidParams(format!(
                    "expected an object, got {}",
                    json_type_name(&other)
                )))
            }
        };

        let start = Instant::now();
        let result = self.run(tool_id, &raw).await;
        let execution_time = start.elapsed().as_millis() as u64;
        let input = Value::Object(raw);

        match result {
            Ok(data) => {
                self.store
                    .create_request(NewRequest::completed(
                        tool_id,
                        input,
                        data.clone(),
                        execution_time,
                    ))
                    .await?;
                tracing::debug!(tool_id, execution_time, "tool execution completed");
                Ok(ToolOutcome {
                    success: true,
                    data: Some(data),
                    error: None,
                    execution_time,
                })
            }
            Err(err) => {
                let message = err.to_string();
                self.store
                    .create_request(NewRequest::failed(
                        tool_id,
                        input,
                        message.clone(),
                        execution_time,
                    ))
                    .await?;
                tracing::warn!(tool_id, execution_time, error = %message, "tool execution failed");
                Ok(ToolOutcome {
                    success: false,
                    data: None,
                    error: Some(message),
                    execution_time,
                })
            }
        }
    }

    async fn run(&self, tool_id: i64, raw: &Map<String, Value>) -> McpResult<Value> {
        let tool = self
            .store
            .get_tool(tool_id)
            .await?
            .ok_or(McpError::ToolNotFound(tool_id))?;

        if !tool.enabled {
            return Err(McpError::ToolDisabled(tool.name));
        }

        let params = sanitize_params(raw);

        // Presence only; declared property types are not enforced.
        if let Some(missing) = tool
            .required_params()
            .into_iter()
            .find(|name| !params.contains_key(*name))
        {
            return Err(McpError::MissingParameter(missing.to_string()));
        }

        let handler = self
            .handlers
            .find(&tool.name)
            .ok_or_else(|| McpError::NoHandler(tool.name.clone()))?;

        let task = tokio::spawn(async move { handler.call(Value::Object(params)).await });
        let abort = task.abort_handle();

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(err))) => Err(McpError::Handler(err.to_string())),
            Ok(Err(join_err)) => Err(McpError::Handler(format!(
                "handler for {} did not complete: {}",
                tool.name, join_err
            ))),
            Err(_) => {
                abort.abort();
                Err(McpError::Timeout(self.timeout))
            }
        }
    }
}
