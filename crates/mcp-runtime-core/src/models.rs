//! Entity models shared by the store and the runtime services.
//!
//! Every entity is identified by an `i64` assigned by the [`Store`](crate::store::Store)
//! from a per-kind monotonic counter. Wire names are camelCase so the JSON
//! payloads line up with the HTTP API and webhook consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_true() -> bool {
    true
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

// ═══════════════════════════════════════════════════════════════════════
// Tools
// ═══════════════════════════════════════════════════════════════════════

/// A registered, schema-described tool.
///
/// `name` is the dispatch key: it selects which handler runs the tool.
/// `schema` follows the JSON-Schema-like convention
/// `{type: "object", properties: {...}, required: [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub schema: Value,
    pub category: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tool {
    /// Property names listed in the schema's `required` array.
    ///
    /// Non-string entries are ignored; a schema without `required` yields
    /// an empty list.
    pub fn required_params(&self) -> Vec<&str> {
        self.schema
            .get("required")
            .and_then(Value::as_array)
            .map(|req| req.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Input for [`Store::create_tool`](crate::store::Store::create_tool).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_object")]
    pub schema: Value,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_category() -> String {
    "general".to_string()
}

/// Partial update for a tool; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub schema: Option<Value>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

// ═══════════════════════════════════════════════════════════════════════
// Context providers
// ═══════════════════════════════════════════════════════════════════════

/// A typed source of extractable context.
///
/// `provider_type` selects the extraction routine (`file`, `git`, `api`,
/// `database`). It is kept as a string so that a provider with an
/// unregistered type can exist and fail at extraction time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContextProvider {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub provider_type: String,
    pub config: Value,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProvider {
    pub name: String,
    #[serde(rename = "type")]
    pub provider_type: String,
    #[serde(default = "empty_object")]
    pub config: Value,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub provider_type: Option<String>,
    #[serde(default)]
    pub config: Option<Value>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

// ═══════════════════════════════════════════════════════════════════════
// Request ledger
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Completed,
    Failed,
}

/// One ledger entry per tool invocation attempt.
///
/// `input` holds the parameters exactly as received, before sanitization.
/// `error` is set iff `status` is [`RequestStatus::Failed`]. `tool_id` may
/// point at a tool that has since been deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: i64,
    pub tool_id: Option<i64>,
    pub input: Value,
    pub output: Option<Value>,
    pub status: RequestStatus,
    pub error: Option<String>,
    /// Wall-clock execution time in milliseconds.
    pub execution_time: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRequest {
    pub tool_id: Option<i64>,
    pub input: Value,
    pub output: Option<Value>,
    pub status: RequestStatus,
    pub error: Option<String>,
    pub execution_time: u64,
}

impl NewRequest {
    pub fn completed(tool_id: i64, input: Value, output: Value, execution_time: u64) -> Self {
        Self {
            tool_id: Some(tool_id),
            input,
            output: Some(output),
            status: RequestStatus::Completed,
            error: None,
            execution_time,
        }
    }

    pub fn failed(tool_id: i64, input: Value, error: String, execution_time: u64) -> Self {
        Self {
            tool_id: Some(tool_id),
            input,
            output: None,
            status: RequestStatus::Failed,
            error: Some(error),
            execution_time,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Context cache
// ═══════════════════════════════════════════════════════════════════════

/// Metadata attached to every extracted context value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetadata {
    pub extracted_at: DateTime<Utc>,
    /// Byte size of the extracted value.
    pub size: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// A single result produced by an extraction routine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub provider_id: i64,
    /// `<type>:<discriminator>`, unique within the provider's namespace.
    pub key: String,
    pub value: Value,
    pub metadata: CacheMetadata,
}

/// A stored extraction result with an optional expiry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheItem {
    pub id: i64,
    pub provider_id: i64,
    pub key: String,
    pub value: Value,
    pub metadata: CacheMetadata,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CacheItem {
    /// An entry without an expiry is never considered fresh.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| now < expires)
    }
}

impl From<CacheItem> for ExtractionResult {
    fn from(item: CacheItem) -> Self {
        Self {
            provider_id: item.provider_id,
            key: item.key,
            value: item.value,
            metadata: item.metadata,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewCacheItem {
    pub provider_id: i64,
    pub key: String,
    pub value: Value,
    pub metadata: CacheMetadata,
    pub expires_at: Option<DateTime<Utc>>,
}

// ═══════════════════════════════════════════════════════════════════════
// PR integrations
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationStatus {
    Processing,
    Completed,
    Failed,
    PushProcessed,
}

/// State record of one webhook-triggered automation pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    pub id: i64,
    pub repo_url: String,
    pub branch: String,
    pub pr_number: Option<i64>,
    pub status: IntegrationStatus,
    pub mcp_context: Value,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewIntegration {
    pub repo_url: String,
    pub branch: String,
    pub pr_number: Option<i64>,
    pub status: IntegrationStatus,
    pub mcp_context: Value,
    pub metadata: Value,
}

#[derive(Debug, Clone, Default)]
pub struct IntegrationUpdate {
    pub status: Option<IntegrationStatus>,
    pub mcp_context: Option<Value>,
    pub metadata: Option<Value>,
}
