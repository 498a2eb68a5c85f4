//! Persistence abstraction for the MCP runtime.
//!
//! The [`Store`] trait is the sole source of truth for tools, providers,
//! the request ledger, the context cache, and PR integration records. The
//! runtime services never hold entity state beyond a single operation.
//!
//! Implementations must be `Send + Sync` and must assign identifiers from
//! per-entity-kind monotonic counters that stay unique under concurrent
//! writers.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    CacheItem, ContextProvider, Integration, IntegrationUpdate, NewCacheItem, NewIntegration,
    NewProvider, NewRequest, NewTool, ProviderUpdate, Request, RequestStatus, Tool, ToolUpdate,
};

/// Abstract storage backend.
///
/// # Operations
///
/// | Entity | Operations |
/// |--------|-----------|
/// | Tool | list, get, find by name, create, update, delete |
/// | Context provider | list, get, create, update, delete |
/// | Request | list, get, create, status correction |
/// | Cache item | list, get by key, upsert, delete |
/// | Integration | list, get, create, update |
///
/// Lookups return `Ok(None)` for a missing id; updates of a missing id
/// fail with a "not found" error. Listings are in ascending id order.
#[async_trait]
pub trait Store: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<Tool>>;

    async fn get_tool(&self, id: i64) -> Result<Option<Tool>>;

    async fn find_tool_by_name(&self, name: &str) -> Result<Option<Tool>>;

    /// Fails if another tool already uses the same name.
    async fn create_tool(&self, tool: NewTool) -> Result<Tool>;

    async fn update_tool(&self, id: i64, update: ToolUpdate) -> Result<Tool>;

    /// Deleting is non-cascading: ledger entries keep their `tool_id`.
    async fn delete_tool(&self, id: i64) -> Result<()>;

    async fn list_providers(&self) -> Result<Vec<ContextProvider>>;

    async fn get_provider(&self, id: i64) -> Result<Option<ContextProvider>>;

    async fn create_provider(&self, provider: NewProvider) -> Result<ContextProvider>;

    async fn update_provider(&self, id: i64, update: ProviderUpdate) -> Result<ContextProvider>;

    /// Deleting is non-cascading: cache items keep their `provider_id`.
    async fn delete_provider(&self, id: i64) -> Result<()>;

    async fn list_requests(&self) -> Result<Vec<Request>>;

    async fn get_request(&self, id: i64) -> Result<Option<Request>>;

    async fn create_request(&self, request: NewRequest) -> Result<Request>;

    /// Explicit status correction; the only mutation a ledger entry allows.
    async fn update_request_status(
        &self,
        id: i64,
        status: RequestStatus,
        error: Option<String>,
    ) -> Result<Request>;

    /// All cache items, optionally restricted to one provider.
    async fn list_cache(&self, provider_id: Option<i64>) -> Result<Vec<CacheItem>>;

    /// Cache item with the given key that expires last, fresh or not.
    ///
    /// Several providers may write the same key; ties go to the newest id.
    async fn get_cache_item(&self, key: &str) -> Result<Option<CacheItem>>;

    /// Insert, or overwrite the item with the same `(provider_id, key)`.
    ///
    /// An overwrite keeps the existing id.
    async fn upsert_cache_item(&self, item: NewCacheItem) -> Result<CacheItem>;

    async fn delete_cache_item(&self, id: i64) -> Result<()>;

    async fn list_integrations(&self) -> Result<Vec<Integration>>;

    async fn get_integration(&self, id: i64) -> Result<Option<Integration>>;

    async fn create_integration(&self, integration: NewIntegration) -> Result<Integration>;

    async fn update_integration(&self, id: i64, update: IntegrationUpdate) -> Result<Integration>;
}
