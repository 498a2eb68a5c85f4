//! In-memory [`Store`] implementation.
//!
//! All entity maps and id counters live in one [`Tables`] value behind a
//! `std::sync::RwLock`, so id assignment and insertion happen under the
//! same write guard. `BTreeMap` keeps listings in id order.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::Utc;

use crate::models::{
    CacheItem, ContextProvider, Integration, IntegrationUpdate, NewCacheItem, NewIntegration,
    NewProvider, NewRequest, NewTool, ProviderUpdate, Request, RequestStatus, Tool, ToolUpdate,
};

use super::Store;

#[derive(Default)]
struct Counters {
    tool: i64,
    provider: i64,
    request: i64,
    cache: i64,
    integration: i64,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Default)]
struct Tables {
    tools: BTreeMap<i64, Tool>,
    providers: BTreeMap<i64, ContextProvider>,
    requests: BTreeMap<i64, Request>,
    cache: BTreeMap<i64, CacheItem>,
    integrations: BTreeMap<i64, Integration>,
    ids: Counters,
}

/// In-memory store for the runtime, tests, and the CLI.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn list_tools(&self) -> Result<Vec<Tool>> {
        Ok(self.read()?.tools.values().cloned().collect())
    }

    async fn get_tool(&self, id: i64) -> Result<Option<Tool>> {
        Ok(self.read()?.tools.get(&id).cloned())
    }

    async fn find_tool_by_name(&self, name: &str) -> Result<Option<Tool>> {
        Ok(self
            .read()?
            .tools
            .values()
            .find(|t| t.name == name)
            .cloned())
    }

    async fn create_tool(&self, tool: NewTool) -> Result<Tool> {
        let mut tables = self.write()?;
        if tables.tools.values().any(|t| t.name == tool.name) {
            bail!("tool name already registered: {}", tool.name);
        }
        let id = next(&mut tables.ids.tool);
        let now = Utc::now();
        let created = Tool {
            id,
            name: tool.name,
            description: tool.description,
            schema: tool.schema,
            category: tool.category,
            enabled: tool.enabled,
            created_at: now,
            updated_at: now,
        };
        tables.tools.insert(id, created.clone());
        Ok(created)
    }

    async fn update_tool(&self, id: i64, update: ToolUpdate) -> Result<Tool> {
        let mut tables = self.write()?;
        if let Some(name) = &update.name {
            if tables.tools.values().any(|t| t.id != id && &t.name == name) {
                bail!("tool name already registered: {}", name);
            }
        }
        let tool = tables
            .tools
            .get_mut(&id)
            .ok_or_else(|| anyhow!("tool with id {} not found", id))?;
        if let Some(name) = update.name {
            tool.name = name;
        }
        if let Some(description) = update.description {
            tool.description = description;
        }
        if let Some(schema) = update.schema {
            tool.schema = schema;
        }
        if let Some(category) = update.category {
            tool.category = category;
        }
        if let Some(enabled) = update.enabled {
            tool.enabled = enabled;
        }
        tool.updated_at = Utc::now();
        Ok(tool.clone())
    }

    async fn delete_tool(&self, id: i64) -> Result<()> {
        self.write()?.tools.remove(&id);
        Ok(())
    }

    async fn list_providers(&self) -> Result<Vec<ContextProvider>> {
        Ok(self.read()?.providers.values().cloned().collect())
    }

    async fn get_provider(&self, id: i64) -> Result<Option<ContextProvider>> {
        Ok(self.read()?.providers.get(&id).cloned())
    }

    async fn create_provider(&self, provider: NewProvider) -> Result<ContextProvider> {
        let mut tables = self.write()?;
        let id = next(&mut tables.ids.provider);
        let created = ContextProvider {
            id,
            name: provider.name,
            provider_type: provider.provider_type,
            config: provider.config,
            enabled: provider.enabled,
            created_at: Utc::now(),
        };
        tables.providers.insert(id, created.clone());
        Ok(created)
    }

    async fn update_provider(&self, id: i64, update: ProviderUpdate) -> Result<ContextProvider> {
        let mut tables = self.write()?;
        let provider = tables
            .providers
            .get_mut(&id)
            .ok_or_else(|| anyhow!("provider with id {} not found", id))?;
        if let Some(name) = update.name {
            provider.name = name;
        }
        if let Some(provider_type) = update.provider_type {
            provider.provider_type = provider_type;
        }
        if let Some(config) = update.config {
            provider.config = config;
        }
        if let Some(enabled) = update.enabled {
            provider.enabled = enabled;
        }
        Ok(provider.clone())
    }

    async fn delete_provider(&self, id: i64) -> Result<()> {
        self.write()?.providers.remove(&id);
        Ok(())
    }

    async fn list_requests(&self) -> Result<Vec<Request>> {
        Ok(self.read()?.requests.values().cloned().collect())
    }

    async fn get_request(&self, id: i64) -> Result<Option<Request>> {
        Ok(self.read()?.requests.get(&id).cloned())
    }

    async fn create_request(&self, request: NewRequest) -> Result<Request> {
        let mut tables = self.write()?;
        let id = next(&mut tables.ids.request);
        let created = Request {
            id,
            tool_id: request.tool_id,
            input: request.input,
            output: request.output,
            status: request.status,
            error: request.error,
            execution_time: request.execution_time,
            created_at: Utc::now(),
        };
        tables.requests.insert(id, created.clone());
        Ok(created)
    }

    async fn update_request_status(
        &self,
        id: i64,
        status: RequestStatus,
        error: Option<String>,
    ) -> Result<Request> {
        let mut tables = self.write()?;
        let request = tables
            .requests
            .get_mut(&id)
            .ok_or_else(|| anyhow!("request with id {} not found", id))?;
        request.status = status;
        request.error = match status {
            RequestStatus::Completed => None,
            RequestStatus::Failed => Some(error.unwrap_or_else(|| "unknown error".to_string())),
        };
        Ok(request.clone())
    }

    async fn list_cache(&self, provider_id: Option<i64>) -> Result<Vec<CacheItem>> {
        Ok(self
            .read()?
            .cache
            .values()
            .filter(|item| provider_id.map_or(true, |p| item.provider_id == p))
            .cloned()
            .collect())
    }

    async fn get_cache_item(&self, key: &str) -> Result<Option<CacheItem>> {
        Ok(self
            .read()?
            .cache
            .values()
            .filter(|item| item.key == key)
            .max_by_key(|item| (item.expires_at, item.id))
            .cloned())
    }

    async fn upsert_cache_item(&self, item: NewCacheItem) -> Result<CacheItem> {
        let mut tables = self.write()?;
        let existing = tables
            .cache
            .values()
            .find(|c| c.provider_id == item.provider_id && c.key == item.key)
            .map(|c| c.id);
        let id = match existing {
            Some(id) => id,
            None => next(&mut tables.ids.cache),
        };
        let stored = CacheItem {
            id,
            provider_id: item.provider_id,
            key: item.key,
            value: item.value,
            metadata: item.metadata,
            expires_at: item.expires_at,
            created_at: Utc::now(),
        };
        tables.cache.insert(id, stored.clone());
        Ok(stored)
    }

    async fn delete_cache_item(&self, id: i64) -> Result<()> {
        self.write()?.cache.remove(&id);
        Ok(())
    }

    async fn list_integrations(&self) -> Result<Vec<Integration>> {
        Ok(self.read()?.integrations.values().cloned().collect())
    }

    async fn get_integration(&self, id: i64) -> Result<Option<Integration>> {
        Ok(self.read()?.integrations.get(&id).cloned())
    }

    async fn create_integration(&self, integration: NewIntegration) -> Result<Integration> {
        let mut tables = self.write()?;
        let id = next(&mut tables.ids.integration);
        let now = Utc::now();
        let created = Integration {
            id,
            repo_url: integration.repo_url,
            branch: integration.branch,
            pr_number: integration.pr_number,
            status: integration.status,
            mcp_context: integration.mcp_context,
            metadata: integration.metadata,
            created_at: now,
            updated_at: now,
        };
        tables.integrations.insert(id, created.clone());
        Ok(created)
    }

    async fn update_integration(&self, id: i64, update: IntegrationUpdate) -> Result<Integration> {
        let mut tables = self.write()?;
        let integration = tables
            .integrations
            .get_mut(&id)
            .ok_or_else(|| anyhow!("integration with id {} not found", id))?;
        if let Some(status) = update.status {
            integration.status = status;
        }
        if let Some(mcp_context) = update.mcp_context {
            integration.mcp_context = mcp_context;
        }
        if let Some(metadata) = update.metadata {
            integration.metadata = metadata;
        }
        integration.updated_at = Utc::now();
        Ok(integration.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CacheMetadata, IntegrationStatus};
    use serde_json::json;
    use std::sync::Arc;

    fn new_tool(name: &str) -> NewTool {
        NewTool {
            name: name.to_string(),
            description: String::new(),
            schema: json!({}),
            category: "general".to_string(),
            enabled: true,
        }
    }

    fn cache_entry(provider_id: i64, key: &str, value: serde_json::Value) -> NewCacheItem {
        NewCacheItem {
            provider_id,
            key: key.to_string(),
            value,
            metadata: CacheMetadata {
                extracted_at: Utc::now(),
                size: 0,
                kind: "test".to_string(),
                tags: None,
            },
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_ids_are_per_kind() {
        let store = InMemoryStore::new();
        let a = store.create_tool(new_tool("a")).await.unwrap();
        let b = store.create_tool(new_tool("b")).await.unwrap();
        let p = store
            .create_provider(NewProvider {
                name: "p".to_string(),
                provider_type: "git".to_string(),
                config: json!({}),
                enabled: true,
            })
            .await
            .unwrap();
        assert_eq!((a.id, b.id, p.id), (1, 2, 1));
    }

    #[tokio::test]
    async fn test_duplicate_tool_name_rejected() {
        let store = InMemoryStore::new();
        store.create_tool(new_tool("dup")).await.unwrap();
        assert!(store.create_tool(new_tool("dup")).await.is_err());

        let other = store.create_tool(new_tool("other")).await.unwrap();
        let rename = ToolUpdate {
            name: Some("dup".to_string()),
            ..Default::default()
        };
        assert!(store.update_tool(other.id, rename).await.is_err());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = InMemoryStore::new();
        let err = store
            .update_tool(42, ToolUpdate::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
        let err = store
            .update_integration(7, IntegrationUpdate::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_cache_upsert_overwrites_same_key() {
        let store = InMemoryStore::new();
        let first = store
            .upsert_cache_item(cache_entry(1, "git:r:main", json!({ "v": 1 })))
            .await
            .unwrap();
        let second = store
            .upsert_cache_item(cache_entry(1, "git:r:main", json!({ "v": 2 })))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);

        let all = store.list_cache(None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].value, json!({ "v": 2 }));

        // Same key under another provider is a distinct entry.
        store
            .upsert_cache_item(cache_entry(2, "git:r:main", json!({ "v": 3 })))
            .await
            .unwrap();
        assert_eq!(store.list_cache(None).await.unwrap().len(), 2);
        assert_eq!(store.list_cache(Some(2)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_key_lookup_prefers_latest_expiry_across_providers() {
        let store = InMemoryStore::new();
        let now = Utc::now();

        let mut fresh = cache_entry(2, "database:schema", json!({ "from": 2 }));
        fresh.expires_at = Some(now + chrono::Duration::hours(1));
        let mut stale = cache_entry(1, "database:schema", json!({ "from": 1 }));
        stale.expires_at = Some(now - chrono::Duration::seconds(1));

        store.upsert_cache_item(stale).await.unwrap();
        store.upsert_cache_item(fresh).await.unwrap();

        let hit = store.get_cache_item("database:schema").await.unwrap().unwrap();
        assert_eq!(hit.provider_id, 2);
        assert!(hit.is_fresh(now));

        // An entry without expiry never outranks one that has it.
        store
            .upsert_cache_item(cache_entry(3, "database:schema", json!({ "from": 3 })))
            .await
            .unwrap();
        let hit = store.get_cache_item("database:schema").await.unwrap().unwrap();
        assert_eq!(hit.provider_id, 2);
    }

    #[tokio::test]
    async fn test_integration_update_bumps_timestamp() {
        let store = InMemoryStore::new();
        let created = store
            .create_integration(NewIntegration {
                repo_url: "https://example.com/r.git".to_string(),
                branch: "main".to_string(),
                pr_number: Some(1),
                status: IntegrationStatus::Processing,
                mcp_context: json!({}),
                metadata: json!({}),
            })
            .await
            .unwrap();
        let updated = store
            .update_integration(
                created.id,
                IntegrationUpdate {
                    status: Some(IntegrationStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, IntegrationStatus::Completed);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_request_status_correction() {
        let store = InMemoryStore::new();
        let req = store
            .create_request(NewRequest::completed(1, json!({}), json!({}), 3))
            .await
            .unwrap();
        let corrected = store
            .update_request_status(req.id, RequestStatus::Failed, Some("bad".to_string()))
            .await
            .unwrap();
        assert_eq!(corrected.status, RequestStatus::Failed);
        assert_eq!(corrected.error.as_deref(), Some("bad"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_get_unique_ids() {
        let store = Arc::new(InMemoryStore::new());
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .create_request(NewRequest::failed(i, json!({}), "x".to_string(), 0))
                    .await
                    .unwrap()
                    .id
            }));
        }
        let mut ids = Vec::new();
        for h in handles {
            ids.push(h.await.unwrap());
        }
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 32);
    }
}
