//! Context extraction and the time-bounded context cache.
//!
//! [`ContextExtractor`] resolves a provider, runs the [`ContextSource`]
//! registered for its type, and writes every result into the cache with
//! `expiresAt = now + ttl`. Re-extracting a provider overwrites its entries
//! rather than duplicating them.
//!
//! Freshness is checked lazily on read ([`get_cached_context`]); expired
//! entries stay in the store until they are overwritten.
//!
//! [`get_cached_context`]: ContextExtractor::get_cached_context

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;

use mcp_runtime_core::models::{CacheItem, CacheMetadata, ExtractionResult, NewCacheItem};
use mcp_runtime_core::store::Store;

use crate::error::{McpError, McpResult};
use crate::traits::{ContextSource, SourceRegistry};

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Assemble an [`ExtractionResult`] stamped with the current instant.
///
/// `metadata.size` is the byte length of the JSON-serialized value.
pub fn build_result(
    provider_id: i64,
    key: String,
    value: Value,
    kind: &str,
    tags: Vec<String>,
) -> ExtractionResult {
    let size = serde_json::to_vec(&value).map(|v| v.len()).unwrap_or(0);
    ExtractionResult {
        provider_id,
        key,
        value,
        metadata: CacheMetadata {
            extracted_at: Utc::now(),
            size,
            kind: kind.to_string(),
            tags: Some(tags),
        },
    }
}

pub struct ContextExtractor {
    store: Arc<dyn Store>,
    sources: Arc<SourceRegistry>,
    ttl: Duration,
}

impl ContextExtractor {
    pub fn new(store: Arc<dyn Store>, sources: Arc<SourceRegistry>) -> Self {
        Self {
            store,
            sources,
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Extract one provider and cache its results.
    ///
    /// Fails if the provider is missing or disabled, if no source is
    /// registered for its type, or if the source itself fails.
    pub async fn extract_context(&self, provider_id: i64) -> McpResult<Vec<ExtractionResult>> {
        let provider = self
            .store
            .get_provider(provider_id)
            .await?
            .ok_or(McpError::ProviderNotFound(provider_id))?;

        if !provider.enabled {
            return Err(McpError::ProviderDisabled(provider.name));
        }

        let source: Arc<dyn ContextSource> = self
            .sources
            .find(&provider.provider_type)
            .ok_or_else(|| McpError::NoExtractor(provider.provider_type.clone()))?;

        let results = source
            .extract(&provider)
            .await
            .map_err(|e| McpError::Extraction(format!("{}: {}", provider.name, e)))?;

        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| McpError::Store(anyhow::anyhow!("invalid cache ttl: {}", e)))?;
        let expires_at = Utc::now() + ttl;

        for result in &results {
            self.store
                .upsert_cache_item(NewCacheItem {
                    provider_id: result.provider_id,
                    key: result.key.clone(),
                    value: result.value.clone(),
                    metadata: result.metadata.clone(),
                    expires_at: Some(expires_at),
                })
                .await?;
        }

        tracing::info!(
            provider_id,
            provider = %provider.name,
            provider_type = %provider.provider_type,
            results = results.len(),
            "context extracted"
        );
        Ok(results)
    }

    /// Extract every enabled provider, one at a time.
    ///
    /// A failing provider is logged and skipped; results already cached
    /// for earlier providers stay in place.
    pub async fn extract_all_contexts(&self) -> McpResult<Vec<ExtractionResult>> {
        let providers = self.store.list_providers().await?;
        let mut all = Vec::new();

        for provider in providers.into_iter().filter(|p| p.enabled) {
            match self.extract_context(provider.id).await {
                Ok(results) => all.extend(results),
                Err(err) => {
                    tracing::warn!(
                        provider_id = provider.id,
                        provider = %provider.name,
                        error = %err,
                        "failed to extract context, skipping provider"
                    );
                }
            }
        }

        Ok(all)
    }

    /// Cache entry for `key`, only while it is still fresh.
    pub async fn get_cached_context(&self, key: &str) -> McpResult<Option<CacheItem>> {
        let item = self.store.get_cache_item(key).await?;
        Ok(item.filter(|i| i.is_fresh(Utc::now())))
    }

    /// Case-insensitive substring search over the serialized cached values.
    ///
    /// Keys and metadata are not searched. Results follow cache order and
    /// include stale entries.
    pub async fn search_context(&self, query: &str) -> McpResult<Vec<ExtractionResult>> {
        if query.trim().is_empty() {
            return Err(McpError::InvalidQuery);
        }
        let needle = query.to_lowercase();
        let items = self.store.list_cache(None).await?;

        Ok(items
            .into_iter()
            .filter(|item| {
                serde_json::to_string(&item.value)
                    .map(|s| s.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
            .map(ExtractionResult::from)
            .collect())
    }
}
