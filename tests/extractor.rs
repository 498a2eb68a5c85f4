//! Context extraction, cache freshness, and search across the built-in
//! sources and custom ones.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use mcp_runtime::error::McpError;
use mcp_runtime::extractor::ContextExtractor;
use mcp_runtime::models::{ContextProvider, ExtractionResult, NewProvider, ProviderUpdate};
use mcp_runtime::seed::seed_catalog;
use mcp_runtime::source_git::git_key;
use mcp_runtime::store::memory::InMemoryStore;
use mcp_runtime::store::Store;
use mcp_runtime::traits::{ContextSource, SourceRegistry};
use serde_json::json;

const SEEDED_REPO: &str = "https://github.com/example/repo";

/// A source that always fails.
struct BrokenSource;

#[async_trait]
impl ContextSource for BrokenSource {
    fn provider_type(&self) -> &str {
        "broken"
    }

    async fn extract(&self, _provider: &ContextProvider) -> Result<Vec<ExtractionResult>> {
        bail!("upstream unavailable")
    }
}

async fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    seed_catalog(store.as_ref()).await.unwrap();
    store
}

fn extractor(store: Arc<InMemoryStore>) -> ContextExtractor {
    ContextExtractor::new(store, Arc::new(SourceRegistry::with_builtins()))
}

async fn add_provider(store: &InMemoryStore, name: &str, kind: &str) -> i64 {
    store
        .create_provider(NewProvider {
            name: name.to_string(),
            provider_type: kind.to_string(),
            config: json!({}),
            enabled: true,
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_git_extraction_is_cached_with_ttl() {
    let store = seeded_store().await;
    let extractor = extractor(store.clone());

    let before = Utc::now();
    let results = extractor.extract_context(1).await.unwrap();
    assert_eq!(results.len(), 1);

    let key = git_key(SEEDED_REPO, "main");
    assert_eq!(results[0].key, key);
    assert_eq!(results[0].metadata.kind, "git");
    assert_eq!(
        results[0].metadata.size,
        serde_json::to_vec(&results[0].value).unwrap().len()
    );

    let cached = extractor.get_cached_context(&key).await.unwrap().unwrap();
    let expires = cached.expires_at.unwrap();
    let expected = before + chrono::Duration::seconds(3600);
    assert!(expires >= expected);
    assert!(expires <= expected + chrono::Duration::seconds(5));
    assert!(cached.value["commits"].as_array().unwrap().len() >= 1);
}

#[tokio::test]
async fn test_file_extraction_respects_include_patterns() {
    let store = seeded_store().await;
    let extractor = extractor(store);

    let results = extractor.extract_context(2).await.unwrap();
    assert!(!results.is_empty());
    for r in &results {
        assert!(r.key.starts_with("file:"), "unexpected key {}", r.key);
        let path = r.key.trim_start_matches("file:");
        assert!(path.starts_with("src/") || path.starts_with("docs/"));
        assert_eq!(r.metadata.kind, "file");
    }
}

#[tokio::test]
async fn test_disabled_provider_is_rejected() {
    let store = seeded_store().await;
    store
        .update_provider(
            1,
            ProviderUpdate {
                enabled: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let extractor = extractor(store.clone());

    let err = extractor.extract_context(1).await.unwrap_err();
    assert!(matches!(err, McpError::ProviderDisabled(_)));
    assert!(store.list_cache(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_provider_and_type() {
    let store = seeded_store().await;
    let s3 = add_provider(&store, "Bucket", "s3").await;
    let extractor = extractor(store);

    let err = extractor.extract_context(99).await.unwrap_err();
    assert!(matches!(err, McpError::ProviderNotFound(99)));

    let err = extractor.extract_context(s3).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "no extractor available for provider type: s3"
    );
}

#[tokio::test]
async fn test_database_schema_is_searchable() {
    let store = seeded_store().await;
    let db = add_provider(&store, "Primary DB", "database").await;
    let extractor = extractor(store);

    let results = extractor.extract_context(db).await.unwrap();
    assert_eq!(results[0].key, "database:schema");

    let hits = extractor.search_context("PostgreSQL").await.unwrap();
    assert!(hits.iter().any(|h| h.key == "database:schema"));

    let none = extractor.search_context("zz-absent-token-zz").await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_empty_search_query_is_invalid() {
    let store = seeded_store().await;
    let extractor = extractor(store);

    assert!(matches!(
        extractor.search_context("").await.unwrap_err(),
        McpError::InvalidQuery
    ));
    assert!(matches!(
        extractor.search_context("   ").await.unwrap_err(),
        McpError::InvalidQuery
    ));
}

#[tokio::test]
async fn test_extract_all_skips_failing_providers() {
    let store = seeded_store().await;
    add_provider(&store, "Flaky", "broken").await;
    add_provider(&store, "Bucket", "s3").await;
    let mut sources = SourceRegistry::with_builtins();
    sources.register(Arc::new(BrokenSource));
    let extractor = ContextExtractor::new(store.clone(), Arc::new(sources));

    let results = extractor.extract_all_contexts().await.unwrap();

    let keys: Vec<&str> = results.iter().map(|r| r.key.as_str()).collect();
    assert!(keys.contains(&git_key(SEEDED_REPO, "main").as_str()));
    assert!(keys.contains(&"api:https://api.example.com/docs"));
    assert!(keys.iter().any(|k| k.starts_with("file:")));
    assert_eq!(store.list_cache(None).await.unwrap().len(), results.len());
}

#[tokio::test]
async fn test_re_extraction_overwrites_entries() {
    let store = seeded_store().await;
    let extractor = extractor(store.clone());

    extractor.extract_context(1).await.unwrap();
    let first = store.list_cache(Some(1)).await.unwrap();
    extractor.extract_context(1).await.unwrap();
    let second = store.list_cache(Some(1)).await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_eq!(first[0].id, second[0].id);
    assert!(second[0].expires_at >= first[0].expires_at);
}

#[tokio::test]
async fn test_stale_entries_hidden_from_lookup_but_searchable() {
    let store = seeded_store().await;
    let extractor = extractor(store).with_ttl(Duration::from_millis(1));

    extractor.extract_context(3).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let key = "api:https://api.example.com/docs";
    assert!(extractor.get_cached_context(key).await.unwrap().is_none());

    let hits = extractor.search_context("Execute a specific MCP tool").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].key, key);
}

#[tokio::test]
async fn test_shared_key_resolves_to_fresh_entry() {
    let store = seeded_store().await;
    let first = add_provider(&store, "Replica DB", "database").await;
    let second = add_provider(&store, "Primary DB", "database").await;

    let short_lived = extractor(store.clone()).with_ttl(Duration::from_millis(10));
    short_lived.extract_context(first).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    let extractor = extractor(store.clone());
    extractor.extract_context(second).await.unwrap();

    assert_eq!(store.list_cache(None).await.unwrap().len(), 2);
    let cached = extractor
        .get_cached_context("database:schema")
        .await
        .unwrap()
        .expect("fresh entry from the second provider");
    assert_eq!(cached.provider_id, second);
}
