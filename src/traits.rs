//! Extension traits for tool handlers, context sources, and comment sinks.
//!
//! Each registry is an immutable-after-construction map from a string key
//! to a trait object. Build it, register what you need, then hand it to the
//! service that owns it.
//!
//! ```text
//! ┌─────────────────────────────┐     ┌─────────────────────────────┐
//! │       HandlerRegistry       │     │       SourceRegistry        │
//! │  tool name → ToolHandler    │     │  provider type → Source     │
//! │  web_search / file_reader / │     │  file / git / api /         │
//! │  code_analyzer / custom     │     │  database / custom          │
//! └─────────────┬───────────────┘     └─────────────┬───────────────┘
//!               ▼                                   ▼
//!         ToolDispatcher                     ContextExtractor
//! ```
//!
//! # Usage
//!
//! ```rust
//! use mcp_runtime::traits::{HandlerRegistry, SourceRegistry};
//!
//! let mut handlers = HandlerRegistry::with_builtins();
//! // handlers.register(Arc::new(MyHandler));
//!
//! let sources = SourceRegistry::with_builtins();
//! assert!(sources.find("git").is_some());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use mcp_runtime_core::models::{ContextProvider, ExtractionResult};

// ═══════════════════════════════════════════════════════════════════════
// ToolHandler
// ═══════════════════════════════════════════════════════════════════════

/// Executable behaviour behind a registered tool.
///
/// The dispatcher selects a handler by the tool's *name*, so the value
/// returned by [`name`](ToolHandler::name) must match the stored
/// [`Tool::name`](mcp_runtime_core::models::Tool::name).
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use anyhow::Result;
/// use serde_json::{json, Value};
/// use mcp_runtime::traits::ToolHandler;
///
/// pub struct Echo;
///
/// #[async_trait]
/// impl ToolHandler for Echo {
///     fn name(&self) -> &str { "echo" }
///
///     async fn call(&self, params: Value) -> Result<Value> {
///         Ok(json!({ "echo": params }))
///     }
/// }
/// ```
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn name(&self) -> &str;

    /// Run the tool.
    ///
    /// `params` is always a JSON object holding the sanitized parameters.
    /// An `Err` is recorded as a failed ledger entry with its message.
    async fn call(&self, params: Value) -> Result<Value>;
}

/// Tool name → handler.
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry pre-loaded with `web_search`, `file_reader`, and `code_analyzer`.
    pub fn with_builtins() -> Self {
        use crate::handlers::{CodeAnalyzer, FileReader, WebSearch};

        let mut registry = Self::new();
        registry.register(Arc::new(WebSearch));
        registry.register(Arc::new(FileReader));
        registry.register(Arc::new(CodeAnalyzer));
        registry
    }

    /// Register a handler, replacing any previous one with the same name.
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        self.handlers.insert(handler.name().to_string(), handler);
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// ContextSource
// ═══════════════════════════════════════════════════════════════════════

/// Extraction routine for one provider type.
///
/// Implementations read whatever they need from
/// [`ContextProvider::config`] and return one or more results. The
/// extractor caches every result it gets back.
#[async_trait]
pub trait ContextSource: Send + Sync {
    /// Provider type this routine serves (e.g. `"git"`).
    fn provider_type(&self) -> &str;

    async fn extract(&self, provider: &ContextProvider) -> Result<Vec<ExtractionResult>>;
}

/// Provider type → extraction routine.
pub struct SourceRegistry {
    sources: HashMap<String, Arc<dyn ContextSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: HashMap::new(),
        }
    }

    /// Registry pre-loaded with the `file`, `git`, `api`, and `database` sources.
    pub fn with_builtins() -> Self {
        use crate::source_api::ApiSource;
        use crate::source_database::DatabaseSource;
        use crate::source_file::FileSource;
        use crate::source_git::GitSource;

        let mut registry = Self::new();
        registry.register(Arc::new(FileSource));
        registry.register(Arc::new(GitSource));
        registry.register(Arc::new(ApiSource));
        registry.register(Arc::new(DatabaseSource));
        registry
    }

    pub fn register(&mut self, source: Arc<dyn ContextSource>) {
        self.sources
            .insert(source.provider_type().to_string(), source);
    }

    pub fn find(&self, provider_type: &str) -> Option<Arc<dyn ContextSource>> {
        self.sources.get(provider_type).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// CommentSink
// ═══════════════════════════════════════════════════════════════════════

/// Destination for bot comments on a pull request.
#[async_trait]
pub trait CommentSink: Send + Sync {
    async fn post(&self, pr_number: i64, body: &str) -> Result<()>;
}

/// Writes comments to the log instead of a git host.
pub struct LogCommentSink;

#[async_trait]
impl CommentSink for LogCommentSink {
    async fn post(&self, pr_number: i64, body: &str) -> Result<()> {
        tracing::info!(pr_number, "posting comment to PR #{}:\n{}", pr_number, body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registries() {
        let handlers = HandlerRegistry::with_builtins();
        assert_eq!(
            handlers.names(),
            vec!["code_analyzer", "file_reader", "web_search"]
        );

        let sources = SourceRegistry::with_builtins();
        assert_eq!(sources.len(), 4);
        for t in ["file", "git", "api", "database"] {
            assert!(sources.find(t).is_some(), "missing source {}", t);
        }
        assert!(sources.find("s3").is_none());
    }
}
