//! Composition root: wires one store into the dispatcher, extractor, and bot.

use std::sync::Arc;

use anyhow::Result;

use mcp_runtime_core::seed::seed_catalog;
use mcp_runtime_core::store::memory::InMemoryStore;
use mcp_runtime_core::store::Store;

use crate::bot::PrBot;
use crate::config::Config;
use crate::dispatcher::ToolDispatcher;
use crate::extractor::ContextExtractor;
use crate::traits::{CommentSink, HandlerRegistry, LogCommentSink, SourceRegistry};

/// The assembled runtime services sharing one [`Store`].
pub struct Runtime {
    pub store: Arc<dyn Store>,
    pub dispatcher: Arc<ToolDispatcher>,
    pub extractor: Arc<ContextExtractor>,
    pub bot: Arc<PrBot>,
}

impl Runtime {
    /// In-memory store, seeded when `[seed].enabled`, with the built-in
    /// handlers and context sources.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        if config.seed.enabled {
            seed_catalog(store.as_ref()).await?;
        }
        Ok(Self::assemble(
            config,
            store,
            HandlerRegistry::with_builtins(),
            SourceRegistry::with_builtins(),
            Arc::new(LogCommentSink),
        ))
    }

    /// Build the services over caller-supplied parts.
    pub fn assemble(
        config: &Config,
        store: Arc<dyn Store>,
        handlers: HandlerRegistry,
        sources: SourceRegistry,
        comments: Arc<dyn CommentSink>,
    ) -> Self {
        let dispatcher = Arc::new(
            ToolDispatcher::new(store.clone(), Arc::new(handlers))
                .with_timeout(config.dispatcher.timeout()),
        );
        let extractor = Arc::new(
            ContextExtractor::new(store.clone(), Arc::new(sources)).with_ttl(config.cache.ttl()),
        );
        let bot = Arc::new(
            PrBot::new(store.clone(), dispatcher.clone(), extractor.clone(), comments)
                .with_command_prefix(config.bot.command_prefix.clone()),
        );

        Self {
            store,
            dispatcher,
            extractor,
            bot,
        }
    }
}
