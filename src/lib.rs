//! # MCP Runtime
//!
//! A simulated Model Context Protocol runtime: a catalog of schema-described
//! tools dispatched to handlers, typed context providers feeding a
//! time-bounded cache, and a pull-request bot that combines both whenever a
//! webhook arrives.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────┐
//!   HTTP / CLI ──▶│ ToolDispatcher│──▶ ToolHandler (web_search, file_reader, code_analyzer)
//!        │        └──────┬───────┘
//!        │               │ ledger
//!        │        ┌──────▼───────┐
//!        ├───────▶│    Store     │◀── ContextExtractor ──▶ ContextSource (file, git, api, database)
//!        │        └──────▲───────┘
//!        │               │ integrations
//!        │        ┌──────┴───────┐
//!   webhook ─────▶│    PrBot     │──▶ CommentSink
//!                 └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! mcpd tools                                   # list the seeded catalog
//! mcpd call 1 --param query=rust --param limit=5
//! mcpd extract                                 # extract every provider
//! mcpd search postgresql
//! mcpd serve                                   # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Service-level error taxonomy |
//! | [`logging`] | tracing subscriber setup |
//! | [`traits`] | Handler, source, and comment sink extension points |
//! | [`sanitize`] | Tool parameter sanitization |
//! | [`handlers`] | Built-in tool handlers |
//! | [`dispatcher`] | Tool execution with timeout and request ledger |
//! | [`source_file`] | File context source |
//! | [`source_git`] | Git context source |
//! | [`source_api`] | API documentation source |
//! | [`source_database`] | Database schema source |
//! | [`extractor`] | Context extraction and cache |
//! | [`webhook`] | Webhook payload types |
//! | [`bot`] | Pull-request automation |
//! | [`runtime`] | Service wiring |
//! | [`rate_limit`] | Per-client quota on `/api` routes |
//! | [`server`] | JSON HTTP API |

pub mod bot;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod extractor;
pub mod handlers;
pub mod logging;
pub mod rate_limit;
pub mod runtime;
pub mod sanitize;
pub mod server;
pub mod source_api;
pub mod source_database;
pub mod source_file;
pub mod source_git;
pub mod traits;
pub mod webhook;

pub use mcp_runtime_core::{models, seed, store};
