//! # MCP Runtime Core
//!
//! Entity models, the [`store::Store`] persistence trait, an in-memory
//! backend, and the reference seed catalog.
//!
//! This crate contains no tokio, HTTP, or CLI dependencies; the runtime
//! services in `mcp-runtime` are built on top of it.

pub mod models;
pub mod seed;
pub mod store;
