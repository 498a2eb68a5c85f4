//! Database context source.
//!
//! Describes a two-table schema (`mcp_tools`, `mcp_requests`) joined by a
//! many-to-one foreign key. The provider config is not consulted. Key is
//! `database:schema`.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use mcp_runtime_core::models::{ContextProvider, ExtractionResult};

use crate::extractor::build_result;
use crate::traits::ContextSource;

fn schema_description() -> Value {
    json!({
        "tables": [
            {
                "name": "mcp_tools",
                "columns": [
                    { "name": "id", "type": "serial", "primary": true },
                    { "name": "name", "type": "text", "nullable": false },
                    { "name": "description", "type": "text", "nullable": false },
                    { "name": "schema", "type": "json", "nullable": false },
                    { "name": "created_at", "type": "timestamp", "default": "now()" }
                ],
                "indexes": ["idx_mcp_tools_name"],
                "rowCount": 10
            },
            {
                "name": "mcp_requests",
                "columns": [
                    { "name": "id", "type": "serial", "primary": true },
                    { "name": "tool_id", "type": "integer", "foreign": "mcp_tools.id" },
                    { "name": "input", "type": "json", "nullable": false },
                    { "name": "output", "type": "json" },
                    { "name": "status", "type": "text", "nullable": false },
                    { "name": "created_at", "type": "timestamp", "default": "now()" }
                ],
                "indexes": ["idx_mcp_requests_tool_id", "idx_mcp_requests_status"],
                "rowCount": 156
            }
        ],
        "relationships": [
            {
                "from": "mcp_requests.tool_id",
                "to": "mcp_tools.id",
                "type": "many-to-one"
            }
        ],
        "engine": "postgresql"
    })
}

pub struct DatabaseSource;

#[async_trait]
impl ContextSource for DatabaseSource {
    fn provider_type(&self) -> &str {
        "database"
    }

    async fn extract(&self, provider: &ContextProvider) -> Result<Vec<ExtractionResult>> {
        Ok(vec![build_result(
            provider.id,
            "database:schema".to_string(),
            schema_description(),
            "database",
            vec!["schema".to_string(), "postgresql".to_string()],
        )])
    }
}
