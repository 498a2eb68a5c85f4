//! API context source: an OpenAPI-like endpoint catalog for the configured
//! `endpoint`. Key is `api:<endpoint>`.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use mcp_runtime_core::models::{ContextProvider, ExtractionResult};

use crate::extractor::build_result;
use crate::traits::ContextSource;

fn endpoint_catalog(endpoint: &str) -> Value {
    json!({
        "endpoint": endpoint,
        "endpoints": [
            {
                "path": "/api/v1/tools",
                "method": "GET",
                "description": "List all available MCP tools",
                "parameters": [],
                "response": {
                    "type": "array",
                    "items": { "$ref": "#/definitions/McpTool" }
                }
            },
            {
                "path": "/api/v1/tools/:id/execute",
                "method": "POST",
                "description": "Execute a specific MCP tool",
                "parameters": [
                    { "name": "id", "in": "path", "type": "integer", "required": true },
                    { "name": "params", "in": "body", "type": "object", "required": true }
                ],
                "response": {
                    "type": "object",
                    "properties": {
                        "success": { "type": "boolean" },
                        "data": { "type": "any" },
                        "error": { "type": "string" }
                    }
                }
            }
        ],
        "definitions": {
            "McpTool": {
                "type": "object",
                "properties": {
                    "id": { "type": "integer" },
                    "name": { "type": "string" },
                    "description": { "type": "string" },
                    "schema": { "type": "object" }
                }
            }
        }
    })
}

pub struct ApiSource;

#[async_trait]
impl ContextSource for ApiSource {
    fn provider_type(&self) -> &str {
        "api"
    }

    async fn extract(&self, provider: &ContextProvider) -> Result<Vec<ExtractionResult>> {
        let endpoint = provider
            .config
            .get("endpoint")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("api provider '{}' has no endpoint configured", provider.name))?;

        Ok(vec![build_result(
            provider.id,
            format!("api:{}", endpoint),
            endpoint_catalog(endpoint),
            "api",
            vec!["documentation".to_string(), "rest-api".to_string()],
        )])
    }
}
