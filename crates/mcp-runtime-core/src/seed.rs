//! Reference catalog loaded into a fresh store.
//!
//! Three built-in tools (`web_search`, `file_reader`, `code_analyzer`) and
//! three context providers (git, file, api). Seeding goes through the
//! [`Store`] trait, so any backend can be populated the same way.

use anyhow::Result;
use serde_json::{json, Value};

use crate::models::{NewProvider, NewTool};
use crate::store::Store;

/// Tool definitions for the built-in handlers.
pub fn builtin_tools() -> Vec<NewTool> {
    vec![
        NewTool {
            name: "web_search".to_string(),
            description: "Search the web for information".to_string(),
            schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Search query" },
                    "limit": { "type": "number", "description": "Number of results", "default": 10 }
                },
                "required": ["query"]
            }),
            category: "search".to_string(),
            enabled: true,
        },
        NewTool {
            name: "file_reader".to_string(),
            description: "Read file contents from the filesystem".to_string(),
            schema: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "File path" },
                    "encoding": { "type": "string", "description": "File encoding", "default": "utf8" }
                },
                "required": ["path"]
            }),
            category: "file".to_string(),
            enabled: true,
        },
        NewTool {
            name: "code_analyzer".to_string(),
            description: "Analyze code structure and dependencies".to_string(),
            schema: json!({
                "type": "object",
                "properties": {
                    "filePath": { "type": "string", "description": "Path to analyze" },
                    "analysisType": {
                        "type": "string",
                        "enum": ["dependencies", "structure", "complexity"],
                        "description": "Type of analysis"
                    }
                },
                "required": ["filePath", "analysisType"]
            }),
            category: "analysis".to_string(),
            enabled: true,
        },
    ]
}

fn provider(name: &str, provider_type: &str, config: Value) -> NewProvider {
    NewProvider {
        name: name.to_string(),
        provider_type: provider_type.to_string(),
        config,
        enabled: true,
    }
}

/// Context providers for the sample workspace.
pub fn sample_providers() -> Vec<NewProvider> {
    vec![
        provider(
            "GitHub Repository",
            "git",
            json!({
                "repository": "https://github.com/example/repo",
                "branch": "main",
                "includePatterns": ["**/*.ts", "**/*.tsx"],
                "excludePatterns": ["node_modules/**", "dist/**"]
            }),
        ),
        provider(
            "Project Files",
            "file",
            json!({
                "basePath": "./",
                "includePatterns": ["src/**", "docs/**"],
                "excludePatterns": ["**/*.log", "**/.git/**"]
            }),
        ),
        provider(
            "API Documentation",
            "api",
            json!({
                "endpoint": "https://api.example.com/docs",
                "authType": "bearer",
                "refreshInterval": 3600
            }),
        ),
    ]
}

/// Load the reference tools and providers into `store`.
pub async fn seed_catalog(store: &dyn Store) -> Result<()> {
    for tool in builtin_tools() {
        store.create_tool(tool).await?;
    }
    for provider in sample_providers() {
        store.create_provider(provider).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;

    #[tokio::test]
    async fn test_seed_catalog() {
        let store = InMemoryStore::new();
        seed_catalog(&store).await.unwrap();

        let tools = store.list_tools().await.unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["web_search", "file_reader", "code_analyzer"]);
        assert!(tools.iter().all(|t| t.enabled));
        assert_eq!(tools[2].required_params(), vec!["filePath", "analysisType"]);

        let providers = store.list_providers().await.unwrap();
        assert_eq!(providers.len(), 3);
        assert_eq!(providers[0].provider_type, "git");
    }
}
