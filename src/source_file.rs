//! File context source.
//!
//! Works over a fixed set of sample source files instead of the real
//! filesystem. The provider config may narrow the set:
//!
//! ```json
//! { "basePath": "./", "includePatterns": ["src/**"], "excludePatterns": ["**/*.log"] }
//! ```
//!
//! For each selected file the source reports its language (by extension)
//! and the imports, exports, functions, and classes found in the content.
//! Keys are `file:<path>`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use mcp_runtime_core::models::{ContextProvider, ExtractionResult};

use crate::extractor::build_result;
use crate::traits::ContextSource;

const SAMPLE_FILES: &[(&str, &str)] = &[
    (
        "src/index.ts",
        "import express from 'express';\nimport { mcpSimulator } from './services/mcp-simulator';\n\nconst app = express();\napp.use(express.json());\n\napp.post('/api/mcp/execute', async (req, res) => {\n  const { toolId, params } = req.body;\n  const result = await mcpSimulator.executeTool(toolId, params);\n  res.json(result);\n});\n\napp.listen(3000);",
    ),
    (
        "src/components/App.tsx",
        "import React from 'react';\nimport { McpToolList } from './McpToolList';\n\nexport function App() {\n  return (\n    <div className=\"app\">\n      <h1>MCP Simulator</h1>\n      <McpToolList />\n    </div>\n  );\n}",
    ),
    (
        "src/utils/helpers.ts",
        "export function formatDate(date: Date): string {\n  return date.toISOString();\n}\n\nexport function parseJSON(text: string): any {\n  try {\n    return JSON.parse(text);\n  } catch {\n    return null;\n  }\n}",
    ),
    (
        "README.md",
        "# MCP Simulator\n\nA Model Context Protocol simulator.\n\n## Features\n- Tool execution simulation\n- Context extraction\n- GitHub integration\n\n## Usage\nSee documentation for details.",
    ),
];

static IMPORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*import\s[^;]*?from\s+['"]([^'"]+)['"]"#).expect("valid regex"));
static EXPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*export\s+(?:default\s+)?(?:async\s+)?(?:function|class|const|let|interface|type)\s+([A-Za-z_$][\w$]*)")
        .expect("valid regex")
});
static FUNCTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bfunction\s+([A-Za-z_$][\w$]*)").expect("valid regex"));
static CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bclass\s+([A-Za-z_$][\w$]*)").expect("valid regex"));

/// Structured view of one source file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContext {
    pub path: String,
    pub content: String,
    pub language: String,
    pub imports: Vec<String>,
    pub exports: Vec<String>,
    pub functions: Vec<String>,
    pub classes: Vec<String>,
}

pub fn language_for_path(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "ts" => "typescript",
        "tsx" => "typescript-react",
        "js" => "javascript",
        "jsx" => "javascript-react",
        "py" => "python",
        "rs" => "rust",
        "md" => "markdown",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        _ => "plaintext",
    }
}

fn captures(re: &Regex, content: &str) -> Vec<String> {
    let mut found: Vec<String> = re
        .captures_iter(content)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect();
    found.dedup();
    found
}

pub fn file_context(path: &str, content: &str) -> FileContext {
    FileContext {
        path: path.to_string(),
        content: content.to_string(),
        language: language_for_path(path).to_string(),
        imports: captures(&IMPORT_RE, content),
        exports: captures(&EXPORT_RE, content),
        functions: captures(&FUNCTION_RE, content),
        classes: captures(&CLASS_RE, content),
    }
}

fn pattern_list(config: &Value, key: &str) -> Vec<String> {
    config
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}

pub struct FileSource;

#[async_trait]
impl ContextSource for FileSource {
    fn provider_type(&self) -> &str {
        "file"
    }

    async fn extract(&self, provider: &ContextProvider) -> Result<Vec<ExtractionResult>> {
        let includes = pattern_list(&provider.config, "includePatterns");
        let include_set = build_globset(&includes)?;
        let exclude_set = build_globset(&pattern_list(&provider.config, "excludePatterns"))?;

        let mut results = Vec::new();
        for (path, content) in SAMPLE_FILES {
            if !includes.is_empty() && !include_set.is_match(path) {
                continue;
            }
            if exclude_set.is_match(path) {
                continue;
            }
            let ctx = file_context(path, content);
            let tags = vec![ctx.language.clone(), "source".to_string()];
            let value = serde_json::to_value(&ctx)?;
            results.push(build_result(
                provider.id,
                format!("file:{}", path),
                value,
                "file",
                tags,
            ));
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn provider(config: Value) -> ContextProvider {
        ContextProvider {
            id: 9,
            name: "files".to_string(),
            provider_type: "file".to_string(),
            config,
            enabled: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_language_for_path() {
        assert_eq!(language_for_path("src/a.ts"), "typescript");
        assert_eq!(language_for_path("App.TSX"), "typescript-react");
        assert_eq!(language_for_path("README.md"), "markdown");
        assert_eq!(language_for_path("Makefile"), "plaintext");
    }

    #[test]
    fn test_file_context_scans_content() {
        let (path, content) = SAMPLE_FILES[0];
        let ctx = file_context(path, content);
        assert_eq!(ctx.imports, vec!["express", "./services/mcp-simulator"]);

        let (path, content) = SAMPLE_FILES[2];
        let ctx = file_context(path, content);
        assert_eq!(ctx.exports, vec!["formatDate", "parseJSON"]);
        assert_eq!(ctx.functions, vec!["formatDate", "parseJSON"]);
        assert!(ctx.classes.is_empty());
    }

    #[tokio::test]
    async fn test_extract_all_samples_without_patterns() {
        let results = FileSource.extract(&provider(json!({}))).await.unwrap();
        assert_eq!(results.len(), SAMPLE_FILES.len());
        assert_eq!(results[0].key, "file:src/index.ts");
        assert_eq!(results[0].provider_id, 9);
        assert_eq!(
            results[0].metadata.tags.as_deref(),
            Some(&["typescript".to_string(), "source".to_string()][..])
        );
        let size = serde_json::to_vec(&results[0].value).unwrap().len();
        assert_eq!(results[0].metadata.size, size);
    }

    #[tokio::test]
    async fn test_extract_honours_patterns() {
        let results = FileSource
            .extract(&provider(json!({
                "includePatterns": ["src/**"],
                "excludePatterns": ["**/*.tsx"]
            })))
            .await
            .unwrap();
        let keys: Vec<&str> = results.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["file:src/index.ts", "file:src/utils/helpers.ts"]);
    }

    #[tokio::test]
    async fn test_invalid_glob_fails() {
        let err = FileSource
            .extract(&provider(json!({ "includePatterns": ["src/[a"] })))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid glob"));
    }
}
