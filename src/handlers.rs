//! Built-in tool handlers.
//!
//! All three are synthetic: no network or filesystem access happens. Their
//! output shapes are fixed so that callers (and the PR bot) can rely on them.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use crate::traits::ToolHandler;

pub const WEB_SEARCH_DEFAULT_LIMIT: u64 = 10;
pub const WEB_SEARCH_MAX_LIMIT: u64 = 50;

/// `web_search(query, limit = 10)`.
///
/// Returns `limit` results with a random `relevanceScore` in `[0, 1)`,
/// sorted descending, and `totalResults = limit * 10`.
pub struct WebSearch;

fn parse_limit(params: &Value) -> Result<u64> {
    let raw = match params.get("limit") {
        None => return Ok(WEB_SEARCH_DEFAULT_LIMIT),
        Some(v) => v,
    };
    let limit = match raw.as_f64() {
        Some(f) => f.trunc(),
        None => bail!("limit must be a number"),
    };
    if !(1.0..=WEB_SEARCH_MAX_LIMIT as f64).contains(&limit) {
        bail!("limit must be between 1 and {}", WEB_SEARCH_MAX_LIMIT);
    }
    Ok((limit as u64).min(WEB_SEARCH_MAX_LIMIT))
}

#[async_trait]
impl ToolHandler for WebSearch {
    fn name(&self) -> &str {
        "web_search"
    }

    async fn call(&self, params: Value) -> Result<Value> {
        let query = match params.get("query").and_then(Value::as_str) {
            Some(q) if !q.trim().is_empty() => q,
            Some(_) => bail!("query must not be empty"),
            None => bail!("query must be a string"),
        };
        let limit = parse_limit(&params)?;

        let mut results: Vec<Value> = (1..=limit)
            .map(|i| {
                json!({
                    "title": format!("Result {} for: {}", i, query),
                    "url": format!("https://example.com/result-{}", i),
                    "snippet": format!(
                        "This is a simulated search result for the query \"{}\".",
                        query
                    ),
                    "relevanceScore": rand::random::<f64>(),
                })
            })
            .collect();
        results.sort_by(|a, b| {
            let sa = a["relevanceScore"].as_f64().unwrap_or(0.0);
            let sb = b["relevanceScore"].as_f64().unwrap_or(0.0);
            sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(json!({
            "query": query,
            "totalResults": limit * 10,
            "results": results,
        }))
    }
}

/// `file_reader(path, encoding = "utf8")` with fabricated content.
pub struct FileReader;

#[async_trait]
impl ToolHandler for FileReader {
    fn name(&self) -> &str {
        "file_reader"
    }

    async fn call(&self, params: Value) -> Result<Value> {
        let path = match params.get("path").and_then(Value::as_str) {
            Some(p) => p,
            None => bail!("path must be a string"),
        };
        let encoding = params
            .get("encoding")
            .and_then(Value::as_str)
            .unwrap_or("utf8");

        Ok(json!({
            "path": path,
            "encoding": encoding,
            "content": format!(
                "// Simulated content of file: {}\n\nexport function example() {{\n  console.log(\"This is simulated file content\");\n}}\n",
                path
            ),
            "metadata": {
                "size": 1024,
                "lastModified": Utc::now().to_rfc3339(),
                "mimeType": "text/plain",
            },
        }))
    }
}

/// `code_analyzer(filePath, analysisType)` returning canned analyses.
///
/// An unknown `analysisType` is not an error: the result carries
/// `{"error": "Unknown analysis type"}`.
pub struct CodeAnalyzer;

pub fn canned_analysis(analysis_type: &str) -> Value {
    match analysis_type {
        "dependencies" => json!({
            "imports": ["react", "express", "@shared/schema"],
            "exports": ["McpSimulator", "McpContext"],
            "externalDependencies": 12,
            "internalDependencies": 5,
        }),
        "structure" => json!({
            "classes": 3,
            "functions": 15,
            "interfaces": 7,
            "linesOfCode": 250,
            "complexity": "medium",
        }),
        "complexity" => json!({
            "cyclomaticComplexity": 8,
            "cognitiveComplexity": 12,
            "maintainabilityIndex": 75,
            "technicalDebt": "2 hours",
        }),
        _ => json!({ "error": "Unknown analysis type" }),
    }
}

#[async_trait]
impl ToolHandler for CodeAnalyzer {
    fn name(&self) -> &str {
        "code_analyzer"
    }

    async fn call(&self, params: Value) -> Result<Value> {
        let file_path = params.get("filePath").cloned().unwrap_or(Value::Null);
        let analysis_type = params.get("analysisType").cloned().unwrap_or(Value::Null);
        let result = canned_analysis(analysis_type.as_str().unwrap_or_default());

        Ok(json!({
            "filePath": file_path,
            "analysisType": analysis_type,
            "result": result,
        }))
    }
}
