//! Git context source.
//!
//! Produces a single repository summary for the configured repository and
//! branch (default `main`) without contacting any git host. The result key
//! is `git:<repository>:<branch>`.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::Value;

use mcp_runtime_core::models::{ContextProvider, ExtractionResult};

use crate::extractor::build_result;
use crate::source_file::FileContext;
use crate::traits::ContextSource;

pub const DEFAULT_BRANCH: &str = "main";

#[derive(Debug, Clone, Serialize)]
pub struct CommitInfo {
    pub hash: String,
    pub message: String,
    pub author: String,
    pub date: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryMetadata {
    pub last_commit: String,
    pub contributors: Vec<String>,
    pub file_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GitContext {
    pub repository: String,
    pub branch: String,
    pub commits: Vec<CommitInfo>,
    pub files: Vec<FileContext>,
    pub metadata: RepositoryMetadata,
}

/// Cache key for a repository/branch pair.
pub fn git_key(repository: &str, branch: &str) -> String {
    format!("git:{}:{}", repository, branch)
}

fn simulated_context(repository: &str, branch: &str) -> GitContext {
    let now = Utc::now();
    GitContext {
        repository: repository.to_string(),
        branch: branch.to_string(),
        commits: vec![
            CommitInfo {
                hash: "abc123".to_string(),
                message: "feat: Add MCP simulator".to_string(),
                author: "dev@example.com".to_string(),
                date: now.to_rfc3339(),
            },
            CommitInfo {
                hash: "def456".to_string(),
                message: "fix: Update context extraction".to_string(),
                author: "dev@example.com".to_string(),
                date: (now - Duration::days(1)).to_rfc3339(),
            },
        ],
        files: Vec::new(),
        metadata: RepositoryMetadata {
            last_commit: "abc123".to_string(),
            contributors: vec![
                "dev@example.com".to_string(),
                "contributor@example.com".to_string(),
            ],
            file_count: 42,
        },
    }
}

pub struct GitSource;

#[async_trait]
impl ContextSource for GitSource {
    fn provider_type(&self) -> &str {
        "git"
    }

    async fn extract(&self, provider: &ContextProvider) -> Result<Vec<ExtractionResult>> {
        let repository = provider
            .config
            .get("repository")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("git provider '{}' has no repository configured", provider.name))?;
        let branch = provider
            .config
            .get("branch")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_BRANCH);

        let ctx = simulated_context(repository, branch);
        let value = serde_json::to_value(&ctx)?;
        Ok(vec![build_result(
            provider.id,
            git_key(repository, branch),
            value,
            "git",
            vec!["repository".to_string(), "version-control".to_string()],
        )])
    }
}
