//! Pull-request automation driven by webhook events.
//!
//! | Event | Behaviour |
//! |-------|-----------|
//! | `pull_request` (`opened`, `synchronize`, `reopened`) | full analysis pipeline |
//! | `push` | one-shot `push_processed` record with the commit list |
//! | `issue_comment` on a PR, starting with the command prefix | `analyze`, `context`, `help` |
//! | anything else | logged and ignored |
//!
//! # Pipeline
//!
//! ```text
//! create integration (processing)
//!   → extract PR context (changed files + commit history)
//!   → analyze (canned report, refined with code_analyzer per file)
//!   → derive suggestions
//!   → update integration (completed, mcpContext = injected context)
//!   → post summary comment
//! ```
//!
//! Any error after the record is created marks it `failed`, stores the
//! message under `metadata.error`, and is returned to the caller.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Map, Value};

use mcp_runtime_core::models::{Integration, IntegrationStatus, IntegrationUpdate, NewIntegration};
use mcp_runtime_core::store::Store;

use crate::dispatcher::ToolDispatcher;
use crate::error::{McpError, McpResult};
use crate::extractor::ContextExtractor;
use crate::source_git::git_key;
use crate::traits::CommentSink;
use crate::webhook::{IssueCommentEvent, PrContext, PullRequestEvent, PushEvent};

pub const DEFAULT_COMMAND_PREFIX: &str = "/mcp";

const PR_ACTIONS: &[&str] = &["opened", "synchronize", "reopened"];

/// Quality scores below this trigger a refactoring suggestion.
pub const QUALITY_THRESHOLD: u32 = 80;

/// Descriptions shorter than this (in characters) trigger a suggestion.
pub const MIN_DESCRIPTION_LEN: usize = 50;

pub const DESCRIPTION_SUGGESTION: &str =
    "Add a more detailed description to help reviewers understand the changes";
pub const REFACTOR_SUGGESTION: &str =
    "Consider refactoring complex functions to improve maintainability";

// ═══════════════════════════════════════════════════════════════════════
// Analysis report
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QualityIssue {
    pub severity: String,
    pub file: String,
    pub line: u32,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CodeQuality {
    pub score: u32,
    pub issues: Vec<QualityIssue>,
    /// Fields merged in from `code_analyzer` results.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SecurityReport {
    pub vulnerabilities: Vec<String>,
    pub score: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PerformanceReport {
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DependencyReport {
    pub outdated: Vec<String>,
    pub security: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrAnalysis {
    pub code_quality: CodeQuality,
    pub security: SecurityReport,
    pub performance: PerformanceReport,
    pub dependencies: DependencyReport,
}

impl PrAnalysis {
    /// Baseline report before any tool refinement.
    pub fn baseline() -> Self {
        Self {
            code_quality: CodeQuality {
                score: 85,
                issues: vec![QualityIssue {
                    severity: "warning".to_string(),
                    file: "src/app.ts".to_string(),
                    line: 42,
                    message: "Unused variable 'temp'".to_string(),
                }],
                details: Map::new(),
            },
            security: SecurityReport {
                vulnerabilities: Vec::new(),
                score: 100,
            },
            performance: PerformanceReport {
                suggestions: vec![
                    "Consider using memo for expensive computations in React components"
                        .to_string(),
                    "Database queries could be optimized with proper indexing".to_string(),
                ],
            },
            dependencies: DependencyReport {
                outdated: vec!["express@4.17.1 (latest: 4.18.2)".to_string()],
                security: Vec::new(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InjectionMetadata {
    pub processed_at: String,
    pub tools_used: Vec<String>,
    pub context_providers: Vec<String>,
}

/// The payload stored as an integration's `mcpContext`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InjectedContext {
    pub repository: String,
    pub branch: String,
    pub pr_number: i64,
    pub extracted_context: Vec<Value>,
    pub analysis: PrAnalysis,
    pub suggestions: Vec<String>,
    pub metadata: InjectionMetadata,
}

/// Outcome of one successful PR pipeline run.
#[derive(Debug, Clone)]
pub struct InjectionResult {
    pub integration_id: i64,
    pub injected_context: InjectedContext,
    pub comment: String,
}

/// Suggestions derived from analysis thresholds and the PR description.
pub fn generate_suggestions(pr: &PrContext, analysis: &PrAnalysis) -> Vec<String> {
    let mut suggestions = Vec::new();

    if analysis.code_quality.score < QUALITY_THRESHOLD {
        suggestions.push(REFACTOR_SUGGESTION.to_string());
    }
    let outdated = analysis.dependencies.outdated.len();
    if outdated > 0 {
        suggestions.push(format!("Update {} outdated dependencies", outdated));
    }
    suggestions.extend(analysis.performance.suggestions.iter().cloned());
    if pr.description.chars().count() < MIN_DESCRIPTION_LEN {
        suggestions.push(DESCRIPTION_SUGGESTION.to_string());
    }

    suggestions
}

/// Markdown summary posted to the pull request.
pub fn format_comment(ctx: &InjectedContext) -> String {
    let analysis = &ctx.analysis;
    let mut out = String::from("## MCP Analysis Results\n\n");

    out.push_str("### Code Quality\n");
    out.push_str(&format!("- **Score**: {}/100\n", analysis.code_quality.score));
    if !analysis.code_quality.issues.is_empty() {
        out.push_str(&format!(
            "- **Issues Found**: {}\n",
            analysis.code_quality.issues.len()
        ));
    }
    out.push('\n');

    out.push_str("### Security\n");
    out.push_str(&format!("- **Score**: {}/100\n", analysis.security.score));
    let vulns = analysis.security.vulnerabilities.len();
    if vulns == 0 {
        out.push_str("- **Vulnerabilities**: None found\n\n");
    } else {
        out.push_str(&format!("- **Vulnerabilities**: {}\n\n", vulns));
    }

    if !ctx.suggestions.is_empty() {
        out.push_str("### Suggestions\n");
        for s in &ctx.suggestions {
            out.push_str(&format!("- {}\n", s));
        }
        out.push('\n');
    }

    out.push_str("### MCP Context\n");
    out.push_str(&format!(
        "- **Tools Used**: {}\n",
        ctx.metadata.tools_used.join(", ")
    ));
    out.push_str(&format!(
        "- **Context Providers**: {}\n",
        ctx.metadata.context_providers.join(", ")
    ));
    out.push_str(&format!("- **Processed At**: {}\n", ctx.metadata.processed_at));
    out
}

pub fn help_comment(prefix: &str) -> String {
    format!(
        "### MCP Bot Commands\n\
         - `{p} analyze` - Re-run MCP analysis\n\
         - `{p} context` - Show current MCP context\n\
         - `{p} help` - Show this help message",
        p = prefix
    )
}

fn parse_event<T: serde::de::DeserializeOwned>(event: &str, payload: Value) -> McpResult<T> {
    serde_json::from_value(payload).map_err(|e| McpError::InvalidPayload(format!("{}: {}", event, e)))
}

// ═══════════════════════════════════════════════════════════════════════
// PrBot
// ═══════════════════════════════════════════════════════════════════════

pub struct PrBot {
    store: Arc<dyn Store>,
    dispatcher: Arc<ToolDispatcher>,
    extractor: Arc<ContextExtractor>,
    comments: Arc<dyn CommentSink>,
    command_prefix: String,
}

impl PrBot {
    pub fn new(
        store: Arc<dyn Store>,
        dispatcher: Arc<ToolDispatcher>,
        extractor: Arc<ContextExtractor>,
        comments: Arc<dyn CommentSink>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            extractor,
            comments,
            command_prefix: DEFAULT_COMMAND_PREFIX.to_string(),
        }
    }

    pub fn with_command_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.command_prefix = prefix.into();
        self
    }

    /// Route one webhook delivery.
    ///
    /// Unknown events and irrelevant actions are not errors. Only a
    /// malformed payload or a pipeline failure returns `Err`.
    pub async fn handle_webhook(&self, event: &str, payload: Value) -> McpResult<()> {
        match event {
            "pull_request" => {
                let ev: PullRequestEvent = parse_event(event, payload)?;
                if PR_ACTIONS.contains(&ev.action.as_str()) {
                    self.process_pull_request(PrContext::from(&ev)).await?;
                } else {
                    tracing::debug!(action = %ev.action, "ignoring pull_request action");
                }
            }
            "push" => {
                let ev: PushEvent = parse_event(event, payload)?;
                self.process_push(&ev).await?;
            }
            "issue_comment" => {
                let ev: IssueCommentEvent = parse_event(event, payload)?;
                self.handle_comment(&ev).await?;
            }
            other => {
                tracing::warn!(event = %other, "no handler registered for webhook event");
            }
        }
        Ok(())
    }

    /// Run the full analysis pipeline for one pull request.
    pub async fn process_pull_request(&self, pr: PrContext) -> McpResult<InjectionResult> {
        let integration = self
            .store
            .create_integration(NewIntegration {
                repo_url: pr.repository.clone(),
                branch: pr.branch.clone(),
                pr_number: Some(pr.pr_number),
                status: IntegrationStatus::Processing,
                mcp_context: json!({}),
                metadata: json!({
                    "title": pr.title,
                    "author": pr.author,
                    "createdAt": pr.created_at.to_rfc3339(),
                }),
            })
            .await?;

        tracing::info!(
            integration_id = integration.id,
            pr_number = pr.pr_number,
            repository = %pr.repository,
            "processing pull request"
        );

        match self.run_pipeline(&pr, integration.id).await {
            Ok(result) => Ok(result),
            Err(err) => {
                let mut metadata = integration.metadata.clone();
                metadata["error"] = Value::String(err.to_string());
                self.store
                    .update_integration(
                        integration.id,
                        IntegrationUpdate {
                            status: Some(IntegrationStatus::Failed),
                            metadata: Some(metadata),
                            ..Default::default()
                        },
                    )
                    .await?;
                tracing::error!(
                    integration_id = integration.id,
                    pr_number = pr.pr_number,
                    error = %err,
                    "pull request pipeline failed"
                );
                Err(err)
            }
        }
    }

    async fn run_pipeline(&self, pr: &PrContext, integration_id: i64) -> McpResult<InjectionResult> {
        let extracted_context = self.extract_pr_context(pr).await?;
        let (analysis, tools_used) = self.analyze(pr).await?;
        let suggestions = generate_suggestions(pr, &analysis);

        let mut context_providers = vec!["git".to_string()];
        if !pr.files.is_empty() {
            context_providers.push("file".to_string());
        }

        let injected = InjectedContext {
            repository: pr.repository.clone(),
            branch: pr.branch.clone(),
            pr_number: pr.pr_number,
            extracted_context,
            analysis,
            suggestions,
            metadata: InjectionMetadata {
                processed_at: Utc::now().to_rfc3339(),
                tools_used,
                context_providers,
            },
        };

        let mcp_context =
            serde_json::to_value(&injected).map_err(|e| McpError::Store(e.into()))?;
        self.store
            .update_integration(
                integration_id,
                IntegrationUpdate {
                    status: Some(IntegrationStatus::Completed),
                    mcp_context: Some(mcp_context),
                    ..Default::default()
                },
            )
            .await?;

        let comment = format_comment(&injected);
        self.post_comment(pr.pr_number, &comment).await?;

        Ok(InjectionResult {
            integration_id,
            injected_context: injected,
            comment,
        })
    }

    /// Changed files plus commit history, taken from the cached git context
    /// for the PR's repository and branch when one is still fresh.
    async fn extract_pr_context(&self, pr: &PrContext) -> McpResult<Vec<Value>> {
        let mut contexts: Vec<Value> = pr
            .files
            .iter()
            .map(|f| {
                json!({
                    "type": "file",
                    "path": f.filename,
                    "changes": {
                        "additions": f.additions,
                        "deletions": f.deletions,
                        "status": f.status,
                    }
                })
            })
            .collect();

        let recent_commits = self
            .extractor
            .get_cached_context(&git_key(&pr.repository, &pr.branch))
            .await?
            .and_then(|item| item.value.get("commits").cloned())
            .unwrap_or_else(|| json!([]));

        contexts.push(json!({
            "type": "commits",
            "branch": pr.branch,
            "recentCommits": recent_commits,
        }));

        Ok(contexts)
    }

    /// Returns the report and the names of the tools actually invoked.
    async fn analyze(&self, pr: &PrContext) -> McpResult<(PrAnalysis, Vec<String>)> {
        let mut analysis = PrAnalysis::baseline();
        let mut tools_used = Vec::new();

        let analyzer = self.store.find_tool_by_name("code_analyzer").await?;
        if let Some(tool) = analyzer {
            for file in &pr.files {
                let outcome = self
                    .dispatcher
                    .execute(
                        tool.id,
                        Some(json!({
                            "filePath": file.filename,
                            "analysisType": "complexity",
                        })),
                    )
                    .await?;
                if tools_used.is_empty() {
                    tools_used.push(tool.name.clone());
                }
                match outcome.data {
                    Some(Value::Object(data)) if outcome.success => {
                        for (k, v) in data {
                            if k != "score" && k != "issues" {
                                analysis.code_quality.details.insert(k, v);
                            }
                        }
                    }
                    _ => {
                        tracing::debug!(
                            file = %file.filename,
                            error = ?outcome.error,
                            "code_analyzer refinement skipped"
                        );
                    }
                }
            }
        }

        Ok((analysis, tools_used))
    }

    async fn post_comment(&self, pr_number: i64, body: &str) -> McpResult<()> {
        self.comments
            .post(pr_number, body)
            .await
            .map_err(|e| McpError::Comment(e.to_string()))
    }

    /// Record a push as a one-shot `push_processed` integration.
    pub async fn process_push(&self, event: &PushEvent) -> McpResult<Integration> {
        let commits: Vec<Value> = event
            .commits
            .iter()
            .map(|c| {
                json!({
                    "id": c.id,
                    "message": c.message,
                    "author": c.author,
                    "timestamp": c.timestamp,
                })
            })
            .collect();
        let commit_count = commits.len();

        let integration = self
            .store
            .create_integration(NewIntegration {
                repo_url: event.repository.clone_url.clone(),
                branch: event.branch().to_string(),
                pr_number: None,
                status: IntegrationStatus::PushProcessed,
                mcp_context: json!({ "commits": commits }),
                metadata: json!({ "event": "push", "commitCount": commit_count }),
            })
            .await?;

        tracing::info!(
            integration_id = integration.id,
            branch = %integration.branch,
            commits = commit_count,
            "push processed"
        );
        Ok(integration)
    }

    /// Most recent integration record for a PR number in a repository.
    async fn latest_integration(&self, repo_url: &str, pr_number: i64) -> McpResult<Option<Integration>> {
        let integrations = self.store.list_integrations().await?;
        Ok(integrations
            .into_iter()
            .filter(|i| i.pr_number == Some(pr_number) && i.repo_url == repo_url)
            .max_by_key(|i| i.id))
    }

    async fn handle_comment(&self, event: &IssueCommentEvent) -> McpResult<()> {
        if event.issue.pull_request.is_none() {
            return Ok(());
        }
        let mut words = event.comment.body.split_whitespace();
        if words.next() != Some(self.command_prefix.as_str()) {
            return Ok(());
        }

        let pr_number = event.issue.number;
        let repo_url = event.repository.clone_url.as_str();

        match words.next() {
            Some("analyze") => {
                let pr = self.rebuild_pr_context(event).await?;
                self.process_pull_request(pr).await?;
            }
            Some("context") => match self.latest_integration(repo_url, pr_number).await? {
                Some(integration) => {
                    let pretty = serde_json::to_string_pretty(&integration.mcp_context)
                        .map_err(|e| McpError::Store(e.into()))?;
                    let body = format!("### Current MCP Context\n```json\n{}\n```", pretty);
                    self.post_comment(pr_number, &body).await?;
                }
                None => {
                    tracing::debug!(pr_number, "no stored MCP context for pull request");
                }
            },
            Some("help") => {
                self.post_comment(pr_number, &help_comment(&self.command_prefix))
                    .await?;
            }
            other => {
                tracing::debug!(command = ?other, "ignoring unrecognized bot command");
            }
        }
        Ok(())
    }

    /// PR context for a re-run: stored record first, then the issue payload.
    async fn rebuild_pr_context(&self, event: &IssueCommentEvent) -> McpResult<PrContext> {
        let issue = &event.issue;
        let now = Utc::now();
        let previous = self
            .latest_integration(&event.repository.clone_url, issue.number)
            .await?;

        let (branch, title, author) = match &previous {
            Some(i) => (
                i.branch.clone(),
                i.metadata
                    .get("title")
                    .and_then(Value::as_str)
                    .unwrap_or(issue.title.as_str())
                    .to_string(),
                i.metadata
                    .get("author")
                    .and_then(Value::as_str)
                    .unwrap_or(issue.user.login.as_str())
                    .to_string(),
            ),
            None => (
                event.repository.default_branch().to_string(),
                issue.title.clone(),
                issue.user.login.clone(),
            ),
        };

        Ok(PrContext {
            repository: event.repository.clone_url.clone(),
            branch,
            pr_number: issue.number,
            title,
            description: issue.body.clone().unwrap_or_default(),
            files: Vec::new(),
            author,
            created_at: previous.as_ref().map_or(now, |i| i.created_at),
            updated_at: now,
        })
    }
}
