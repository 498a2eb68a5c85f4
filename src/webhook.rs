//! Webhook payload shapes consumed by the PR bot.
//!
//! Only the fields the bot reads are modelled; everything else in the
//! host's payload is ignored. Most fields are lenient (`#[serde(default)]`)
//! so that minimal payloads from tests and replays still parse.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::source_git::DEFAULT_BRANCH;

pub const BRANCH_REF_PREFIX: &str = "refs/heads/";

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub clone_url: String,
    #[serde(default)]
    pub default_branch: Option<String>,
}

impl Repository {
    pub fn default_branch(&self) -> &str {
        self.default_branch.as_deref().unwrap_or(DEFAULT_BRANCH)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    #[serde(default)]
    pub login: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeadRef {
    #[serde(rename = "ref", default)]
    pub name: String,
}

/// A changed file in a pull request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangedFile {
    pub filename: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user: User,
    #[serde(default)]
    pub head: HeadRef,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Not part of the host's event; replays may inline the file list.
    #[serde(default)]
    pub files: Vec<ChangedFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub pull_request: PullRequest,
    pub repository: Repository,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushCommit {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author: Value,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub repository: Repository,
    #[serde(default)]
    pub commits: Vec<PushCommit>,
}

impl PushEvent {
    pub fn branch(&self) -> &str {
        self.git_ref
            .strip_prefix(BRANCH_REF_PREFIX)
            .unwrap_or(&self.git_ref)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user: User,
    /// Present only when the issue is a pull request.
    #[serde(default)]
    pub pull_request: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueCommentEvent {
    pub issue: Issue,
    pub comment: Comment,
    pub repository: Repository,
}

/// Everything the analysis pipeline needs to know about one pull request.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrContext {
    pub repository: String,
    pub branch: String,
    pub pr_number: i64,
    pub title: String,
    pub description: String,
    pub files: Vec<ChangedFile>,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&PullRequestEvent> for PrContext {
    fn from(event: &PullRequestEvent) -> Self {
        let pr = &event.pull_request;
        let now = Utc::now();
        let branch = if pr.head.name.is_empty() {
            event.repository.default_branch().to_string()
        } else {
            pr.head.name.clone()
        };
        Self {
            repository: event.repository.clone_url.clone(),
            branch,
            pr_number: pr.number,
            title: pr.title.clone(),
            description: pr.body.clone().unwrap_or_default(),
            files: pr.files.clone(),
            author: pr.user.login.clone(),
            created_at: pr.created_at.unwrap_or(now),
            updated_at: pr.updated_at.unwrap_or(now),
        }
    }
}
