//! # MCP Runtime CLI (`mcpd`)
//!
//! ## Usage
//!
//! ```bash
//! mcpd --config ./config/mcp.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mcpd serve` | Start the JSON HTTP API |
//! | `mcpd tools` | List the tool catalog |
//! | `mcpd call <id> --param k=v` | Execute a tool and print the outcome |
//! | `mcpd extract [provider_id]` | Extract one provider, or all of them |
//! | `mcpd search "<query>"` | Extract all providers, then search the cache |
//! | `mcpd webhook <event> <payload.json>` | Run one webhook delivery through the bot |
//! | `mcpd completions <shell>` | Print a shell completion script |
//!
//! Every command except `serve` runs against a fresh in-memory store, so
//! state does not persist between invocations.

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;

use mcp_runtime::config;
use mcp_runtime::logging;
use mcp_runtime::runtime::Runtime;
use mcp_runtime::server;

/// A simulated MCP runtime: tool dispatch, context extraction, and PR automation.
#[derive(Parser)]
#[command(name = "mcpd", version)]
struct Cli {
    /// Path to configuration file (TOML). Defaults apply when it is absent.
    #[arg(long, global = true, default_value = "./config/mcp.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API on `[server].bind`.
    Serve,

    /// List registered tools.
    Tools,

    /// Execute a tool by id.
    Call {
        /// Tool id.
        tool_id: i64,

        /// Tool parameters as `key=value` pairs. Values are parsed as JSON
        /// when possible and kept as strings otherwise.
        #[arg(long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },

    /// Extract context from one provider, or from every enabled provider.
    Extract {
        /// Provider id. Omit to extract all.
        provider_id: Option<i64>,
    },

    /// Search cached context values.
    Search {
        /// Case-insensitive substring to look for.
        query: String,
    },

    /// Feed a webhook payload file to the PR bot.
    Webhook {
        /// Event name (`pull_request`, `push`, `issue_comment`).
        event: String,

        /// Path to the JSON payload.
        payload: PathBuf,
    },

    /// Print a shell completion script.
    Completions {
        shell: Shell,
    },
}

/// Parse a `key=value` pair for `--param` arguments.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn params_object(pairs: Vec<(String, String)>) -> Value {
    let map: Map<String, Value> = pairs
        .into_iter()
        .map(|(k, v)| {
            let value = serde_json::from_str(&v).unwrap_or(Value::String(v));
            (k, value)
        })
        .collect();
    Value::Object(map)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "mcpd", &mut std::io::stdout());
        return Ok(());
    }

    logging::init();
    let cfg = config::load_config(&cli.config)?;

    if let Commands::Serve = cli.command {
        return server::run_server(&cfg).await;
    }

    let rt = Runtime::from_config(&cfg).await?;

    match cli.command {
        Commands::Tools => {
            let tools = rt.store.list_tools().await?;
            if tools.is_empty() {
                println!("No tools registered.");
            }
            for t in tools {
                let state = if t.enabled { "enabled" } else { "disabled" };
                println!("{:>3}  {:<16} [{}] {} ({})", t.id, t.name, t.category, t.description, state);
            }
        }
        Commands::Call { tool_id, params } => {
            let outcome = rt.dispatcher.execute(tool_id, Some(params_object(params))).await?;
            print_json(&outcome)?;
        }
        Commands::Extract { provider_id } => {
            let results = match provider_id {
                Some(id) => rt.extractor.extract_context(id).await?,
                None => rt.extractor.extract_all_contexts().await?,
            };
            print_json(&results)?;
        }
        Commands::Search { query } => {
            rt.extractor.extract_all_contexts().await?;
            let results = rt.extractor.search_context(&query).await?;
            print_json(&results)?;
        }
        Commands::Webhook { event, payload } => {
            let content = std::fs::read_to_string(&payload)
                .with_context(|| format!("Failed to read payload file: {}", payload.display()))?;
            let body: Value = serde_json::from_str(&content)
                .with_context(|| format!("Payload is not valid JSON: {}", payload.display()))?;
            rt.bot.handle_webhook(&event, body).await?;
            print_json(&rt.store.list_integrations().await?)?;
        }
        Commands::Serve | Commands::Completions { .. } => {}
    }

    Ok(())
}
