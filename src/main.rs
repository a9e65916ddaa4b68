//! # Lever Harness CLI (`lvr`)
//!
//! The `lvr` binary is the primary interface for Lever Harness. It provides
//! commands for candidate search, profile retrieval, posting and pipeline
//! inspection, and starting the MCP server.
//!
//! ## Usage
//!
//! ```bash
//! LEVER_API_KEY=... lvr --config ./config/lvr.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lvr search "<query>"` | Search candidates by name or email |
//! | `lvr quick-find <name_or_email>` | Fast single-candidate lookup |
//! | `lvr get <opportunity_id>` | Retrieve a full candidate profile |
//! | `lvr roles` | List published job postings |
//! | `lvr stages` | List pipeline stages |
//! | `lvr tools list` | List all MCP tools with schemas |
//! | `lvr serve mcp` | Start the MCP-compatible HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Find a candidate by email
//! lvr search "ada@example.com"
//!
//! # Broad name search, restricted to a stage
//! lvr search "Jon" --stage stage-uuid --limit 5
//!
//! # Start MCP server for Cursor integration
//! lvr serve mcp --config ./config/lvr.toml
//! ```

mod client;
mod config;
mod error;
mod mcp;
mod record;
mod search;
mod server;
mod tools;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;

use crate::client::LeverClient;
use crate::tools::{validate_params, ToolContext, ToolRegistry};

/// Lever Harness CLI — a rate-limited MCP gateway to the Lever recruiting
/// API.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. The `LEVER_API_KEY` environment variable must be set.
#[derive(Parser)]
#[command(
    name = "lvr",
    about = "Lever Harness — a rate-limited MCP gateway to the Lever recruiting API",
    version,
    long_about = "Lever Harness wraps the Lever ATS API behind a concurrency-limited client \
    and exposes candidate search, profile retrieval, and pipeline actions as MCP tools \
    for Cursor, Claude, and other AI agents. Name searches are performed client-side \
    over bounded page scans, since the upstream API has no free-text query support."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/lvr.toml`. A missing file falls back to
    /// built-in defaults; the API key always comes from the environment.
    #[arg(long, global = true, default_value = "./config/lvr.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Search candidates by name or email.
    ///
    /// Email queries are resolved server-side and are exact. Name queries
    /// scan a bounded number of pages client-side; the output flags when
    /// the scan budget cut the search short.
    Search {
        /// Name fragment or email address.
        query: String,

        /// Restrict to a pipeline stage (stage id).
        #[arg(long)]
        stage: Option<String>,

        /// Maximum number of results to return.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Quickly find a specific candidate by name or email.
    ///
    /// Checks only the first few pages with bidirectional name matching.
    /// Prefer email when known.
    QuickFind {
        /// Candidate name or email.
        name_or_email: String,
    },

    /// Retrieve a candidate's full profile by opportunity id.
    Get {
        /// Opportunity id.
        opportunity_id: String,
    },

    /// List published job postings.
    Roles {
        /// Maximum number of postings to return.
        #[arg(long, default_value_t = 25)]
        limit: usize,
    },

    /// List pipeline stages with their ids.
    Stages,

    /// Inspect the MCP tool surface.
    Tools {
        #[command(subcommand)]
        action: ToolAction,
    },

    /// Start the MCP-compatible HTTP server.
    ///
    /// Exposes every tool via `POST /tools/{name}` and the standard MCP
    /// Streamable HTTP endpoint at `/mcp`.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },
}

/// Tool inspection subcommands.
#[derive(Subcommand)]
enum ToolAction {
    /// List all registered tools with their parameter schemas.
    List,
}

/// Server subcommands.
#[derive(Subcommand)]
enum ServeService {
    /// Start the MCP tool server.
    ///
    /// Binds to the address configured in `[server].bind`.
    Mcp,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lever_harness=info")),
        )
        .init();

    let cli = Cli::parse();

    // Listing tools needs no credentials.
    if let Commands::Tools {
        action: ToolAction::List,
    } = &cli.command
    {
        let registry = ToolRegistry::with_builtins();
        for tool in registry.tools() {
            println!("{} — {}", tool.name(), tool.description());
            println!(
                "{}",
                serde_json::to_string_pretty(&tool.parameters_schema())?
            );
            println!();
        }
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Search {
            query,
            stage,
            limit,
        } => {
            let mut params = json!({ "query": query, "limit": limit });
            if let Some(stage) = stage {
                params["stage"] = json!(stage);
            }
            run_tool(&cfg, "lever_search_candidates", params).await?;
        }
        Commands::QuickFind { name_or_email } => {
            run_tool(
                &cfg,
                "lever_quick_find_candidate",
                json!({ "name_or_email": name_or_email }),
            )
            .await?;
        }
        Commands::Get { opportunity_id } => {
            run_tool(
                &cfg,
                "lever_get_candidate",
                json!({ "opportunity_id": opportunity_id }),
            )
            .await?;
        }
        Commands::Roles { limit } => {
            run_tool(&cfg, "lever_list_open_roles", json!({ "limit": limit })).await?;
        }
        Commands::Stages => {
            run_tool(&cfg, "lever_get_stages", json!({})).await?;
        }
        Commands::Serve { service } => match service {
            ServeService::Mcp => {
                server::run_server(&cfg).await?;
            }
        },
        Commands::Tools { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Execute one tool through the same validation and dispatch path the
/// server uses, and pretty-print the JSON result.
async fn run_tool(
    cfg: &config::Config,
    name: &str,
    params: serde_json::Value,
) -> anyhow::Result<()> {
    let registry = ToolRegistry::with_builtins();
    let tool = registry
        .find(name)
        .ok_or_else(|| anyhow::anyhow!("no tool registered with name: {}", name))?;

    let config = Arc::new(cfg.clone());
    let client = Arc::new(LeverClient::new(&config)?);
    let ctx = ToolContext::new(config, client);

    let params = validate_params(&tool.parameters_schema(), &params)?;
    let result = tool.execute(params, &ctx).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
