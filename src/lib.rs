//! # Lever Harness
//!
//! A rate-limited MCP gateway to the Lever recruiting API.
//!
//! Lever Harness wraps the Lever ATS REST API behind a concurrency-limited
//! client and exposes candidate search, profile retrieval, and pipeline
//! actions as MCP tools for Cursor, Claude, and other AI agents. The
//! upstream API has no free-text search, so name, company, skill, and
//! location matching run client-side over bounded paginated scans.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌──────────────┐
//! │  Tools   │──▶│   Search    │──▶│ LeverClient  │──▶ api.lever.co
//! │ (17 MCP) │   │  (budgets)  │   │ (permit pool)│
//! └────┬─────┘   └─────────────┘   └──────────────┘
//!      │
//!      ├──────────────┬──────────────┐
//!      ▼              ▼              ▼
//! ┌──────────┐  ┌──────────┐  ┌──────────┐
//! │   CLI    │  │   HTTP   │  │   MCP    │
//! │  (lvr)   │  │ /tools/* │  │   /mcp   │
//! └──────────┘  └──────────┘  └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export LEVER_API_KEY=...
//! lvr search "ada@example.com"          # exact email lookup
//! lvr quick-find "Jon Smith"            # bounded name scan
//! lvr roles                             # published postings
//! lvr serve mcp                         # start the MCP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and search budgets |
//! | [`error`] | Typed client errors |
//! | [`client`] | Rate-limited HTTP client and pagination |
//! | [`record`] | Defensive field access over upstream records |
//! | [`search`] | Client-side matching engine |
//! | [`tools`] | Tool trait, registry, and the built-in tools |
//! | [`mcp`] | MCP JSON-RPC bridge |
//! | [`server`] | HTTP server |

pub mod client;
pub mod config;
pub mod error;
pub mod mcp;
pub mod record;
pub mod search;
pub mod server;
pub mod tools;
