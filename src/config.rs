use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Environment variable holding the Lever API token.
pub const API_KEY_ENV: &str = "LEVER_API_KEY";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub lever: LeverConfig,
    pub search: SearchConfig,
    pub server: ServerConfig,
    /// API token. Never read from the config file; injected from the
    /// environment by [`load_config`].
    #[serde(skip)]
    pub api_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lever: LeverConfig::default(),
            search: SearchConfig::default(),
            server: ServerConfig::default(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LeverConfig {
    pub base_url: String,
    /// Permit pool size. Lever enforces 10 requests/second; this must stay
    /// strictly below that ceiling to absorb scheduling jitter.
    pub concurrent_requests: usize,
    pub timeout_secs: u64,
    /// Upstream per-page maximum. Oversized `limit` parameters are clamped
    /// to this, never rejected.
    pub page_size_max: u32,
}

impl Default for LeverConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.lever.co/v1".to_string(),
            concurrent_requests: 8,
            timeout_secs: 30,
            page_size_max: 100,
        }
    }
}

/// Page and record budgets for the client-side scan variants.
///
/// Each search variant carries its own budget: the broad scan is kept small
/// to bound latency, quick-find slightly larger, and the posting-scoped scan
/// much larger since the result set is already narrowed server-side.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub broad_page_budget: usize,
    pub quick_find_page_budget: usize,
    pub quick_find_limit: usize,
    /// Record (not page) budget for posting-scoped scans.
    pub posting_scan_budget: usize,
    /// When any client-side category filter is active, fetch this many times
    /// the requested limit before giving up, since most records are discarded.
    pub filtered_fetch_multiplier: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            broad_page_budget: 2,
            quick_find_page_budget: 3,
            quick_find_limit: 5,
            posting_scan_budget: 1000,
            filtered_fetch_multiplier: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:7331".to_string(),
        }
    }
}

/// Load configuration, overlaying the API token from the environment.
///
/// The TOML file is optional — a missing file yields defaults — but the
/// `LEVER_API_KEY` environment variable is required and its absence is a
/// fatal startup condition, not a per-call error.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str::<Config>(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };

    config.api_key = std::env::var(API_KEY_ENV)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .with_context(|| format!("{} environment variable is required", API_KEY_ENV))?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.lever.base_url.trim().is_empty() {
        anyhow::bail!("lever.base_url must not be empty");
    }
    if config.lever.concurrent_requests == 0 {
        anyhow::bail!("lever.concurrent_requests must be >= 1");
    }
    if config.lever.page_size_max == 0 || config.lever.page_size_max > 100 {
        anyhow::bail!("lever.page_size_max must be in 1..=100");
    }
    if config.search.broad_page_budget == 0
        || config.search.quick_find_page_budget == 0
        || config.search.posting_scan_budget == 0
    {
        anyhow::bail!("search budgets must be >= 1");
    }
    if config.search.filtered_fetch_multiplier == 0 {
        anyhow::bail!("search.filtered_fetch_multiplier must be >= 1");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_pass_validation() {
        let config = Config::default();
        assert!(validate(&config).is_ok());
        assert_eq!(config.lever.concurrent_requests, 8);
        assert_eq!(config.lever.page_size_max, 100);
        assert_eq!(config.search.broad_page_budget, 2);
    }

    #[test]
    fn test_page_size_over_upstream_max_rejected() {
        let mut config = Config::default();
        config.lever.page_size_max = 250;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_budget_rejected() {
        let mut config = Config::default();
        config.search.broad_page_budget = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_load_config_file_and_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lvr.toml");
        std::fs::write(&path, "[lever]\nconcurrent_requests = 2\n").unwrap();
        std::env::set_var(API_KEY_ENV, "test-token");

        let config = load_config(&path).unwrap();
        assert_eq!(config.lever.concurrent_requests, 2);
        assert_eq!(config.api_key, "test-token");

        // A missing file falls back to defaults, key still from the env.
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.lever.concurrent_requests, 8);
        assert_eq!(config.api_key, "test-token");
    }

    #[test]
    fn test_partial_toml_overlays_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [lever]
            concurrent_requests = 4

            [server]
            bind = "0.0.0.0:9000"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.lever.concurrent_requests, 4);
        assert_eq!(parsed.lever.timeout_secs, 30);
        assert_eq!(parsed.server.bind, "0.0.0.0:9000");
        assert_eq!(parsed.search.quick_find_limit, 5);
    }
}
