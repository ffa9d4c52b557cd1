//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Feed, listing and search tuning.
    #[serde(default)]
    pub feed: FeedConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL (`postgres://...`, or `sqlite::memory:` for local runs).
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Seconds to wait when opening or acquiring a connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Seconds an unused pooled connection is kept open.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Log every SQL statement at debug level.
    #[serde(default)]
    pub log_statements: bool,
}

/// Page sizes and search tuning for feeds and listings.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Polls per page on the home feed.
    #[serde(default = "default_home_page_size")]
    pub home_page_size: u64,
    /// Polls per page on the explore listing.
    #[serde(default = "default_page_size")]
    pub explore_page_size: u64,
    /// Polls per page on a user's recent polls listing.
    #[serde(default = "default_page_size")]
    pub user_polls_page_size: u64,
    /// Results per page on the dedicated search pages.
    #[serde(default = "default_page_size")]
    pub search_page_size: u64,
    /// Results per kind on the combined search page.
    #[serde(default = "default_search_preview_size")]
    pub search_preview_size: u64,
    /// Minimum relevance (0-1) for a poll to appear in search results.
    #[serde(default = "default_search_rank_threshold")]
    pub search_rank_threshold: f32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            home_page_size: default_home_page_size(),
            explore_page_size: default_page_size(),
            user_polls_page_size: default_page_size(),
            search_page_size: default_page_size(),
            search_preview_size: default_search_preview_size(),
            search_rank_threshold: default_search_rank_threshold(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_connect_timeout_secs() -> u64 {
    10
}

const fn default_idle_timeout_secs() -> u64 {
    600
}

const fn default_home_page_size() -> u64 {
    5
}

const fn default_page_size() -> u64 {
    10
}

const fn default_search_preview_size() -> u64 {
    3
}

const fn default_search_rank_threshold() -> f32 {
    0.3
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `MYVOTE_ENV`)
    /// 4. Environment variables with `MYVOTE_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let env = std::env::var("MYVOTE_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("MYVOTE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("MYVOTE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a TOML string.
    pub fn from_toml_str(toml: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
