//! Server configuration
//!
//! Read from the TOML file named by `NBA_STATS_CONFIG`, then `./nba-stats.toml`,
//! falling back to defaults. `POSTGRES_*` and `REDIS_HOST` environment
//! variables override the file.

use nba_stats::PostgresConfig;
use serde::Deserialize;
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "NBA_STATS_CONFIG";

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "nba-stats.toml";

/// Server configuration loaded from TOML or environment
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP server address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Relational store
    #[serde(default)]
    pub database: PostgresConfig,

    /// Cache store
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Which cache gateway to run with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

/// Cache settings
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_backend")]
    pub backend: CacheBackend,

    #[serde(default = "default_redis_url")]
    pub redis_url: String,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_cache_backend() -> CacheBackend {
    CacheBackend::Redis
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            redis_url: default_redis_url(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            database: PostgresConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Apply deployment environment overrides
    ///
    /// The database URL is only replaced when all four `POSTGRES_*` variables are set.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let (Some(host), Some(user), Some(password), Some(db)) = (
            non_empty("POSTGRES_HOST"),
            non_empty("POSTGRES_USER"),
            non_empty("POSTGRES_PASSWORD"),
            non_empty("POSTGRES_DB"),
        ) {
            self.database.url =
                format!("postgresql://{user}:{password}@{host}/{db}?sslmode=disable");
            info!(host = %host, database = %db, "Database settings taken from environment");
        }

        if let Some(host) = non_empty("REDIS_HOST") {
            self.cache.redis_url = format!("redis://{host}:6379");
            info!(host = %host, "Redis host taken from environment");
        }
    }
}

/// Load configuration from file or environment
pub fn load_config() -> ServerConfig {
    let mut config = load_file_config();
    config.apply_env(|name| std::env::var(name).ok());
    config
}

fn load_file_config() -> ServerConfig {
    // Check environment variable first
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    info!(path = %path, "Loaded configuration from file");
                    return config;
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "Failed to parse config file, using defaults");
                }
            },
            Err(e) => {
                warn!(path = %path, error = %e, "Failed to read config file, using defaults");
            }
        }
    }

    if let Ok(content) = std::fs::read_to_string(DEFAULT_CONFIG_FILE) {
        match toml::from_str(&content) {
            Ok(config) => {
                info!("Loaded configuration from {}", DEFAULT_CONFIG_FILE);
                return config;
            }
            Err(e) => {
                warn!(error = %e, "Failed to parse {}, using defaults", DEFAULT_CONFIG_FILE);
            }
        }
    }

    info!("Using default configuration");
    ServerConfig::default()
}
