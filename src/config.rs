use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub relationships: RelationshipSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

/// PostgreSQL settings; without a URL the in-memory store is used
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    /// Upper bound on waiting for a user's lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Attempts after a storage conflict before giving up
    #[serde(default = "default_conflict_retries")]
    pub conflict_retries: u32,
    #[serde(default = "default_undo_window_secs")]
    pub undo_window_secs: u64,
}

impl MatchingSettings {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
            conflict_retries: default_conflict_retries(),
            undo_window_secs: default_undo_window_secs(),
        }
    }
}

fn default_lock_timeout_ms() -> u64 { 5_000 }
fn default_conflict_retries() -> u32 { 3 }
fn default_undo_window_secs() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct RelationshipSettings {
    #[serde(default = "default_friend_requests_per_day")]
    pub friend_requests_per_day: u32,
    #[serde(default = "default_min_friend_request_length")]
    pub min_friend_request_length: usize,
}

impl Default for RelationshipSettings {
    fn default() -> Self {
        Self {
            friend_requests_per_day: default_friend_requests_per_day(),
            min_friend_request_length: default_min_friend_request_length(),
        }
    }
}

fn default_friend_requests_per_day() -> u32 { 5 }
fn default_min_friend_request_length() -> usize { 10 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with LUME_)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., LUME__MATCHING__LOCK_TIMEOUT_MS -> matching.lock_timeout_ms
            .add_source(
                Environment::with_prefix("LUME")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("LUME")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// The conventional DATABASE_URL wins over configured values
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    let mut builder = Config::builder().add_source(settings);

    if let Ok(database_url) = std::env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", database_url)?;
    }

    builder.build()
}
