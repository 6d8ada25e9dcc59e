use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config yaml {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid environment override {var}={value}")]
    InvalidOverride { var: &'static str, value: String },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub const ENV_POSTGRES_URL: &str = "TRANSFER_POSTGRES_URL";
pub const ENV_REDIS_URL: &str = "TRANSFER_REDIS_URL";
pub const ENV_SERVER_PORT: &str = "TRANSFER_SERVER_PORT";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub log: LogConfig,
    pub server: ServerConfig,
    /// PostgreSQL connection URL for account rows
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub lock: LockConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    /// hourly | daily | never
    pub rotation: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: "./logs".to_string(),
            log_file: "account_transfer.log".to_string(),
            use_json: false,
            rotation: "daily".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Drain budget for in-flight requests on SIGINT/SIGTERM
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
}

fn default_shutdown_timeout_secs() -> u64 {
    5
}

fn default_db_max_connections() -> u32 {
    10
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RedisConfig {
    #[serde(default)]
    pub url: Option<String>,
}

/// Distributed lock timing
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LockConfig {
    pub poll_interval_ms: u64,
    /// Budget per lock key, not per transfer
    pub acquire_timeout_ms: u64,
    /// 0 disables expiry
    pub lock_ttl_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
            acquire_timeout_ms: 100,
            lock_ttl_ms: 5000,
        }
    }
}

impl AppConfig {
    /// Load `config/{env}.yaml`.
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        Self::load_from(format!("config/{}.yaml", env))
    }

    /// Load an explicit file, apply environment overrides, validate.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: AppConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.apply_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Override connection settings from the environment. `lookup` is
    /// `std::env::var` outside tests.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = lookup(ENV_POSTGRES_URL) {
            self.postgres_url = Some(url);
        }
        if let Some(url) = lookup(ENV_REDIS_URL) {
            self.redis.url = Some(url);
        }
        if let Some(port) = lookup(ENV_SERVER_PORT) {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidOverride {
                var: ENV_SERVER_PORT,
                value: port,
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }
        if self.lock.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "lock.poll_interval_ms must be non-zero".into(),
            ));
        }
        if self.lock.acquire_timeout_ms < self.lock.poll_interval_ms {
            return Err(ConfigError::Invalid(format!(
                "lock.acquire_timeout_ms ({}) must be >= lock.poll_interval_ms ({})",
                self.lock.acquire_timeout_ms, self.lock.poll_interval_ms
            )));
        }
        if self.lock.lock_ttl_ms != 0 && self.lock.lock_ttl_ms < self.lock.acquire_timeout_ms {
            return Err(ConfigError::Invalid(format!(
                "lock.lock_ttl_ms ({}) must be 0 or >= lock.acquire_timeout_ms ({})",
                self.lock.lock_ttl_ms, self.lock.acquire_timeout_ms
            )));
        }
        if !matches!(self.log.rotation.as_str(), "hourly" | "daily" | "never") {
            return Err(ConfigError::Invalid(format!(
                "log.rotation must be hourly, daily or never (got {})",
                self.log.rotation
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const MINIMAL: &str = r#"
server:
  host: "127.0.0.1"
  port: 8080
"#;

    fn parse(yaml: &str) -> AppConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(MINIMAL);
        assert_eq!(config.lock, LockConfig::default());
        assert_eq!(config.lock.poll_interval_ms, 10);
        assert_eq!(config.lock.acquire_timeout_ms, 100);
        assert_eq!(config.server.shutdown_timeout_secs, 5);
        assert!(config.postgres_url.is_none());
        assert!(config.redis.url.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_lock_section() {
        let config = parse(
            r#"
server: { host: "0.0.0.0", port: 9000 }
lock:
  acquire_timeout_ms: 500
"#,
        );
        assert_eq!(config.lock.acquire_timeout_ms, 500);
        assert_eq!(config.lock.poll_interval_ms, 10);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = parse(MINIMAL);
        let env: HashMap<&str, &str> = [
            (ENV_POSTGRES_URL, "postgres://u:p@db/accounts"),
            (ENV_REDIS_URL, "redis://cache:6379"),
            (ENV_SERVER_PORT, "9090"),
        ]
        .into_iter()
        .collect();

        config
            .apply_overrides(|var| env.get(var).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.postgres_url.as_deref(), Some("postgres://u:p@db/accounts"));
        assert_eq!(config.redis.url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(config.server.port, 9090);
    }

    #[test]
    fn test_bad_port_override() {
        let mut config = parse(MINIMAL);
        let err = config
            .apply_overrides(|var| (var == ENV_SERVER_PORT).then(|| "http".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOverride { .. }));
    }

    #[test]
    fn test_validation() {
        let mut config = parse(MINIMAL);
        config.lock.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = parse(MINIMAL);
        config.lock.acquire_timeout_ms = 5;
        assert!(config.validate().is_err());

        let mut config = parse(MINIMAL);
        config.lock.lock_ttl_ms = 0;
        config.validate().unwrap();

        let mut config = parse(MINIMAL);
        config.log.rotation = "weekly".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::load_from("config/does-not-exist.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_shipped_dev_config_parses() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/dev.yaml");
        let content = std::fs::read_to_string(path).unwrap();
        let config: AppConfig = serde_yaml::from_str(&content).unwrap();
        config.validate().unwrap();
    }
}
