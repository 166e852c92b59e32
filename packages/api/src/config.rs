//! Service configuration read from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use actors::DispatcherConfig;
use db::DbConfig;

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything the service needs to start.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub listen_addr: SocketAddr,
    pub db: DbConfig,
    pub dispatcher: DispatcherConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            db: DbConfig::memory(),
            dispatcher: DispatcherConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Read configuration from process environment variables.
    ///
    /// | variable            | default        |
    /// |---------------------|----------------|
    /// | `LISTEN_ADDR`       | `0.0.0.0:8080` |
    /// | `STORAGE_BACKEND`   | `memory`       |
    /// | `SURREAL_ENDPOINT`  | `mem://`       |
    /// | `SURREAL_NAMESPACE` | `encoding`     |
    /// | `SURREAL_DATABASE`  | `main`         |
    /// | `SURREAL_USER` / `SURREAL_PASS` | unset |
    /// | `ENCODER_WORKERS`   | `2`            |
    /// | `ENCODER_QUEUE_SIZE`| `64`           |
    /// | `ENCODER_POLL_MS`   | `50`           |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through `lookup`, which returns the value of a
    /// variable if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("LISTEN_ADDR") {
            config.listen_addr = parse("LISTEN_ADDR", addr)?;
        }

        let backend = lookup("STORAGE_BACKEND").unwrap_or_else(|| "memory".into());
        config.db = match backend.as_str() {
            "memory" => DbConfig::memory(),
            "surreal" => {
                let endpoint = lookup("SURREAL_ENDPOINT").unwrap_or_else(|| "mem://".into());
                let mut db = DbConfig::remote(endpoint);
                if let Some(ns) = lookup("SURREAL_NAMESPACE") {
                    db = db.with_namespace(ns);
                }
                if let Some(name) = lookup("SURREAL_DATABASE") {
                    db = db.with_database(name);
                }
                if let (Some(user), Some(pass)) = (lookup("SURREAL_USER"), lookup("SURREAL_PASS")) {
                    db = db.with_credentials(user, pass);
                }
                db
            }
            other => {
                return Err(ConfigError::Invalid {
                    var: "STORAGE_BACKEND",
                    value: other.to_string(),
                    reason: "expected memory or surreal".into(),
                });
            }
        };

        if let Some(workers) = lookup("ENCODER_WORKERS") {
            let workers: usize = parse("ENCODER_WORKERS", workers)?;
            config.dispatcher = config.dispatcher.with_workers(workers);
        }
        if let Some(size) = lookup("ENCODER_QUEUE_SIZE") {
            let size: usize = parse("ENCODER_QUEUE_SIZE", size)?;
            if size == 0 {
                return Err(ConfigError::Invalid {
                    var: "ENCODER_QUEUE_SIZE",
                    value: size.to_string(),
                    reason: "must be at least 1".into(),
                });
            }
            config.dispatcher = config.dispatcher.with_max_pending(size);
        }
        if let Some(ms) = lookup("ENCODER_POLL_MS") {
            let ms: u64 = parse("ENCODER_POLL_MS", ms)?;
            config.dispatcher = config
                .dispatcher
                .with_poll_interval(Duration::from_millis(ms.max(1)));
        }

        Ok(config)
    }
}

fn parse<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let parsed = value.trim().parse::<T>();
    parsed.map_err(|e| ConfigError::Invalid {
        var,
        reason: e.to_string(),
        value,
    })
}
