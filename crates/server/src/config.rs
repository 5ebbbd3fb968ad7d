//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
/// - `NATS_URL`: message bus (default: `"nats://127.0.0.1:4222"`)
/// - `DATABASE_URL`: PostgreSQL store; unset keeps aggregates in memory
/// - `FSM_WORKFLOW_PATH`: JSON workflow attached to new services; unset uses
///   the built-in creation workflow
/// - `FSM_REQUEST_TIMEOUT_MS`: status tracker request timeout (default: `1000`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub nats_url: String,
    pub database_url: Option<String>,
    pub workflow_path: Option<PathBuf>,
    pub request_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port: non_empty("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: non_empty("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: non_empty("LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or(defaults.log_format),
            nats_url: non_empty("NATS_URL").unwrap_or(defaults.nats_url),
            database_url: non_empty("DATABASE_URL"),
            workflow_path: non_empty("FSM_WORKFLOW_PATH").map(PathBuf::from),
            request_timeout: non_empty("FSM_REQUEST_TIMEOUT_MS")
                .and_then(|ms| ms.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            nats_url: "nats://127.0.0.1:4222".to_string(),
            database_url: None,
            workflow_path: None,
            request_timeout: fsm::coordinator::DEFAULT_REQUEST_TIMEOUT,
        }
    }
}
