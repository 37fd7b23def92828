use std::time::Duration;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`). Applies until the
    /// response head is produced, so open SSE streams are not cut off.
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background services (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// How often SSE and WebSocket observers re-read a task (default: 500 ms).
    pub observer_interval: Duration,
    /// Evict terminal tasks older than this many hours. `None` keeps every
    /// task for the lifetime of the process.
    pub task_retention_hours: Option<u64>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `HOST`                  | `0.0.0.0`                  |
    /// | `PORT`                  | `8000`                     |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                       |
    /// | `OBSERVER_INTERVAL_MS`  | `500`                      |
    /// | `TASK_RETENTION_HOURS`  | unset (never evict)        |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let observer_interval_ms: u64 = std::env::var("OBSERVER_INTERVAL_MS")
            .unwrap_or_else(|_| "500".into())
            .parse()
            .expect("OBSERVER_INTERVAL_MS must be a valid u64");
        assert!(observer_interval_ms > 0, "OBSERVER_INTERVAL_MS must be positive");

        let task_retention_hours: Option<u64> = std::env::var("TASK_RETENTION_HOURS")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| {
                v.trim()
                    .parse()
                    .expect("TASK_RETENTION_HOURS must be a valid u64")
            });

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            observer_interval: Duration::from_millis(observer_interval_ms),
            task_retention_hours,
        }
    }
}
