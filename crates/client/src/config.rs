//! Client configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Connection settings for the docq client.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// HTTP base URL of the queue backend (default: `http://localhost:8000`).
    pub api_url: String,
    /// WebSocket base URL of the queue backend (default: `ws://localhost:8000`).
    pub ws_url: String,
    /// Reconnect delay in milliseconds (default: `5000`).
    pub reconnect_delay_ms: u64,
    /// Where the durable client identity is persisted
    /// (default: `.docq/identity`).
    pub identity_path: PathBuf,
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default                 |
    /// |----------------------|-------------------------|
    /// | `QUEUE_API_URL`      | `http://localhost:8000` |
    /// | `QUEUE_WS_URL`       | `ws://localhost:8000`   |
    /// | `RECONNECT_DELAY_MS` | `5000`                  |
    /// | `IDENTITY_PATH`      | `.docq/identity`        |
    pub fn from_env() -> Self {
        let api_url =
            std::env::var("QUEUE_API_URL").unwrap_or_else(|_| "http://localhost:8000".into());

        let ws_url = std::env::var("QUEUE_WS_URL").unwrap_or_else(|_| "ws://localhost:8000".into());

        let reconnect_delay_ms: u64 = std::env::var("RECONNECT_DELAY_MS")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .expect("RECONNECT_DELAY_MS must be a valid u64");

        let identity_path =
            PathBuf::from(std::env::var("IDENTITY_PATH").unwrap_or_else(|_| ".docq/identity".into()));

        Self {
            api_url,
            ws_url,
            reconnect_delay_ms,
            identity_path,
        }
    }

    /// Reconnect delay as a [`Duration`].
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}
