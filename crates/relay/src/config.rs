// Relay server configuration.
//
// Centralizes environment variable parsing with defaults for local
// development.

use std::net::SocketAddr;

pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_MAX_FRAME_BYTES: usize = 65_536;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Core relay server configuration.
///
/// Constructed via [`RelayConfig::from_env`] which reads environment
/// variables and falls back to development defaults.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Listen address (host:port).
    pub listen_addr: SocketAddr,
    /// Comma-separated CORS origins (or `"*"` for any).
    pub cors_origins: Option<String>,
    /// Log filter directive (e.g. `info`, `parlor_relay=debug`).
    pub log_filter: String,
    pub log_format: LogFormat,
    /// Largest inbound websocket frame accepted, in bytes.
    pub max_frame_bytes: usize,
}

impl RelayConfig {
    /// Parse configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `PARLOR_RELAY_HOST` | `0.0.0.0` |
    /// | `PARLOR_RELAY_PORT` | `8787` |
    /// | `PARLOR_RELAY_CORS_ORIGINS` | *(none; cors.rs uses dev defaults)* |
    /// | `PARLOR_RELAY_LOG_FILTER` | `info` |
    /// | `PARLOR_RELAY_LOG_FORMAT` | `text` |
    /// | `PARLOR_RELAY_MAX_FRAME_BYTES` | `65536` |
    pub fn from_env() -> Self {
        Self::from_env_fn(|key| std::env::var(key))
    }

    /// Testable constructor that accepts an environment lookup function.
    fn from_env_fn<F>(env: F) -> Self
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let host = env("PARLOR_RELAY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env("PARLOR_RELAY_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let listen_addr = format!("{host}:{port}")
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], port)));

        let cors_origins = env("PARLOR_RELAY_CORS_ORIGINS").ok();

        let log_filter = env("PARLOR_RELAY_LOG_FILTER").unwrap_or_else(|_| "info".into());
        let log_format = match env("PARLOR_RELAY_LOG_FORMAT").as_deref().map(str::trim) {
            Ok(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        let max_frame_bytes = env("PARLOR_RELAY_MAX_FRAME_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|bytes: &usize| *bytes > 0)
            .unwrap_or(DEFAULT_MAX_FRAME_BYTES);

        Self { listen_addr, cors_origins, log_filter, log_format, max_frame_bytes }
    }
}
