use serde::Deserialize;

/// HTTP server bind configuration.
///
/// ```toml
/// [server]
/// host = "0.0.0.0"
/// port = 8774
/// ```
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// How long in-flight requests may drain after SIGINT / SIGTERM.
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8774,
            shutdown_timeout_seconds: 30,
        }
    }
}
