mod extensions;
mod identity;
mod policy;
mod server;
mod state;
mod telemetry;


pub use extensions::*;
pub use identity::*;
pub use policy::*;
pub use server::*;
pub use state::*;
pub use telemetry::*;

use std::path::Path;

use serde::Deserialize;

use crate::error::ServerError;

/// Top-level configuration for the Canopy server, loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct CanopyConfig {
    /// HTTP server bind configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Quota store backend configuration.
    #[serde(default)]
    pub state: StateConfig,
    /// Project hierarchy lookups.
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Policy rule overrides.
    #[serde(default)]
    pub policy: PolicyConfig,
    /// API extensions gating optional resources.
    #[serde(default)]
    pub extensions: ExtensionsConfig,
    /// OpenTelemetry distributed tracing configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl CanopyConfig {
    /// Read the configuration at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))
    }
}
