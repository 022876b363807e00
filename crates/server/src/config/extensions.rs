use serde::Deserialize;

use canopy_core::SERVER_GROUP_QUOTAS_EXTENSION;

/// API extensions that expose optional quota resources.
#[derive(Debug, Deserialize)]
pub struct ExtensionsConfig {
    /// Enabled extension names. An empty list hides every optional resource.
    #[serde(default = "default_enabled")]
    pub enabled: Vec<String>,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
        }
    }
}

fn default_enabled() -> Vec<String> {
    vec![SERVER_GROUP_QUOTAS_EXTENSION.to_owned()]
}
