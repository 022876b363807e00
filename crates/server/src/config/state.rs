use std::collections::BTreeMap;

use serde::Deserialize;

/// Configuration for the quota store backend.
#[derive(Debug, Deserialize)]
pub struct StateConfig {
    /// Which backend to use. Only `"memory"` ships today.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Default limits overriding the built-in ones, keyed by resource name.
    ///
    /// ```toml
    /// [state.defaults]
    /// cores = 40
    /// instances = -1
    /// ```
    #[serde(default)]
    pub defaults: BTreeMap<String, i64>,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            defaults: BTreeMap::new(),
        }
    }
}

fn default_backend() -> String {
    "memory".to_owned()
}
