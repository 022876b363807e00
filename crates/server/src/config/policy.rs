use std::collections::BTreeMap;

use serde::Deserialize;

/// Policy rule overrides, merged over the built-in defaults.
///
/// ```toml
/// [policy.rules]
/// "quotas:update" = "role:admin or role:quota_manager"
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub rules: BTreeMap<String, String>,
}
