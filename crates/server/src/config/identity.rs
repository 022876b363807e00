use serde::Deserialize;

/// Where project hierarchy information comes from.
///
/// # Example
///
/// ```toml
/// [identity]
/// backend = "keystone"
/// url = "http://keystone:5000"
/// timeout_seconds = 5
/// ```
///
/// With the `"static"` backend the tree is listed inline:
///
/// ```toml
/// [[identity.projects]]
/// id = "root"
///
/// [[identity.projects]]
/// id = "team-a"
/// parent_id = "root"
/// ```
#[derive(Debug, Deserialize)]
pub struct IdentityConfig {
    /// `"static"` or `"keystone"`.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Base URL of the identity API (keystone backend).
    pub url: Option<String>,
    /// Request timeout for the identity API.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Projects known to the static backend.
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
}

/// One project in a static hierarchy.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectEntry {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: None,
            timeout_seconds: default_timeout(),
            projects: Vec::new(),
        }
    }
}

fn default_backend() -> String {
    "static".to_owned()
}

fn default_timeout() -> u64 {
    10
}
