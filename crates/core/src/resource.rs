use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Extension that enables the server-group resources.
pub const SERVER_GROUP_QUOTAS_EXTENSION: &str = "os-server-group-quotas";

/// A countable dimension that can carry a quota limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum QuotaResource {
    Instances,
    Cores,
    Ram,
    FloatingIps,
    FixedIps,
    MetadataItems,
    InjectedFiles,
    InjectedFileContentBytes,
    InjectedFilePathBytes,
    SecurityGroups,
    SecurityGroupRules,
    ServerGroups,
    ServerGroupMembers,
    KeyPairs,
}

impl QuotaResource {
    /// Every known resource, in wire order.
    pub const ALL: [Self; 14] = [
        Self::Instances,
        Self::Cores,
        Self::Ram,
        Self::FloatingIps,
        Self::FixedIps,
        Self::MetadataItems,
        Self::InjectedFiles,
        Self::InjectedFileContentBytes,
        Self::InjectedFilePathBytes,
        Self::SecurityGroups,
        Self::SecurityGroupRules,
        Self::ServerGroups,
        Self::ServerGroupMembers,
        Self::KeyPairs,
    ];

    /// Return the wire name of the resource.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Instances => "instances",
            Self::Cores => "cores",
            Self::Ram => "ram",
            Self::FloatingIps => "floating_ips",
            Self::FixedIps => "fixed_ips",
            Self::MetadataItems => "metadata_items",
            Self::InjectedFiles => "injected_files",
            Self::InjectedFileContentBytes => "injected_file_content_bytes",
            Self::InjectedFilePathBytes => "injected_file_path_bytes",
            Self::SecurityGroups => "security_groups",
            Self::SecurityGroupRules => "security_group_rules",
            Self::ServerGroups => "server_groups",
            Self::ServerGroupMembers => "server_group_members",
            Self::KeyPairs => "key_pairs",
        }
    }

    /// The extension that must be enabled for this resource to be exposed,
    /// or `None` when the resource is always available.
    #[must_use]
    pub fn required_extension(self) -> Option<&'static str> {
        match self {
            Self::ServerGroups | Self::ServerGroupMembers => Some(SERVER_GROUP_QUOTAS_EXTENSION),
            _ => None,
        }
    }

    /// Built-in default limit applied when no explicit record exists.
    #[must_use]
    pub fn default_limit(self) -> i64 {
        match self {
            Self::Instances
            | Self::FloatingIps
            | Self::SecurityGroups
            | Self::ServerGroups
            | Self::ServerGroupMembers => 10,
            Self::Cores | Self::SecurityGroupRules => 20,
            Self::Ram => 51_200,
            Self::FixedIps => -1,
            Self::MetadataItems => 128,
            Self::InjectedFiles => 5,
            Self::InjectedFileContentBytes => 10_240,
            Self::InjectedFilePathBytes => 255,
            Self::KeyPairs => 100,
        }
    }
}

impl fmt::Display for QuotaResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuotaResource {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownResource(s.to_owned()))
    }
}

/// Feature-flag registry consulted to gate conditional resources.
pub trait ExtensionRegistry: Send + Sync {
    /// Whether the named extension is loaded.
    fn is_extension_enabled(&self, name: &str) -> bool;

    /// The resources exposed under the active extension set, in wire order.
    fn supported_resources(&self) -> Vec<QuotaResource> {
        QuotaResource::ALL
            .into_iter()
            .filter(|r| {
                r.required_extension()
                    .is_none_or(|ext| self.is_extension_enabled(ext))
            })
            .collect()
    }
}

/// An [`ExtensionRegistry`] backed by a fixed set of extension names.
#[derive(Debug, Clone, Default)]
pub struct StaticExtensions {
    enabled: BTreeSet<String>,
}

impl StaticExtensions {
    /// Build a registry with the given extensions enabled.
    pub fn new<I, S>(enabled: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled: enabled.into_iter().map(Into::into).collect(),
        }
    }

    /// A registry with every known extension enabled.
    #[must_use]
    pub fn all() -> Self {
        Self::new([SERVER_GROUP_QUOTAS_EXTENSION])
    }
}

impl ExtensionRegistry for StaticExtensions {
    fn is_extension_enabled(&self, name: &str) -> bool {
        self.enabled.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip_through_from_str() {
        for resource in QuotaResource::ALL {
            let parsed: QuotaResource = resource.as_str().parse().unwrap();
            assert_eq!(parsed, resource);
        }
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&QuotaResource::InjectedFileContentBytes).unwrap();
        assert_eq!(json, "\"injected_file_content_bytes\"");
    }

    #[test]
    fn unknown_resource_is_rejected() {
        let err = "gpus".parse::<QuotaResource>().unwrap_err();
        assert!(matches!(err, ValidationError::UnknownResource(ref name) if name == "gpus"));
    }

    #[test]
    fn server_group_resources_need_extension() {
        let none = StaticExtensions::default();
        let supported = none.supported_resources();
        assert_eq!(supported.len(), 12);
        assert!(!supported.contains(&QuotaResource::ServerGroups));
        assert!(!supported.contains(&QuotaResource::ServerGroupMembers));

        let all = StaticExtensions::all();
        assert_eq!(all.supported_resources().len(), 14);
    }

    #[test]
    fn fixed_ips_default_is_unlimited() {
        assert_eq!(QuotaResource::FixedIps.default_limit(), -1);
        assert_eq!(QuotaResource::Ram.default_limit(), 51_200);
    }
}
