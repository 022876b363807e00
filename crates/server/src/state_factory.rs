use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use canopy_core::{ExtensionRegistry, QuotaResource, StaticExtensions};
use canopy_engine::{QuotaSetService, RolePolicy};
use canopy_identity::{
    IdentityService, KeystoneIdentityServiceBuilder, ProjectRecord, StaticIdentityService,
};
use canopy_state::QuotaStore;
use canopy_state_memory::MemoryQuotaStore;

use crate::config::{CanopyConfig, ExtensionsConfig, IdentityConfig, StateConfig};
use crate::error::ServerError;

/// Create the quota store selected by `config.backend`.
pub fn create_store(config: &StateConfig) -> Result<Arc<dyn QuotaStore>, ServerError> {
    let defaults = parse_defaults(&config.defaults)?;
    match config.backend.as_str() {
        "memory" => {
            info!(overrides = defaults.len(), "using in-memory quota store");
            Ok(Arc::new(MemoryQuotaStore::new().with_defaults(&defaults)))
        }
        other => Err(ServerError::Config(format!(
            "unsupported state backend: {other}"
        ))),
    }
}

fn parse_defaults(
    raw: &BTreeMap<String, i64>,
) -> Result<BTreeMap<QuotaResource, i64>, ServerError> {
    raw.iter()
        .map(|(name, limit)| {
            let resource: QuotaResource = name
                .parse()
                .map_err(|e| ServerError::Config(format!("[state.defaults]: {e}")))?;
            if *limit < -1 {
                return Err(ServerError::Config(format!(
                    "[state.defaults]: {name} must be -1 or greater, got {limit}"
                )));
            }
            Ok((resource, *limit))
        })
        .collect()
}

/// Create the identity service selected by `config.backend`.
pub fn create_identity(config: &IdentityConfig) -> Result<Arc<dyn IdentityService>, ServerError> {
    match config.backend.as_str() {
        "static" => {
            let service = StaticIdentityService::new(config.projects.iter().map(|p| {
                match &p.parent_id {
                    Some(parent) => ProjectRecord::child(p.id.as_str(), parent.as_str()),
                    None => ProjectRecord::root(p.id.as_str()),
                }
            }));
            info!(projects = service.len(), "using static project hierarchy");
            Ok(Arc::new(service))
        }
        "keystone" => {
            let url = config.url.as_deref().ok_or_else(|| {
                ServerError::Config("identity.url is required for the keystone backend".into())
            })?;
            let service = KeystoneIdentityServiceBuilder::new(url)
                .timeout(Duration::from_secs(config.timeout_seconds))
                .build()
                .map_err(|e| ServerError::Config(e.to_string()))?;
            info!(url = %service.base_url(), "using keystone project hierarchy");
            Ok(Arc::new(service))
        }
        other => Err(ServerError::Config(format!(
            "unsupported identity backend: {other}"
        ))),
    }
}

pub fn create_extensions(config: &ExtensionsConfig) -> Arc<dyn ExtensionRegistry> {
    Arc::new(StaticExtensions::new(config.enabled.iter().cloned()))
}

/// Wire every collaborator named in `config` into a [`QuotaSetService`].
pub fn create_service(config: &CanopyConfig) -> Result<QuotaSetService, ServerError> {
    let policy = RolePolicy::from_rules(&config.policy.rules)
        .map_err(|e| ServerError::Config(format!("[policy.rules]: {e}")))?;

    QuotaSetService::builder()
        .store(create_store(&config.state)?)
        .identity(create_identity(&config.identity)?)
        .policy(Arc::new(policy))
        .extensions(create_extensions(&config.extensions))
        .build()
        .map_err(|e| ServerError::Config(e.to_string()))
}
