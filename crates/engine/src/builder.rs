use std::sync::Arc;

use canopy_core::{ExtensionRegistry, StaticExtensions};
use canopy_identity::IdentityService;
use canopy_state::QuotaStore;

use crate::allocation::AllocationEngine;
use crate::authorizer::QuotaAuthorizer;
use crate::error::QuotaError;
use crate::hierarchy::HierarchyResolver;
use crate::metrics::QuotaMetrics;
use crate::policy::{PolicyEnforcer, RolePolicy};
use crate::service::QuotaSetService;

/// Fluent builder for constructing a [`QuotaSetService`].
///
/// A [`QuotaStore`] and an [`IdentityService`] must be supplied. The policy
/// defaults to [`RolePolicy::default`] and every extension is enabled unless
/// a registry is given.
#[derive(Default)]
pub struct QuotaSetServiceBuilder {
    store: Option<Arc<dyn QuotaStore>>,
    identity: Option<Arc<dyn IdentityService>>,
    policy: Option<Arc<dyn PolicyEnforcer>>,
    extensions: Option<Arc<dyn ExtensionRegistry>>,
    metrics: Option<Arc<QuotaMetrics>>,
}

impl QuotaSetServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the quota store implementation.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn QuotaStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the identity service used for hierarchy lookups.
    #[must_use]
    pub fn identity(mut self, identity: Arc<dyn IdentityService>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Set the policy enforcer.
    #[must_use]
    pub fn policy(mut self, policy: Arc<dyn PolicyEnforcer>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Set the extension registry gating conditional resources.
    #[must_use]
    pub fn extensions(mut self, extensions: Arc<dyn ExtensionRegistry>) -> Self {
        self.extensions = Some(extensions);
        self
    }

    /// Share an existing metrics instance.
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<QuotaMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Consume the builder and produce a [`QuotaSetService`].
    pub fn build(self) -> Result<QuotaSetService, QuotaError> {
        let store = self
            .store
            .ok_or_else(|| QuotaError::Configuration("quota store is required".into()))?;
        let identity = self
            .identity
            .ok_or_else(|| QuotaError::Configuration("identity service is required".into()))?;
        let policy = self
            .policy
            .unwrap_or_else(|| Arc::new(RolePolicy::default()));
        let extensions = self
            .extensions
            .unwrap_or_else(|| Arc::new(StaticExtensions::all()));

        Ok(QuotaSetService {
            allocation: AllocationEngine::new(Arc::clone(&store)),
            store,
            hierarchy: HierarchyResolver::new(identity),
            authorizer: QuotaAuthorizer::new(policy),
            extensions,
            metrics: self.metrics.unwrap_or_default(),
        })
    }
}
