use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use canopy_core::{
    ExtensionRegistry, ProjectId, QuotaResource, QuotaSet, QuotaSetUpdate, RequestContext,
    ResourceQuota, UserId, parse_force, parse_limit_entry, validate_limit,
};
use canopy_state::QuotaStore;

use crate::allocation::{AllocationEngine, ParentAllocation};
use crate::authorizer::{Mutation, QuotaAuthorizer};
use crate::builder::QuotaSetServiceBuilder;
use crate::error::QuotaError;
use crate::hierarchy::{HierarchyPosition, HierarchyResolver};
use crate::metrics::QuotaMetrics;

/// Façade over hierarchy resolution, authorization, validation, and
/// allocation for the quota-set operations.
///
/// Stateless per request: nothing about the hierarchy or limits is cached
/// between calls.
pub struct QuotaSetService {
    pub(crate) store: Arc<dyn QuotaStore>,
    pub(crate) hierarchy: HierarchyResolver,
    pub(crate) authorizer: QuotaAuthorizer,
    pub(crate) allocation: AllocationEngine,
    pub(crate) extensions: Arc<dyn ExtensionRegistry>,
    pub(crate) metrics: Arc<QuotaMetrics>,
}

impl QuotaSetService {
    pub fn builder() -> QuotaSetServiceBuilder {
        QuotaSetServiceBuilder::new()
    }

    pub fn metrics(&self) -> &QuotaMetrics {
        &self.metrics
    }

    /// Resources exposed under the active extension set.
    pub fn supported_resources(&self) -> Vec<QuotaResource> {
        self.extensions.supported_resources()
    }

    /// Limits of a project, or of one user inside it.
    #[instrument(skip(self, ctx), fields(project = %project_id))]
    pub async fn show(
        &self,
        ctx: &RequestContext,
        project_id: &ProjectId,
        user_id: Option<&UserId>,
    ) -> Result<QuotaSet, QuotaError> {
        let result = self.show_inner(ctx, project_id, user_id).await;
        self.track(result, QuotaMetrics::increment_shows)
    }

    /// Limits with usage figures.
    #[instrument(skip(self, ctx), fields(project = %project_id))]
    pub async fn detail(
        &self,
        ctx: &RequestContext,
        project_id: &ProjectId,
        user_id: Option<&UserId>,
    ) -> Result<QuotaSet, QuotaError> {
        let result = self.detail_inner(ctx, project_id, user_id).await;
        self.track(result, QuotaMetrics::increment_details)
    }

    /// The default limits, labelled with `project_id`.
    #[instrument(skip(self, ctx), fields(project = %project_id))]
    pub async fn defaults(
        &self,
        ctx: &RequestContext,
        project_id: &ProjectId,
    ) -> Result<QuotaSet, QuotaError> {
        let result = self.defaults_inner(ctx, project_id).await;
        self.track(result, QuotaMetrics::increment_defaults)
    }

    /// Apply an update body and return the resulting limits.
    ///
    /// Keys are processed in order; a failure on one key leaves earlier
    /// writes of the same request in place.
    #[instrument(skip(self, ctx, body), fields(project = %project_id))]
    pub async fn update(
        &self,
        ctx: &RequestContext,
        project_id: &ProjectId,
        user_id: Option<&UserId>,
        body: &QuotaSetUpdate,
    ) -> Result<QuotaSet, QuotaError> {
        let result = self.update_inner(ctx, project_id, user_id, body).await;
        self.track(result, QuotaMetrics::increment_updates)
    }

    /// Reset a project's limits to zero, or drop a user's limits.
    ///
    /// Project-scope rows are kept and set to `0` through the validated
    /// update path, so a project still consuming resources cannot be reset
    /// until the usage is released.
    #[instrument(skip(self, ctx), fields(project = %project_id))]
    pub async fn delete(
        &self,
        ctx: &RequestContext,
        project_id: &ProjectId,
        user_id: Option<&UserId>,
    ) -> Result<(), QuotaError> {
        let result = self.delete_inner(ctx, project_id, user_id).await;
        self.track(result, QuotaMetrics::increment_deletes)
    }

    async fn show_inner(
        &self,
        ctx: &RequestContext,
        project_id: &ProjectId,
        user_id: Option<&UserId>,
    ) -> Result<QuotaSet, QuotaError> {
        let position = self.hierarchy.position(ctx, project_id).await?;
        self.authorizer
            .authorize_show(ctx, project_id, &position, user_id)?;
        self.read_limits(project_id, user_id).await
    }

    async fn detail_inner(
        &self,
        ctx: &RequestContext,
        project_id: &ProjectId,
        user_id: Option<&UserId>,
    ) -> Result<QuotaSet, QuotaError> {
        self.authorizer.authorize_detail(ctx, project_id)?;
        let quotas = self.read_quotas(project_id, user_id).await?;
        Ok(QuotaSet::from_details(
            project_id,
            &quotas,
            &self.supported_resources(),
        ))
    }

    async fn defaults_inner(
        &self,
        ctx: &RequestContext,
        project_id: &ProjectId,
    ) -> Result<QuotaSet, QuotaError> {
        self.authorizer.authorize_defaults(ctx, project_id)?;
        let defaults = self.store.get_defaults().await?;
        Ok(QuotaSet::from_defaults(
            project_id,
            &defaults,
            &self.supported_resources(),
        ))
    }

    async fn update_inner(
        &self,
        ctx: &RequestContext,
        project_id: &ProjectId,
        user_id: Option<&UserId>,
        body: &QuotaSetUpdate,
    ) -> Result<QuotaSet, QuotaError> {
        let position = self.hierarchy.position(ctx, project_id).await?;
        self.authorizer
            .authorize_mutation(Mutation::Update, ctx, project_id, &position, user_id)?;
        let parent = self.check_parent(ctx, project_id, &position).await?;
        self.apply_limits(project_id, user_id, parent.as_ref(), body)
            .await?;
        self.read_limits(project_id, user_id).await
    }

    async fn delete_inner(
        &self,
        ctx: &RequestContext,
        project_id: &ProjectId,
        user_id: Option<&UserId>,
    ) -> Result<(), QuotaError> {
        if let Some(user_id) = user_id {
            // Per-user rows carry no allocation; the hierarchy is not consulted.
            self.authorizer.authorize_mutation(
                Mutation::Delete,
                ctx,
                project_id,
                &HierarchyPosition::Flat,
                Some(user_id),
            )?;
            self.allocation
                .destroy_user_limits(project_id, user_id)
                .await?;
            return Ok(());
        }

        let position = self.hierarchy.position(ctx, project_id).await?;
        self.authorizer
            .authorize_mutation(Mutation::Delete, ctx, project_id, &position, None)?;
        let parent = self.check_parent(ctx, project_id, &position).await?;
        let body = QuotaSetUpdate::zeroed(&self.supported_resources());
        self.apply_limits(project_id, None, parent.as_ref(), &body)
            .await?;
        Ok(())
    }

    /// Confirm the target is listed among its parent's direct children and
    /// return the parent's allocation scope.
    async fn check_parent(
        &self,
        ctx: &RequestContext,
        project_id: &ProjectId,
        position: &HierarchyPosition,
    ) -> Result<Option<ParentAllocation>, QuotaError> {
        let Some(parent_id) = position.parent() else {
            return Ok(None);
        };
        let token = ctx.auth_token.as_deref().unwrap_or_default();
        let children = self
            .hierarchy
            .list_immediate_children(token, parent_id)
            .await?;
        if !children.contains(project_id) {
            warn!(parent = %parent_id, project = %project_id, "target is not a child of its parent");
            return Err(QuotaError::InvalidParent {
                parent_id: parent_id.clone(),
                project_id: project_id.clone(),
            });
        }
        Ok(Some(ParentAllocation {
            parent_id: parent_id.clone(),
            children,
        }))
    }

    /// Parse, validate, and write every key of `body` in turn.
    async fn apply_limits(
        &self,
        project_id: &ProjectId,
        user_id: Option<&UserId>,
        parent: Option<&ParentAllocation>,
        body: &QuotaSetUpdate,
    ) -> Result<usize, QuotaError> {
        let force = parse_force(body.force())?;
        let settable = self
            .store
            .get_settable_quotas(project_id, parent.map(|p| &p.parent_id), user_id)
            .await?;
        let supported = self.supported_resources();

        // Apply in key order whatever map ordering serde_json was built with.
        let mut entries: Vec<_> = body.quota_set.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));

        let mut written = 0;
        for (key, value) in entries {
            let Some((resource, limit)) = parse_limit_entry(key, value, &supported)? else {
                debug!(key = %key, "skipping quota key");
                continue;
            };
            if force {
                debug!(%resource, limit, "force update, bounds not checked");
            } else if let Some(range) = settable.get(&resource) {
                validate_limit(resource, limit, range.minimum, range.maximum).inspect_err(
                    |e| debug!(%resource, limit, error = %e, "limit rejected"),
                )?;
            }
            self.allocation
                .write_limit(project_id, resource, limit, user_id, parent)
                .await?;
            self.metrics.increment_limits_written();
            written += 1;
        }
        info!(project = %project_id, written, force, "quota set applied");
        Ok(written)
    }

    async fn read_quotas(
        &self,
        project_id: &ProjectId,
        user_id: Option<&UserId>,
    ) -> Result<BTreeMap<QuotaResource, ResourceQuota>, QuotaError> {
        let quotas = match user_id {
            Some(user_id) => self.store.get_user_quotas(project_id, user_id).await?,
            None => self.store.get_project_quotas(project_id).await?,
        };
        Ok(quotas)
    }

    async fn read_limits(
        &self,
        project_id: &ProjectId,
        user_id: Option<&UserId>,
    ) -> Result<QuotaSet, QuotaError> {
        let quotas = self.read_quotas(project_id, user_id).await?;
        Ok(QuotaSet::from_limits(
            project_id,
            &quotas,
            &self.supported_resources(),
        ))
    }

    fn track<T>(
        &self,
        result: Result<T, QuotaError>,
        on_success: fn(&QuotaMetrics),
    ) -> Result<T, QuotaError> {
        match &result {
            Ok(_) => on_success(&self.metrics),
            Err(QuotaError::Forbidden(_)) => self.metrics.increment_forbidden(),
            Err(QuotaError::InvalidParent { .. }) => self.metrics.increment_invalid_parent(),
            Err(QuotaError::Validation(_)) => self.metrics.increment_validation_failed(),
            Err(QuotaError::State(_) | QuotaError::Configuration(_)) => {
                self.metrics.increment_store_errors();
            }
        }
        result
    }
}
