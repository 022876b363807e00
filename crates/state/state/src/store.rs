use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use canopy_core::{
    ProjectId, QuotaLimit, QuotaResource, ResourceQuota, SettableRange, UNLIMITED, UserId,
};

use crate::error::StateError;

/// Persistent storage for quota limits, usage, and defaults.
///
/// Implementations must be `Send + Sync` and safe for concurrent access.
/// Reads always return an entry for every known resource: explicit rows win,
/// otherwise the configured default applies.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Insert a new limit row.
    ///
    /// Returns [`StateError::QuotaExists`] when the row is already present.
    async fn create_limit(
        &self,
        project_id: &ProjectId,
        resource: QuotaResource,
        limit: i64,
        user_id: Option<&UserId>,
    ) -> Result<(), StateError>;

    /// Overwrite an existing limit row.
    ///
    /// Returns [`StateError::NotFound`] when there is nothing to update.
    async fn update_limit(
        &self,
        project_id: &ProjectId,
        resource: QuotaResource,
        limit: i64,
        user_id: Option<&UserId>,
    ) -> Result<(), StateError>;

    /// Remove every per-user row of `user_id` in `project_id`. Returns the
    /// number of rows removed.
    async fn destroy_all_by_project_and_user(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
    ) -> Result<usize, StateError>;

    /// All explicit rows stored for a project, project-scope and per-user.
    async fn list_limits(&self, project_id: &ProjectId) -> Result<Vec<QuotaLimit>, StateError>;

    /// Effective project-scope view of every resource.
    async fn get_project_quotas(
        &self,
        project_id: &ProjectId,
    ) -> Result<BTreeMap<QuotaResource, ResourceQuota>, StateError>;

    /// Effective per-user view of every resource. A user without an explicit
    /// row inherits the project-scope limit.
    async fn get_user_quotas(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
    ) -> Result<BTreeMap<QuotaResource, ResourceQuota>, StateError>;

    /// Default limits applied when no explicit row exists.
    async fn get_defaults(&self) -> Result<BTreeMap<QuotaResource, i64>, StateError>;

    /// Recompute `allocated` on `parent_id` for every resource as the sum of
    /// the children's explicit non-negative project-scope limits.
    async fn update_allocated(
        &self,
        parent_id: &ProjectId,
        children: &BTreeSet<ProjectId>,
    ) -> Result<(), StateError>;

    /// Push current consumption for a `(project[, user], resource)` from the
    /// usage subsystem.
    async fn record_usage(
        &self,
        project_id: &ProjectId,
        user_id: Option<&UserId>,
        resource: QuotaResource,
        in_use: i64,
        reserved: i64,
    ) -> Result<(), StateError>;

    /// The range each resource's limit may currently be set to.
    ///
    /// With a `user_id` the range is bounded by the project-scope limit.
    /// Otherwise it is bounded by the parent's remaining budget, or unbounded
    /// when `parent_id` is `None`.
    async fn get_settable_quotas(
        &self,
        project_id: &ProjectId,
        parent_id: Option<&ProjectId>,
        user_id: Option<&UserId>,
    ) -> Result<BTreeMap<QuotaResource, SettableRange>, StateError> {
        let project = self.get_project_quotas(project_id).await?;

        if let Some(user_id) = user_id {
            let user = self.get_user_quotas(project_id, user_id).await?;
            return Ok(user
                .iter()
                .map(|(resource, quota)| {
                    let project_limit = project.get(resource).map_or(UNLIMITED, |p| p.limit);
                    (*resource, SettableRange::for_user(quota, project_limit))
                })
                .collect());
        }

        let explicit: BTreeMap<QuotaResource, i64> = self
            .list_limits(project_id)
            .await?
            .into_iter()
            .filter(QuotaLimit::is_project_scope)
            .map(|l| (l.resource, l.limit))
            .collect();
        let parent = match parent_id {
            Some(parent_id) => Some(self.get_project_quotas(parent_id).await?),
            None => None,
        };

        Ok(project
            .iter()
            .map(|(resource, own)| {
                let parent_quota = parent
                    .as_ref()
                    .map(|p| p.get(resource).copied().unwrap_or_default());
                let range = SettableRange::for_project(
                    own,
                    explicit.get(resource).copied(),
                    parent_quota.as_ref(),
                );
                (*resource, range)
            })
            .collect())
    }
}
