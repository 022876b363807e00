use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use canopy_core::{ProjectId, QuotaLimit, QuotaResource, ResourceQuota, UserId};
use canopy_state::error::StateError;
use canopy_state::key::LimitKey;
use canopy_state::store::QuotaStore;

/// Consumption figures for one row.
#[derive(Debug, Clone, Copy, Default)]
struct Usage {
    in_use: i64,
    reserved: i64,
}

/// In-memory [`QuotaStore`] backed by [`DashMap`]s.
///
/// Limit rows, usage rows, and per-parent allocation totals live in separate
/// maps. Allocation is kept apart from the limit rows so a parent without an
/// explicit limit can still carry an `allocated` figure.
#[derive(Debug)]
pub struct MemoryQuotaStore {
    limits: DashMap<LimitKey, QuotaLimit>,
    usage: DashMap<LimitKey, Usage>,
    allocated: DashMap<(ProjectId, QuotaResource), i64>,
    defaults: BTreeMap<QuotaResource, i64>,
}

impl Default for MemoryQuotaStore {
    fn default() -> Self {
        Self {
            limits: DashMap::new(),
            usage: DashMap::new(),
            allocated: DashMap::new(),
            defaults: QuotaResource::ALL
                .into_iter()
                .map(|r| (r, r.default_limit()))
                .collect(),
        }
    }
}

impl MemoryQuotaStore {
    /// Create a new, empty store with the built-in defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the default limit of some resources.
    #[must_use]
    pub fn with_defaults(mut self, overrides: &BTreeMap<QuotaResource, i64>) -> Self {
        for (resource, limit) in overrides {
            self.defaults.insert(*resource, *limit);
        }
        self
    }

    fn default_for(&self, resource: QuotaResource) -> i64 {
        self.defaults
            .get(&resource)
            .copied()
            .unwrap_or_else(|| resource.default_limit())
    }

    fn explicit_limit(&self, key: &LimitKey) -> Option<i64> {
        self.limits.get(key).map(|row| row.limit)
    }

    fn allocated_for(&self, project_id: &ProjectId, resource: QuotaResource) -> i64 {
        self.allocated
            .get(&(project_id.clone(), resource))
            .map_or(0, |v| *v)
    }

    /// Sum usage over every row of the project, project-scope and per-user.
    fn project_usage(&self, project_id: &ProjectId, resource: QuotaResource) -> Usage {
        self.usage
            .iter()
            .filter(|e| e.key().project_id == *project_id && e.key().resource == resource)
            .fold(Usage::default(), |acc, e| Usage {
                in_use: acc.in_use.saturating_add(e.value().in_use),
                reserved: acc.reserved.saturating_add(e.value().reserved),
            })
    }
}

#[async_trait]
impl QuotaStore for MemoryQuotaStore {
    async fn create_limit(
        &self,
        project_id: &ProjectId,
        resource: QuotaResource,
        limit: i64,
        user_id: Option<&UserId>,
    ) -> Result<(), StateError> {
        let key = LimitKey::from_parts(project_id, resource, user_id);
        match self.limits.entry(key) {
            Entry::Occupied(occupied) => Err(StateError::QuotaExists(occupied.key().to_string())),
            Entry::Vacant(vacant) => {
                vacant.insert(QuotaLimit::new(
                    project_id.clone(),
                    resource,
                    user_id.cloned(),
                    limit,
                ));
                Ok(())
            }
        }
    }

    async fn update_limit(
        &self,
        project_id: &ProjectId,
        resource: QuotaResource,
        limit: i64,
        user_id: Option<&UserId>,
    ) -> Result<(), StateError> {
        let key = LimitKey::from_parts(project_id, resource, user_id);
        let mut row = self
            .limits
            .get_mut(&key)
            .ok_or_else(|| StateError::NotFound(key.to_string()))?;
        row.limit = limit;
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn destroy_all_by_project_and_user(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
    ) -> Result<usize, StateError> {
        let before = self.limits.len();
        self.limits.retain(|key, _| {
            !(key.project_id == *project_id && key.user_id.as_ref() == Some(user_id))
        });
        Ok(before.saturating_sub(self.limits.len()))
    }

    async fn list_limits(&self, project_id: &ProjectId) -> Result<Vec<QuotaLimit>, StateError> {
        let mut rows: Vec<QuotaLimit> = self
            .limits
            .iter()
            .filter(|e| e.key().project_id == *project_id)
            .map(|e| {
                let mut row = e.value().clone();
                if row.is_project_scope() {
                    row.allocated = self.allocated_for(project_id, row.resource);
                }
                row
            })
            .collect();
        rows.sort_by(|a, b| (a.resource, &a.user_id).cmp(&(b.resource, &b.user_id)));
        Ok(rows)
    }

    async fn get_project_quotas(
        &self,
        project_id: &ProjectId,
    ) -> Result<BTreeMap<QuotaResource, ResourceQuota>, StateError> {
        Ok(QuotaResource::ALL
            .into_iter()
            .map(|resource| {
                let key = LimitKey::from_parts(project_id, resource, None);
                let usage = self.project_usage(project_id, resource);
                let quota = ResourceQuota {
                    limit: self
                        .explicit_limit(&key)
                        .unwrap_or_else(|| self.default_for(resource)),
                    in_use: usage.in_use,
                    reserved: usage.reserved,
                    allocated: self.allocated_for(project_id, resource),
                };
                (resource, quota)
            })
            .collect())
    }

    async fn get_user_quotas(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
    ) -> Result<BTreeMap<QuotaResource, ResourceQuota>, StateError> {
        Ok(QuotaResource::ALL
            .into_iter()
            .map(|resource| {
                let user_key = LimitKey::from_parts(project_id, resource, Some(user_id));
                let project_key = LimitKey::from_parts(project_id, resource, None);
                let usage = self.usage.get(&user_key).map(|u| *u).unwrap_or_default();
                let limit = self
                    .explicit_limit(&user_key)
                    .or_else(|| self.explicit_limit(&project_key))
                    .unwrap_or_else(|| self.default_for(resource));
                let quota = ResourceQuota {
                    limit,
                    in_use: usage.in_use,
                    reserved: usage.reserved,
                    allocated: 0,
                };
                (resource, quota)
            })
            .collect())
    }

    async fn get_defaults(&self) -> Result<BTreeMap<QuotaResource, i64>, StateError> {
        Ok(QuotaResource::ALL
            .into_iter()
            .map(|r| (r, self.default_for(r)))
            .collect())
    }

    async fn update_allocated(
        &self,
        parent_id: &ProjectId,
        children: &BTreeSet<ProjectId>,
    ) -> Result<(), StateError> {
        for resource in QuotaResource::ALL {
            let total = children
                .iter()
                .filter_map(|child| {
                    self.explicit_limit(&LimitKey::from_parts(child, resource, None))
                })
                .filter(|limit| *limit >= 0)
                .fold(0_i64, i64::saturating_add);
            self.allocated.insert((parent_id.clone(), resource), total);
        }
        debug!(parent = %parent_id, children = children.len(), "recomputed allocation");
        Ok(())
    }

    async fn record_usage(
        &self,
        project_id: &ProjectId,
        user_id: Option<&UserId>,
        resource: QuotaResource,
        in_use: i64,
        reserved: i64,
    ) -> Result<(), StateError> {
        let key = LimitKey::from_parts(project_id, resource, user_id);
        self.usage.insert(key, Usage { in_use, reserved });
        Ok(())
    }
}
