use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info};

use canopy_core::{ProjectId, QuotaResource, UserId};
use canopy_state::{QuotaStore, StateError};

use crate::error::QuotaError;

/// The parent whose `allocated` figures follow a child's writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentAllocation {
    pub parent_id: ProjectId,
    /// The parent's direct children, the set summed on every recompute.
    pub children: BTreeSet<ProjectId>,
}

/// Writes limits and keeps parent allocation in step.
#[derive(Clone)]
pub struct AllocationEngine {
    store: Arc<dyn QuotaStore>,
}

impl AllocationEngine {
    pub fn new(store: Arc<dyn QuotaStore>) -> Self {
        Self { store }
    }

    /// Create the row, or overwrite it if it already exists.
    ///
    /// Last writer wins; [`StateError::QuotaExists`] never escapes.
    pub async fn upsert_limit(
        &self,
        project_id: &ProjectId,
        resource: QuotaResource,
        limit: i64,
        user_id: Option<&UserId>,
    ) -> Result<(), QuotaError> {
        match self
            .store
            .create_limit(project_id, resource, limit, user_id)
            .await
        {
            Ok(()) => Ok(()),
            Err(StateError::QuotaExists(key)) => {
                debug!(%key, "limit exists, updating");
                self.store
                    .update_limit(project_id, resource, limit, user_id)
                    .await
                    .map_err(QuotaError::from)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write one limit, then recompute the parent's allocation if there is
    /// one.
    pub async fn write_limit(
        &self,
        project_id: &ProjectId,
        resource: QuotaResource,
        limit: i64,
        user_id: Option<&UserId>,
        parent: Option<&ParentAllocation>,
    ) -> Result<(), QuotaError> {
        self.upsert_limit(project_id, resource, limit, user_id)
            .await?;
        info!(
            project = %project_id,
            user = ?user_id.map(UserId::as_str),
            %resource,
            limit,
            "quota limit written"
        );
        if let Some(parent) = parent {
            self.store
                .update_allocated(&parent.parent_id, &parent.children)
                .await?;
        }
        Ok(())
    }

    /// Remove every per-user limit of `user_id` in `project_id`.
    pub async fn destroy_user_limits(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
    ) -> Result<usize, QuotaError> {
        let removed = self
            .store
            .destroy_all_by_project_and_user(project_id, user_id)
            .await?;
        info!(project = %project_id, user = %user_id, removed, "per-user limits removed");
        Ok(removed)
    }
}
