use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::resource::QuotaResource;
use crate::types::{ProjectId, UserId};

/// Sentinel limit meaning "unlimited".
pub const UNLIMITED: i64 = -1;

/// A stored quota limit for a `(project, resource[, user])` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaLimit {
    /// Project the limit belongs to.
    pub project_id: ProjectId,
    /// Resource being limited.
    pub resource: QuotaResource,
    /// Set for per-user limits inside the project.
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Hard limit; `-1` is unlimited.
    pub limit: i64,
    /// Portion of `limit` sub-granted to child projects.
    #[serde(default)]
    pub allocated: i64,
    /// When the record was first written.
    pub created_at: DateTime<Utc>,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

impl QuotaLimit {
    /// Create a fresh record with no allocation.
    #[must_use]
    pub fn new(
        project_id: ProjectId,
        resource: QuotaResource,
        user_id: Option<UserId>,
        limit: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            project_id,
            resource,
            user_id,
            limit,
            allocated: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the record is a project-scope row (not per-user).
    #[must_use]
    pub fn is_project_scope(&self) -> bool {
        self.user_id.is_none()
    }
}

/// The live view of one resource: its limit plus externally supplied
/// consumption figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ResourceQuota {
    /// Effective limit (explicit record, fallback, or default).
    pub limit: i64,
    /// Actual consumption.
    pub in_use: i64,
    /// In-flight reservations.
    pub reserved: i64,
    /// Amount sub-allocated to children (project scope only).
    pub allocated: i64,
}

impl ResourceQuota {
    /// `in_use + reserved`, the lowest limit that can be set without force.
    #[must_use]
    pub fn committed(&self) -> i64 {
        self.in_use.saturating_add(self.reserved)
    }

    /// `in_use + reserved + allocated`: everything the project has consumed
    /// itself or handed down to its children.
    #[must_use]
    pub fn held(&self) -> i64 {
        self.committed().saturating_add(self.allocated.max(0))
    }
}

/// The `(minimum, maximum)` an admin may currently set a limit to.
///
/// Derived on every request, never stored. `maximum == -1` means no upper
/// bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SettableRange {
    pub minimum: i64,
    pub maximum: i64,
}

impl SettableRange {
    /// Range for a project-scope limit.
    ///
    /// `own_explicit` is the project's stored limit, if any; it is the amount
    /// already counted in the parent's `allocated` and is handed back to the
    /// budget. A root project (`parent == None`) has no upper bound. The
    /// minimum covers the project's own usage plus its children's allocation.
    #[must_use]
    pub fn for_project(
        own: &ResourceQuota,
        own_explicit: Option<i64>,
        parent: Option<&ResourceQuota>,
    ) -> Self {
        let maximum = match parent {
            None => UNLIMITED,
            Some(parent) if parent.limit == UNLIMITED => UNLIMITED,
            Some(parent) => {
                let held = own_explicit.filter(|l| *l >= 0).unwrap_or(0);
                let other_children = parent.allocated.saturating_sub(held).max(0);
                parent.limit.saturating_sub(other_children).max(0)
            }
        };
        Self {
            minimum: own.held(),
            maximum,
        }
    }

    /// Range for a per-user limit: bounded above by the project's own limit.
    #[must_use]
    pub fn for_user(user: &ResourceQuota, project_limit: i64) -> Self {
        Self {
            minimum: user.committed(),
            maximum: project_limit,
        }
    }
}
