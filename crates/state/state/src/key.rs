use serde::{Deserialize, Serialize};

use canopy_core::{ProjectId, QuotaResource, UserId};

/// Addresses one limit (or usage) row: a project-scope row when `user_id` is
/// `None`, a per-user row otherwise.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LimitKey {
    pub project_id: ProjectId,
    pub resource: QuotaResource,
    pub user_id: Option<UserId>,
}

impl LimitKey {
    /// Key for a project-scope row.
    #[must_use]
    pub fn project(project_id: impl Into<ProjectId>, resource: QuotaResource) -> Self {
        Self {
            project_id: project_id.into(),
            resource,
            user_id: None,
        }
    }

    /// Key for a per-user row.
    #[must_use]
    pub fn user(
        project_id: impl Into<ProjectId>,
        resource: QuotaResource,
        user_id: impl Into<UserId>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            resource,
            user_id: Some(user_id.into()),
        }
    }

    /// Build a key from borrowed parts.
    #[must_use]
    pub fn from_parts(
        project_id: &ProjectId,
        resource: QuotaResource,
        user_id: Option<&UserId>,
    ) -> Self {
        Self {
            project_id: project_id.clone(),
            resource,
            user_id: user_id.cloned(),
        }
    }

    /// Return a canonical string representation: `project[:user]:resource`
    #[must_use]
    pub fn canonical(&self) -> String {
        match &self.user_id {
            Some(user) => format!("{}:{}:{}", self.project_id, user, self.resource),
            None => format!("{}:{}", self.project_id, self.resource),
        }
    }
}

impl std::fmt::Display for LimitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}
