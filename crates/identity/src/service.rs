use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use canopy_core::ProjectId;

use crate::error::IdentityError;

/// A node of the project hierarchy as reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: ProjectId,
    /// `None` for root projects.
    #[serde(default)]
    pub parent_id: Option<ProjectId>,
}

impl ProjectRecord {
    /// A root project.
    #[must_use]
    pub fn root(id: impl Into<ProjectId>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
        }
    }

    /// A project under `parent_id`.
    #[must_use]
    pub fn child(id: impl Into<ProjectId>, parent_id: impl Into<ProjectId>) -> Self {
        Self {
            id: id.into(),
            parent_id: Some(parent_id.into()),
        }
    }

    /// Render as a subtree entry: `{"project": {"id": .., "parent_id": ..}}`.
    #[must_use]
    pub fn to_subtree_entry(&self) -> Value {
        json!({ "project": { "id": self.id, "parent_id": self.parent_id } })
    }
}

/// Read-only view of the project hierarchy.
///
/// Implementations must be `Send + Sync`; every call carries the caller's
/// token so the identity service can scope what it reveals.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Fetch a single project.
    async fn get_project(
        &self,
        token: &str,
        project_id: &ProjectId,
    ) -> Result<ProjectRecord, IdentityError>;

    /// Fetch every descendant of `project_id` as raw subtree entries of the
    /// form `{"project": {"id": .., "parent_id": ..}}`.
    ///
    /// Entries are returned as received; callers must tolerate malformed
    /// items.
    async fn get_subtree(
        &self,
        token: &str,
        project_id: &ProjectId,
    ) -> Result<Vec<Value>, IdentityError>;
}
