use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use canopy_core::{ProjectId, RequestContext};
use canopy_identity::IdentityService;

use crate::error::QuotaError;

/// Where a target project sits, as seen from one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyPosition {
    /// The request carries no token or project; the hierarchy is not
    /// consulted.
    Flat,
    /// The target has no parent.
    Root,
    /// The target sits under `parent`.
    Child { parent: ProjectId },
}

impl HierarchyPosition {
    /// The resolved parent, if any.
    pub fn parent(&self) -> Option<&ProjectId> {
        match self {
            Self::Child { parent } => Some(parent),
            Self::Flat | Self::Root => None,
        }
    }
}

/// Filter raw subtree entries down to the direct children of `parent_id`.
///
/// Entries missing `project`, `id`, or `parent_id` are skipped.
pub fn immediate_children(subtree: &[Value], parent_id: &ProjectId) -> BTreeSet<ProjectId> {
    subtree
        .iter()
        .filter_map(|entry| {
            let project = entry.get("project");
            let id = project.and_then(|p| p.get("id")).and_then(Value::as_str);
            let parent = project
                .and_then(|p| p.get("parent_id"))
                .and_then(Value::as_str);
            match (id, parent) {
                (Some(id), Some(parent)) => Some((id, parent)),
                _ => {
                    debug!(entry = %entry, "skipping malformed subtree entry");
                    None
                }
            }
        })
        .filter(|(_, parent)| *parent == parent_id.as_str())
        .map(|(id, _)| ProjectId::from(id))
        .collect()
}

/// Resolves a project's place in the tree through the identity service.
///
/// Nothing is cached; every call asks the identity service.
#[derive(Clone)]
pub struct HierarchyResolver {
    identity: Arc<dyn IdentityService>,
}

impl HierarchyResolver {
    pub fn new(identity: Arc<dyn IdentityService>) -> Self {
        Self { identity }
    }

    /// The parent of `project_id`, or `None` for a root project.
    pub async fn resolve_parent(
        &self,
        token: &str,
        project_id: &ProjectId,
    ) -> Result<Option<ProjectId>, QuotaError> {
        let record = self
            .identity
            .get_project(token, project_id)
            .await
            .map_err(|e| {
                warn!(project = %project_id, error = %e, "parent lookup failed");
                QuotaError::Forbidden(e.to_string())
            })?;
        Ok(record.parent_id)
    }

    /// The direct children of `parent_id`.
    pub async fn list_immediate_children(
        &self,
        token: &str,
        parent_id: &ProjectId,
    ) -> Result<BTreeSet<ProjectId>, QuotaError> {
        let subtree = self
            .identity
            .get_subtree(token, parent_id)
            .await
            .map_err(|e| {
                warn!(parent = %parent_id, error = %e, "subtree lookup failed");
                QuotaError::Forbidden(e.to_string())
            })?;
        Ok(immediate_children(&subtree, parent_id))
    }

    /// Place `project_id` relative to the request.
    pub async fn position(
        &self,
        ctx: &RequestContext,
        project_id: &ProjectId,
    ) -> Result<HierarchyPosition, QuotaError> {
        let Some(token) = ctx.auth_token.as_deref().filter(|_| ctx.is_hierarchy_aware()) else {
            return Ok(HierarchyPosition::Flat);
        };
        Ok(match self.resolve_parent(token, project_id).await? {
            Some(parent) => HierarchyPosition::Child { parent },
            None => HierarchyPosition::Root,
        })
    }
}
