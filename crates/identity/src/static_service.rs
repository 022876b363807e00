use std::collections::{BTreeMap, BTreeSet, VecDeque};

use async_trait::async_trait;
use serde_json::Value;

use canopy_core::ProjectId;

use crate::error::IdentityError;
use crate::service::{IdentityService, ProjectRecord};

/// An [`IdentityService`] serving a fixed hierarchy, typically loaded from
/// configuration. Tokens are accepted without inspection.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityService {
    projects: BTreeMap<ProjectId, ProjectRecord>,
}

impl StaticIdentityService {
    /// Build from a list of projects. Later duplicates replace earlier ones.
    pub fn new(projects: impl IntoIterator<Item = ProjectRecord>) -> Self {
        Self {
            projects: projects.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    /// Add a project.
    #[must_use]
    pub fn with_project(mut self, project: ProjectRecord) -> Self {
        self.projects.insert(project.id.clone(), project);
        self
    }

    /// Number of known projects.
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

#[async_trait]
impl IdentityService for StaticIdentityService {
    async fn get_project(
        &self,
        _token: &str,
        project_id: &ProjectId,
    ) -> Result<ProjectRecord, IdentityError> {
        self.projects
            .get(project_id)
            .cloned()
            .ok_or_else(|| IdentityError::ProjectNotFound(project_id.to_string()))
    }

    async fn get_subtree(
        &self,
        _token: &str,
        project_id: &ProjectId,
    ) -> Result<Vec<Value>, IdentityError> {
        if !self.projects.contains_key(project_id) {
            return Err(IdentityError::ProjectNotFound(project_id.to_string()));
        }

        // Breadth-first walk; acyclicity is trusted but visited ids are not
        // revisited.
        let mut out = Vec::new();
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([project_id.clone()]);
        while let Some(current) = queue.pop_front() {
            for project in self
                .projects
                .values()
                .filter(|p| p.parent_id.as_ref() == Some(&current))
            {
                if seen.insert(project.id.clone()) {
                    out.push(project.to_subtree_entry());
                    queue.push_back(project.id.clone());
                }
            }
        }
        Ok(out)
    }
}
