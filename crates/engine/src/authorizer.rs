use std::sync::Arc;

use tracing::warn;

use canopy_core::{ProjectId, RequestContext, UserId};

use crate::error::QuotaError;
use crate::hierarchy::HierarchyPosition;
use crate::policy::{PolicyEnforcer, PolicyError, check_project_context, rules};

/// A write operation on a quota set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Update,
    Delete,
}

impl Mutation {
    /// Permission checked for per-user and child-project writes.
    pub fn rule(self) -> &'static str {
        match self {
            Self::Update => rules::UPDATE,
            Self::Delete => rules::DELETE,
        }
    }

    /// Permission checked for writes on a root project.
    pub fn root_rule(self) -> &'static str {
        match self {
            Self::Update => rules::ROOT_UPDATE,
            Self::Delete => rules::ROOT_DELETE,
        }
    }
}

/// Decides who may view or change limits at a node, from the caller's own
/// position in the tree.
///
/// Every denial surfaces as [`QuotaError::Forbidden`].
#[derive(Clone)]
pub struct QuotaAuthorizer {
    policy: Arc<dyn PolicyEnforcer>,
}

impl QuotaAuthorizer {
    pub fn new(policy: Arc<dyn PolicyEnforcer>) -> Self {
        Self { policy }
    }

    fn enforce(
        &self,
        ctx: &RequestContext,
        rule: &str,
        target: Option<&ProjectId>,
    ) -> Result<(), PolicyError> {
        self.policy.enforce(ctx, rule, target)
    }

    fn deny(rule: &str, project_id: &ProjectId, err: &PolicyError) -> QuotaError {
        warn!(
            rule,
            project = %project_id,
            error = %err,
            "quota operation forbidden"
        );
        QuotaError::Forbidden(err.to_string())
    }

    /// Authorize reading the limits of `project_id`.
    pub fn authorize_show(
        &self,
        ctx: &RequestContext,
        project_id: &ProjectId,
        position: &HierarchyPosition,
        user_id: Option<&UserId>,
    ) -> Result<(), QuotaError> {
        let result = match (user_id, position.parent()) {
            (Some(_), _) | (None, None) => self
                .enforce(ctx, rules::SHOW, None)
                .and_then(|()| check_project_context(ctx, project_id)),
            // A parent may read its children.
            (None, Some(parent)) if ctx.project_id.as_ref() == Some(parent) => self
                .enforce(ctx, rules::SHOW, Some(parent))
                .and_then(|()| check_project_context(ctx, parent)),
            (None, Some(_)) => self
                .enforce(ctx, rules::SHOW, Some(project_id))
                .and_then(|()| check_project_context(ctx, project_id)),
        };
        result.map_err(|e| Self::deny(rules::SHOW, project_id, &e))
    }

    /// Authorize changing the limits of `project_id`.
    ///
    /// Child projects are governed by their parent: the permission is checked
    /// against the parent and the caller must act from the parent. Roots
    /// (and flat requests) need the root permission.
    pub fn authorize_mutation(
        &self,
        mutation: Mutation,
        ctx: &RequestContext,
        project_id: &ProjectId,
        position: &HierarchyPosition,
        user_id: Option<&UserId>,
    ) -> Result<(), QuotaError> {
        let (rule, result) = match (user_id, position.parent()) {
            (Some(_), _) => (
                mutation.rule(),
                self.enforce(ctx, mutation.rule(), None)
                    .and_then(|()| check_project_context(ctx, project_id)),
            ),
            (None, Some(parent)) => (
                mutation.rule(),
                self.enforce(ctx, mutation.rule(), Some(parent))
                    .and_then(|()| check_project_context(ctx, parent)),
            ),
            (None, None) => (
                mutation.root_rule(),
                self.enforce(ctx, mutation.root_rule(), None)
                    .and_then(|()| check_project_context(ctx, project_id)),
            ),
        };
        result.map_err(|e| Self::deny(rule, project_id, &e))
    }

    /// Authorize reading the default limits.
    pub fn authorize_defaults(
        &self,
        ctx: &RequestContext,
        project_id: &ProjectId,
    ) -> Result<(), QuotaError> {
        self.enforce(ctx, rules::SHOW, None)
            .map_err(|e| Self::deny(rules::SHOW, project_id, &e))
    }

    /// Authorize reading limits with usage figures.
    pub fn authorize_detail(
        &self,
        ctx: &RequestContext,
        project_id: &ProjectId,
    ) -> Result<(), QuotaError> {
        self.enforce(ctx, rules::DETAIL, None)
            .and_then(|()| check_project_context(ctx, project_id))
            .map_err(|e| Self::deny(rules::DETAIL, project_id, &e))
    }
}
