use crate::types::{ProjectId, UserId};

/// Role name that grants administrative bypass of project-context checks.
pub const ADMIN_ROLE: &str = "admin";

/// The authenticated caller of a quota request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Bearer token forwarded to the identity service.
    pub auth_token: Option<String>,
    /// The caller's own project.
    pub project_id: Option<ProjectId>,
    /// The caller's user id.
    pub user_id: Option<UserId>,
    /// Roles granted to the caller on `project_id`.
    pub roles: Vec<String>,
}

impl RequestContext {
    /// Create an anonymous context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the auth token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Set the caller's project.
    #[must_use]
    pub fn with_project(mut self, project_id: impl Into<ProjectId>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Set the caller's user id.
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<UserId>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Add a role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Whether the caller holds the given role (case-insensitive).
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    /// Whether the caller is an administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }

    /// Whether the context carries enough to consult the project hierarchy.
    ///
    /// Without a token and a project id the service degrades to flat mode.
    #[must_use]
    pub fn is_hierarchy_aware(&self) -> bool {
        self.auth_token.is_some() && self.project_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_context_is_flat() {
        let ctx = RequestContext::new();
        assert!(!ctx.is_hierarchy_aware());
        assert!(!ctx.is_admin());
    }

    #[test]
    fn token_and_project_enable_hierarchy() {
        let ctx = RequestContext::new().with_token("tok");
        assert!(!ctx.is_hierarchy_aware());
        let ctx = ctx.with_project("p1");
        assert!(ctx.is_hierarchy_aware());
    }

    #[test]
    fn admin_role_is_case_insensitive() {
        let ctx = RequestContext::new().with_role("member").with_role("Admin");
        assert!(ctx.is_admin());
        assert!(ctx.has_role("MEMBER"));
    }
}
