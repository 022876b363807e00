//! Rule-based authorization of quota operations.
//!
//! Each permission name maps to an expression made of checks joined by
//! `or`:
//!
//! | Check | Passes when |
//! |---|---|
//! | `@` (or empty) | always |
//! | `!` | never |
//! | `role:<name>` | the caller holds `<name>` |
//! | `project_id:%(project_id)s` | the caller's project equals the target |

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use canopy_core::{ProjectId, RequestContext};

/// Permission names.
pub mod rules {
    pub const SHOW: &str = "quotas:show";
    pub const UPDATE: &str = "quotas:update";
    pub const ROOT_UPDATE: &str = "quotas:root:update";
    pub const DELETE: &str = "quotas:delete";
    pub const ROOT_DELETE: &str = "quotas:root:delete";
    pub const DETAIL: &str = "quotas:detail";

    /// Every permission name, in a stable order.
    pub const ALL: [&str; 6] = [SHOW, UPDATE, ROOT_UPDATE, DELETE, ROOT_DELETE, DETAIL];
}

const ADMIN_OR_OWNER: &str = "role:admin or project_id:%(project_id)s";
const ADMIN_API: &str = "role:admin";

/// Errors from policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("policy does not allow {rule} to be performed")]
    Denied { rule: String },

    #[error("no policy defined for {0}")]
    UnknownRule(String),

    #[error("invalid policy expression for {rule}: {expression}")]
    InvalidExpression { rule: String, expression: String },

    #[error("caller project does not match {0}")]
    ProjectMismatch(String),
}

/// Decides whether a caller may perform a named operation.
pub trait PolicyEnforcer: Send + Sync {
    /// Check `rule` for `ctx`. `target` is the project the operation is
    /// scoped to; `None` targets the caller's own project.
    fn enforce(
        &self,
        ctx: &RequestContext,
        rule: &str,
        target: Option<&ProjectId>,
    ) -> Result<(), PolicyError>;
}

/// Passes for administrators and for callers acting inside `project_id`.
pub fn check_project_context(
    ctx: &RequestContext,
    project_id: &ProjectId,
) -> Result<(), PolicyError> {
    if ctx.is_admin() || ctx.project_id.as_ref() == Some(project_id) {
        Ok(())
    } else {
        Err(PolicyError::ProjectMismatch(project_id.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Check {
    Always,
    Never,
    Role(String),
    OwnProject,
}

impl Check {
    fn passes(&self, ctx: &RequestContext, target: Option<&ProjectId>) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Role(role) => ctx.has_role(role),
            Self::OwnProject => match (ctx.project_id.as_ref(), target) {
                (Some(own), Some(target)) => own == target,
                (Some(_), None) => true,
                (None, _) => false,
            },
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => f.write_str("@"),
            Self::Never => f.write_str("!"),
            Self::Role(role) => write!(f, "role:{role}"),
            Self::OwnProject => f.write_str("project_id:%(project_id)s"),
        }
    }
}

/// A parsed rule expression: a disjunction of checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleExpression(Vec<Check>);

impl RuleExpression {
    fn passes(&self, ctx: &RequestContext, target: Option<&ProjectId>) -> bool {
        self.0.iter().any(|check| check.passes(ctx, target))
    }
}

impl FromStr for RuleExpression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Self(vec![Check::Always]));
        }
        s.split(" or ")
            .map(|part| match part.trim() {
                "@" => Ok(Check::Always),
                "!" => Ok(Check::Never),
                "project_id:%(project_id)s" => Ok(Check::OwnProject),
                other => other
                    .strip_prefix("role:")
                    .filter(|role| !role.is_empty())
                    .map(|role| Check::Role(role.to_owned()))
                    .ok_or_else(|| other.to_owned()),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl fmt::Display for RuleExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, check) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" or ")?;
            }
            write!(f, "{check}")?;
        }
        Ok(())
    }
}

/// [`PolicyEnforcer`] evaluating role-based rule expressions.
///
/// Defaults: `quotas:show` and `quotas:detail` allow admins and members of
/// the target project; every mutation requires `admin`.
#[derive(Debug, Clone)]
pub struct RolePolicy {
    rules: HashMap<String, RuleExpression>,
}

impl Default for RolePolicy {
    fn default() -> Self {
        let rules = rules::ALL
            .into_iter()
            .map(|name| {
                let expr = if matches!(name, rules::SHOW | rules::DETAIL) {
                    ADMIN_OR_OWNER
                } else {
                    ADMIN_API
                };
                // Built-in expressions always parse.
                let parsed = expr
                    .parse()
                    .unwrap_or_else(|_| RuleExpression(vec![Check::Never]));
                (name.to_owned(), parsed)
            })
            .collect();
        Self { rules }
    }
}

impl RolePolicy {
    /// Build a policy from the defaults plus `overrides` (rule name to
    /// expression).
    pub fn from_rules(overrides: &BTreeMap<String, String>) -> Result<Self, PolicyError> {
        let mut policy = Self::default();
        for (rule, expression) in overrides {
            let parsed = expression
                .parse()
                .map_err(|_| PolicyError::InvalidExpression {
                    rule: rule.clone(),
                    expression: expression.clone(),
                })?;
            policy.rules.insert(rule.clone(), parsed);
        }
        Ok(policy)
    }

    /// The expression configured for `rule`, if any.
    pub fn expression(&self, rule: &str) -> Option<&RuleExpression> {
        self.rules.get(rule)
    }
}

impl PolicyEnforcer for RolePolicy {
    fn enforce(
        &self,
        ctx: &RequestContext,
        rule: &str,
        target: Option<&ProjectId>,
    ) -> Result<(), PolicyError> {
        let expression = self
            .rules
            .get(rule)
            .ok_or_else(|| PolicyError::UnknownRule(rule.to_owned()))?;
        if expression.passes(ctx, target) {
            Ok(())
        } else {
            Err(PolicyError::Denied {
                rule: rule.to_owned(),
            })
        }
    }
}
