//! Caller context taken from the headers an auth middleware (Keystone
//! `auth_token` or equivalent) sets in front of the service.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use canopy_core::RequestContext;

use crate::error::ServerError;

pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";
pub const PROJECT_ID_HEADER: &str = "x-project-id";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const ROLES_HEADER: &str = "x-roles";

/// Extractor yielding the caller's [`RequestContext`].
///
/// Every header is optional. Without `X-Auth-Token` and `X-Project-Id` the
/// request runs in flat mode and the policy alone decides access. `X-Roles`
/// is a comma-separated list. A header that is not valid text is rejected
/// with `401`.
#[derive(Debug, Clone)]
pub struct Caller(pub RequestContext);

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, ServerError> {
    headers
        .get(name)
        .map(|v| {
            v.to_str()
                .map(str::trim)
                .map_err(|_| ServerError::Unauthorized(format!("{name} is not valid text")))
        })
        .transpose()
        .map(|v| v.filter(|s| !s.is_empty()))
}

impl Caller {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ServerError> {
        let mut ctx = RequestContext::new();
        if let Some(project) = header(headers, PROJECT_ID_HEADER)? {
            ctx = ctx.with_project(project);
        }
        if let Some(token) = header(headers, AUTH_TOKEN_HEADER)? {
            ctx = ctx.with_token(token);
        }
        if let Some(user) = header(headers, USER_ID_HEADER)? {
            ctx = ctx.with_user(user);
        }
        if let Some(roles) = header(headers, ROLES_HEADER)? {
            for role in roles.split(',').map(str::trim).filter(|r| !r.is_empty()) {
                ctx = ctx.with_role(role);
            }
        }
        Ok(Self(ctx))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn full_context_is_extracted() {
        let Caller(ctx) = Caller::from_headers(&headers(&[
            (AUTH_TOKEN_HEADER, "tok"),
            (PROJECT_ID_HEADER, "team-a"),
            (USER_ID_HEADER, "alice"),
            (ROLES_HEADER, "member, Admin ,"),
        ]))
        .unwrap();

        assert_eq!(ctx.auth_token.as_deref(), Some("tok"));
        assert_eq!(ctx.project_id.as_ref().map(|p| p.as_str()), Some("team-a"));
        assert_eq!(ctx.user_id.as_ref().map(|u| u.as_str()), Some("alice"));
        assert_eq!(ctx.roles, vec!["member", "Admin"]);
        assert!(ctx.is_admin());
        assert!(ctx.is_hierarchy_aware());
    }

    #[test]
    fn token_is_optional() {
        let Caller(ctx) = Caller::from_headers(&headers(&[(PROJECT_ID_HEADER, "p")])).unwrap();
        assert!(ctx.auth_token.is_none());
        assert!(!ctx.is_hierarchy_aware());
        assert!(ctx.roles.is_empty());
    }

    #[test]
    fn missing_or_blank_project_is_flat() {
        let Caller(ctx) = Caller::from_headers(&HeaderMap::new()).unwrap();
        assert_eq!(ctx, RequestContext::new());

        let Caller(ctx) = Caller::from_headers(&headers(&[
            (AUTH_TOKEN_HEADER, "tok"),
            (PROJECT_ID_HEADER, "  "),
        ]))
        .unwrap();
        assert!(ctx.project_id.is_none());
        assert!(!ctx.is_hierarchy_aware());
    }

    #[test]
    fn non_text_header_is_unauthorized() {
        let mut map = HeaderMap::new();
        map.insert(ROLES_HEADER, HeaderValue::from_bytes(b"\xffadmin").unwrap());
        let err = Caller::from_headers(&map).unwrap_err();
        assert!(matches!(err, ServerError::Unauthorized(_)));
    }
}
