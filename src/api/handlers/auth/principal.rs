//! Request authentication. Handlers call [`require_auth`] (or
//! [`require_role`]) directly instead of going through a middleware layer, so
//! each route states its own access rule.

use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use std::sync::Arc;
use tracing::debug;

use crate::accounts::{model::Role, service::AccountService};

/// Identity carried by a verified session token.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: i64,
    pub roles: Vec<Role>,
}

impl Principal {
    #[must_use]
    pub fn has_any_role(&self, allowed: &[Role]) -> bool {
        self.roles.iter().any(|role| allowed.contains(role))
    }
}

/// Pull the bearer token out of the `Authorization` header.
#[must_use]
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Verify the caller's session token. Missing, malformed, badly signed and
/// expired tokens all collapse into 401.
pub fn require_auth(
    headers: &HeaderMap,
    service: &Arc<AccountService>,
) -> Result<Principal, StatusCode> {
    let Some(token) = extract_bearer_token(headers) else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    let claims = service.verify_session(token).map_err(|err| {
        debug!("session token rejected: {err}");
        StatusCode::UNAUTHORIZED
    })?;

    Ok(Principal {
        user_id: claims.sub,
        roles: claims.roles,
    })
}

/// [`require_auth`] plus a role check. Authenticated callers outside
/// `allowed` get 403.
pub fn require_role(
    headers: &HeaderMap,
    service: &Arc<AccountService>,
    allowed: &[Role],
) -> Result<Principal, StatusCode> {
    let principal = require_auth(headers, service)?;

    if !principal.has_any_role(allowed) {
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(principal)
}
