use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::accounts::{
    error::Error,
    model::{Role, UserProfile},
    service::AccountService,
};
use crate::api::handlers::auth::principal::extract_bearer_token;
use crate::api::handlers::error_response;

#[derive(ToSchema, Serialize, Debug)]
pub struct SessionResponse {
    pub user: UserProfile,
    /// Roles frozen into the token at login time.
    pub roles: Vec<Role>,
    /// Unix timestamp after which the token stops verifying.
    pub expires_at: i64,
}

/// Describe the caller's session: the stored profile plus the claims the
/// token was minted with.
#[utoipa::path(
    get,
    path = "/auth/session",
    responses(
        (status = 200, description = "Session is valid", body = SessionResponse),
        (status = 401, description = "Missing, malformed or expired token"),
        (status = 404, description = "Subject account no longer exists"),
        (status = 500, description = "Internal server error"),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip(service, headers))]
pub async fn session(
    Extension(service): Extension<Arc<AccountService>>,
    headers: HeaderMap,
) -> Response {
    let Some(token) = extract_bearer_token(&headers) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    match service.session_profile(token).await {
        Ok((claims, user)) => (
            StatusCode::OK,
            Json(SessionResponse {
                user,
                roles: claims.roles,
                expires_at: claims.exp,
            }),
        )
            .into_response(),
        // Expiry is an auth failure on this route, not a bad request.
        Err(Error::InvalidToken(_) | Error::TokenExpired) => {
            StatusCode::UNAUTHORIZED.into_response()
        }
        Err(err) => error_response(err),
    }
}
