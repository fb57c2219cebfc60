//! Role-gated user administration. Every route here requires a session whose
//! token carries `manager`, `help-desk` or `hr`.

use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::{IntoParams, ToSchema};

use crate::accounts::{
    model::{Role, UserProfile, UserStatus},
    service::{AccountService, UpdateInput},
};
use crate::api::handlers::auth::principal::require_role;
use crate::api::handlers::error_response;

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    /// Replaces the whole role set when present.
    pub roles: Option<Vec<String>>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct StatusUpdate {
    /// `active` or `inactive`.
    pub status: String,
}

#[derive(IntoParams, Deserialize, Debug, Default)]
pub struct ListParams {
    /// Comma-separated role names; omit to list everyone.
    pub roles: Option<String>,
}

/// Fetch one user's profile.
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User profile", body = UserProfile),
        (status = 401, description = "Missing or invalid session token"),
        (status = 403, description = "Caller lacks an administrative role"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error"),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip(service, headers))]
pub async fn get_user(
    Extension(service): Extension<Arc<AccountService>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if let Err(status) = require_role(&headers, &service, &Role::ADMIN) {
        return status.into_response();
    }

    match service.get_user(id).await {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(err) => error_response(err),
    }
}

/// List users, optionally filtered to those holding any of the given roles.
///
/// Deactivated accounts are hidden unless the server runs with
/// `--list-include-inactive`.
#[utoipa::path(
    get,
    path = "/users",
    params(ListParams),
    responses(
        (status = 200, description = "Matching profiles", body = [UserProfile]),
        (status = 400, description = "Unknown role in filter"),
        (status = 401, description = "Missing or invalid session token"),
        (status = 403, description = "Caller lacks an administrative role"),
        (status = 500, description = "Internal server error"),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip(service, headers))]
pub async fn list_users(
    Extension(service): Extension<Arc<AccountService>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Response {
    if let Err(status) = require_role(&headers, &service, &Role::ADMIN) {
        return status.into_response();
    }

    let mut roles = Vec::new();
    if let Some(filter) = &params.roles {
        for name in filter.split(',').filter(|name| !name.trim().is_empty()) {
            let Some(role) = Role::parse(name) else {
                return (
                    StatusCode::BAD_REQUEST,
                    format!("unknown role: {}", name.trim()),
                )
                    .into_response();
            };
            roles.push(role);
        }
    }

    match service.list_users(&roles).await {
        Ok(profiles) => {
            debug!(count = profiles.len(), "users listed");
            (StatusCode::OK, Json(profiles)).into_response()
        }
        Err(err) => error_response(err),
    }
}

/// Update a user's name, phone or role set. Absent fields are untouched.
#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    request_body = UserUpdate,
    responses(
        (status = 200, description = "Updated profile", body = UserProfile),
        (status = 400, description = "Missing payload or invalid fields"),
        (status = 401, description = "Missing or invalid session token"),
        (status = 403, description = "Caller lacks an administrative role"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error"),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip(service, headers, payload))]
pub async fn update_user(
    Extension(service): Extension<Arc<AccountService>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    payload: Option<Json<UserUpdate>>,
) -> Response {
    if let Err(status) = require_role(&headers, &service, &Role::ADMIN) {
        return status.into_response();
    }

    let update: UserUpdate = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match service
        .update_user(
            id,
            UpdateInput {
                name: update.name,
                phone: update.phone,
                roles: update.roles,
            },
        )
        .await
    {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Activate or deactivate an account. Deactivation blocks future logins;
/// sessions already issued keep verifying until they expire.
#[utoipa::path(
    put,
    path = "/users/{id}/status",
    params(("id" = i64, Path, description = "User id")),
    request_body = StatusUpdate,
    responses(
        (status = 200, description = "Updated profile", body = UserProfile),
        (status = 400, description = "Missing payload or unknown status"),
        (status = 401, description = "Missing or invalid session token"),
        (status = 403, description = "Caller lacks an administrative role"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error"),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip(service, headers, payload))]
pub async fn set_status(
    Extension(service): Extension<Arc<AccountService>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    payload: Option<Json<StatusUpdate>>,
) -> Response {
    if let Err(status) = require_role(&headers, &service, &Role::ADMIN) {
        return status.into_response();
    }

    let update: StatusUpdate = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let Some(status) = UserStatus::parse(&update.status) else {
        return (
            StatusCode::BAD_REQUEST,
            format!("unknown status: {}", update.status.trim()),
        )
            .into_response();
    };

    match service.set_status(id, status).await {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Delete a user and every action token issued to them.
#[utoipa::path(
    post,
    path = "/users/{id}/delete",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 401, description = "Missing or invalid session token"),
        (status = 403, description = "Caller lacks an administrative role"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error"),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip(service, headers))]
pub async fn delete_user(
    Extension(service): Extension<Arc<AccountService>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if let Err(status) = require_role(&headers, &service, &Role::ADMIN) {
        return status.into_response();
    }

    match service.delete_user(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}
