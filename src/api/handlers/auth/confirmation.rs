use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::accounts::{model::Role, service::AccountService};
use crate::api::handlers::auth::principal::require_auth;
use crate::api::handlers::error_response;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct EmailChangeRequest {
    /// Account whose email should change.
    pub user_id: i64,
    pub new_email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct EmailChangeConfirm {
    /// Single-use token from the change notification.
    pub token: String,
    /// Must match the address the token was issued for.
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct EmailConfirm {
    /// Single-use token from the registration notification.
    pub token: String,
    pub email: String,
}

/// Start an email change for an account. A confirmation token is sent to the
/// new address; nothing changes until it is redeemed.
///
/// Any authenticated user may change their own email; changing someone
/// else's requires an administrative role.
#[utoipa::path(
    post,
    path = "/auth/email-change/request",
    request_body = EmailChangeRequest,
    responses(
        (status = 202, description = "Confirmation token sent to the new address"),
        (status = 400, description = "Missing payload or invalid email"),
        (status = 401, description = "Missing or invalid session token"),
        (status = 403, description = "Not allowed to change this account"),
        (status = 404, description = "Account not found"),
        (status = 409, description = "Email already registered"),
        (status = 502, description = "Notification delivery failed"),
        (status = 500, description = "Internal server error"),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip(service, headers, payload))]
pub async fn request_email_change(
    Extension(service): Extension<Arc<AccountService>>,
    headers: HeaderMap,
    payload: Option<Json<EmailChangeRequest>>,
) -> Response {
    let principal = match require_auth(&headers, &service) {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    let request: EmailChangeRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    if request.user_id != principal.user_id && !principal.has_any_role(&Role::ADMIN) {
        return StatusCode::FORBIDDEN.into_response();
    }

    match service
        .request_email_change(request.user_id, &request.new_email)
        .await
    {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(err) => error_response(err),
    }
}

/// Redeem an email-change token. The token authorizes the request; no
/// session is needed.
#[utoipa::path(
    post,
    path = "/auth/email-change/confirm",
    request_body = EmailChangeConfirm,
    responses(
        (status = 204, description = "Email updated"),
        (status = 400, description = "Bad token or email does not match the token"),
        (status = 409, description = "Email registered by someone else meanwhile"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "auth"
)]
#[instrument(skip(service, payload))]
pub async fn confirm_email_change(
    Extension(service): Extension<Arc<AccountService>>,
    payload: Option<Json<EmailChangeConfirm>>,
) -> Response {
    let confirm: EmailChangeConfirm = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match service
        .redeem_email_change(&confirm.token, &confirm.email)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

/// Confirm the address a new account registered with.
#[utoipa::path(
    post,
    path = "/auth/email-confirm",
    request_body = EmailConfirm,
    responses(
        (status = 204, description = "Email confirmed"),
        (status = 400, description = "Bad token or email does not match the token"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "auth"
)]
#[instrument(skip(service, payload))]
pub async fn confirm_email(
    Extension(service): Extension<Arc<AccountService>>,
    payload: Option<Json<EmailConfirm>>,
) -> Response {
    let confirm: EmailConfirm = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match service
        .redeem_email_confirm(&confirm.token, &confirm.email)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{
        memory::MemoryStore,
        notify::LogNotifier,
        password,
        service::ServiceConfig,
    };
    use secrecy::SecretString;

    fn service() -> Extension<Arc<AccountService>> {
        let config = ServiceConfig::new(SecretString::from(
            "unit-test-signing-secret-0123456789abcdef".to_string(),
        ));
        Extension(Arc::new(AccountService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(LogNotifier),
            password::test_hasher(),
            config,
        )))
    }

    #[tokio::test]
    async fn change_request_requires_a_session() {
        let response = request_email_change(
            service(),
            HeaderMap::new(),
            Some(Json(EmailChangeRequest {
                user_id: 1,
                new_email: "new@example.com".to_string(),
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn change_confirm_missing_payload() {
        let response = confirm_email_change(service(), None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn confirm_unknown_token() {
        let response = confirm_email(
            service(),
            Some(Json(EmailConfirm {
                token: "never-issued".to_string(),
                email: "ana@example.com".to_string(),
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
