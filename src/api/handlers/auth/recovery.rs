use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::accounts::service::AccountService;
use crate::api::handlers::error_response;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PasswordResetRedeem {
    /// Single-use token from the reset notification.
    pub token: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Ask for a password reset token to be sent to `email`.
///
/// Responds 202 whether or not the address is registered, so the endpoint
/// cannot be used to probe for accounts.
#[utoipa::path(
    post,
    path = "/auth/password-reset/request",
    request_body = PasswordResetRequest,
    responses(
        (status = 202, description = "Request accepted"),
        (status = 400, description = "Missing payload or invalid email"),
        (status = 502, description = "Notification delivery failed"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "auth"
)]
#[instrument(skip(service, payload))]
pub async fn request_password_reset(
    Extension(service): Extension<Arc<AccountService>>,
    payload: Option<Json<PasswordResetRequest>>,
) -> Response {
    let request: PasswordResetRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match service.request_password_reset(&request.email).await {
        Ok(_) => StatusCode::ACCEPTED.into_response(),
        Err(err) => error_response(err),
    }
}

/// Redeem a reset token for a new password.
#[utoipa::path(
    post,
    path = "/auth/password-reset/redeem",
    request_body = PasswordResetRedeem,
    responses(
        (status = 204, description = "Password updated"),
        (status = 400, description = "Bad token, weak password or mismatched confirmation"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "auth"
)]
#[instrument(skip(service, payload))]
pub async fn redeem_password_reset(
    Extension(service): Extension<Arc<AccountService>>,
    payload: Option<Json<PasswordResetRedeem>>,
) -> Response {
    let redeem: PasswordResetRedeem = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match service
        .redeem_password_reset(&redeem.token, &redeem.new_password, &redeem.confirm_password)
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
    async fn request_missing_payload() {
        let response = request_password_reset(service(), None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn request_accepts_unknown_email() {
        let response = request_password_reset(
            service(),
            Some(Json(PasswordResetRequest {
                email: "nobody@example.com".to_string(),
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn redeem_unknown_token() {
        let response = redeem_password_reset(
            service(),
            Some(Json(PasswordResetRedeem {
                token: "never-issued".to_string(),
                new_password: "n3w-password".to_string(),
                confirm_password: "n3w-password".to_string(),
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
