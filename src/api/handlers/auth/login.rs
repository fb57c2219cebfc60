use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::accounts::{model::UserProfile, service::AccountService};
use crate::api::handlers::error_response;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct LoginResponse {
    /// Bearer token to present on subsequent requests.
    pub token: String,
    pub user: UserProfile,
}

/// Exchange email and password for a session token.
///
/// Unknown emails, wrong passwords and deactivated accounts are
/// indistinguishable from the outside.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session created", body = LoginResponse),
        (status = 400, description = "Missing payload"),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "auth"
)]
#[instrument(skip(service, payload))]
pub async fn login(
    Extension(service): Extension<Arc<AccountService>>,
    payload: Option<Json<LoginRequest>>,
) -> Response {
    let login: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match service.login(&login.email, &login.password).await {
        Ok(success) => {
            debug!(user_id = success.user.id, "login succeeded");
            (
                StatusCode::OK,
                Json(LoginResponse {
                    token: success.token,
                    user: success.user,
                }),
            )
                .into_response()
        }
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
        service::{RegisterInput, ServiceConfig},
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
    async fn login_missing_payload() {
        let response = login(service(), None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_wrong_password() {
        let service = service();
        service
            .0
            .register(RegisterInput {
                name: "Ana Lima".to_string(),
                email: "ana@example.com".to_string(),
                phone: None,
                password: "sup3rsecret".to_string(),
                roles: vec![],
            })
            .await
            .unwrap();

        let response = login(
            service,
            Some(Json(LoginRequest {
                email: "ana@example.com".to_string(),
                password: "wr0ng-password".to_string(),
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
