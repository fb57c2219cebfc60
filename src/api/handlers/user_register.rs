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

use crate::accounts::model::UserProfile;
use crate::accounts::service::{AccountService, RegisterInput};
use crate::api::handlers::error_response;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserRegister {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub password: String,
    /// Role names, e.g. `["help-desk"]`. Empty means `employee`.
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Create an account. A confirmation token is sent to the registered email;
/// the account works either way.
#[utoipa::path(
    post,
    path = "/users/register",
    request_body = UserRegister,
    responses(
        (status = 201, description = "User created", body = UserProfile),
        (status = 400, description = "Missing payload or invalid fields"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "users"
)]
#[instrument(skip(service, payload))]
pub async fn register(
    Extension(service): Extension<Arc<AccountService>>,
    payload: Option<Json<UserRegister>>,
) -> Response {
    let user: UserRegister = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match service
        .register(RegisterInput {
            name: user.name,
            email: user.email,
            phone: user.phone,
            password: user.password,
            roles: user.roles,
        })
        .await
    {
        Ok(profile) => {
            debug!(user_id = profile.id, "user registered");
            (StatusCode::CREATED, Json(profile)).into_response()
        }
        Err(err) => error_response(err),
    }
}
