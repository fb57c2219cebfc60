//! OpenAPI document. Route registration stays in `api::new`; this module only
//! describes what is mounted there.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::accounts::model::{Role, UserProfile, UserStatus};
use crate::api::handlers::{auth, health, user_register, users};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        user_register::register,
        users::get_user,
        users::list_users,
        users::update_user,
        users::set_status,
        users::delete_user,
        auth::login::login,
        auth::session::session,
        auth::recovery::request_password_reset,
        auth::recovery::redeem_password_reset,
        auth::confirmation::request_email_change,
        auth::confirmation::confirm_email_change,
        auth::confirmation::confirm_email,
    ),
    components(schemas(
        health::Health,
        user_register::UserRegister,
        users::UserUpdate,
        users::StatusUpdate,
        auth::login::LoginRequest,
        auth::login::LoginResponse,
        auth::session::SessionResponse,
        auth::recovery::PasswordResetRequest,
        auth::recovery::PasswordResetRedeem,
        auth::confirmation::EmailChangeRequest,
        auth::confirmation::EmailChangeConfirm,
        auth::confirmation::EmailConfirm,
        UserProfile,
        Role,
        UserStatus,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Sessions, password recovery and email confirmation"),
        (name = "users", description = "Account registration and administration"),
        (name = "health", description = "Service health")
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
