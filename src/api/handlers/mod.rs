//! HTTP handlers. Domain errors are mapped to statuses in one place so every
//! route reports the same way.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::accounts::error::Error;

pub mod auth;
pub mod health;
pub mod user_register;
pub mod users;

/// Map a domain error onto an HTTP response.
///
/// Store failures are logged here and surface as an opaque 500; notification
/// failures get their own 502 so operators can tell delivery outages from
/// storage ones.
pub(crate) fn error_response(err: Error) -> Response {
    match &err {
        Error::NotFound => StatusCode::NOT_FOUND.into_response(),
        Error::InvalidCredentials | Error::InvalidToken(_) => {
            (StatusCode::UNAUTHORIZED, err.to_string()).into_response()
        }
        Error::TokenNotFound
        | Error::TokenExpired
        | Error::TokenAlreadyConsumed
        | Error::PasswordMismatch
        | Error::PayloadMismatch
        | Error::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
        Error::EmailTaken => (StatusCode::CONFLICT, err.to_string()).into_response(),
        Error::Notification(reason) => {
            error!("notification delivery failed: {reason}");
            (
                StatusCode::BAD_GATEWAY,
                "Notification delivery failed".to_string(),
            )
                .into_response()
        }
        Error::Store(source) => {
            error!("storage error: {source:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::session;
    use anyhow::anyhow;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            error_response(Error::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            error_response(Error::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            error_response(Error::InvalidToken(session::Error::TokenFormat)).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            error_response(Error::TokenExpired).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_response(Error::TokenAlreadyConsumed).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_response(Error::EmailTaken).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            error_response(Error::Notification("down".to_string())).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            error_response(Error::Store(anyhow!("boom"))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
