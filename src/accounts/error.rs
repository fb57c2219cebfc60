//! Error taxonomy for the account service.
//!
//! Variants are deliberately coarse: handlers map them onto HTTP statuses and
//! callers match on kind, never on message text. Store failures surface as
//! [`Error::Store`] so database details never leak into responses.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("user not found")]
    NotFound,
    #[error("invalid token")]
    InvalidToken(#[source] crate::token::session::Error),
    #[error("token expired")]
    TokenExpired,
    #[error("token already used")]
    TokenAlreadyConsumed,
    #[error("token not found")]
    TokenNotFound,
    #[error("password confirmation does not match")]
    PasswordMismatch,
    #[error("token was issued for a different request")]
    PayloadMismatch,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("email already registered")]
    EmailTaken,
    #[error("notification delivery failed: {0}")]
    Notification(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl From<crate::token::session::Error> for Error {
    fn from(err: crate::token::session::Error) -> Self {
        match err {
            crate::token::session::Error::Expired => Error::TokenExpired,
            other => Error::InvalidToken(other),
        }
    }
}
