//! # Subteno (Help Desk Account Service)
//!
//! `subteno` manages user accounts for an internal help-desk platform:
//! registration, login, role-gated administration, password recovery and
//! email-change confirmation.
//!
//! ## Sessions
//!
//! Login issues a stateless HS256-signed bearer token carrying the user id and
//! role set. Tokens verify offline; nothing is stored server side, so a token
//! stays valid until it expires even if the account is deactivated afterwards.
//!
//! ## Action Tokens
//!
//! Password resets and email changes are driven by single-use, time-bounded
//! tokens. Only a SHA-256 digest of each token is persisted; requesting a new
//! token for the same account and purpose supersedes the previous one, and
//! redemption is atomic so exactly one of two racing redeemers wins.
//!
//! ## Roles
//!
//! Four roles exist: `manager`, `help-desk`, `hr` and `employee`. The first
//! three may administer accounts; everyone may log in and manage their own
//! email address.

pub mod accounts;
pub mod api;
pub mod cli;
pub mod token;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
