//! Authentication routes: login, session introspection, password recovery and
//! email confirmation.

pub mod confirmation;
pub mod login;
pub mod principal;
pub mod recovery;
pub mod session;

pub use principal::{require_auth, require_role, Principal};
