//! Token primitives: the signed session token codec and the single-use
//! action-token secret generator.

pub mod secret;
pub mod session;
