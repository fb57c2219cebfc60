//! Opaque secrets for single-use action tokens.
//!
//! The raw secret is only ever sent to the user; the store keeps a SHA-256
//! digest, so a database leak does not leak redeemable tokens.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Number of random bytes behind each action token (256 bits).
pub const SECRET_BYTES: usize = 32;

/// Create a new action-token secret for recovery and confirmation links.
///
/// # Errors
///
/// Returns an error if the operating system RNG fails.
pub fn generate() -> Result<String> {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate action token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Hash an action-token secret so raw values never touch the database.
/// The digest is used for lookups when the token is redeemed.
#[must_use]
pub fn hash(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}
