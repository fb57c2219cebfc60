//! Argon2id password hashing.
//!
//! One helper owns the parameter choices so every hash in the database was
//! produced with the same cost settings. Hashes are stored as PHC strings.

use anyhow::{anyhow, Context, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, ParamsBuilder, Version,
};
use rand::{rngs::OsRng, RngCore};

/// Argon2id hasher with fixed parameters and a precomputed decoy hash used
/// to equalize timing when the account under login does not exist.
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    dummy_hash: String,
}

impl CredentialHasher {
    // ~64 MiB and 3 iterations, a solid server baseline without tuning.
    const DEFAULT_MEMORY_KIB: u32 = 64 * 1024;
    const DEFAULT_ITERATIONS: u32 = 3;
    const DEFAULT_PARALLELISM: u32 = 1;
    const SALT_LENGTH: usize = 16;

    /// Build a hasher with the default Argon2id parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are rejected or the decoy hash
    /// cannot be computed.
    pub fn new() -> Result<Self> {
        let params = ParamsBuilder::new()
            .m_cost(Self::DEFAULT_MEMORY_KIB)
            .t_cost(Self::DEFAULT_ITERATIONS)
            .p_cost(Self::DEFAULT_PARALLELISM)
            .output_len(32)
            .build()
            .map_err(|err| anyhow!("invalid argon2 parameters: {err}"))?;
        Self::with_params(params)
    }

    /// Build a hasher with caller-specified parameters (used by tests to
    /// keep hashing cheap).
    ///
    /// # Errors
    ///
    /// Returns an error if the decoy hash cannot be computed.
    pub fn with_params(params: Params) -> Result<Self> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::default(), params);
        let mut hasher = Self {
            argon2,
            dummy_hash: String::new(),
        };
        hasher.dummy_hash = hasher.hash("subteno-decoy-password")?;
        Ok(hasher)
    }

    /// Hash a password with a fresh random salt. The PHC string is suitable
    /// for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the RNG fails or hashing is rejected.
    pub fn hash(&self, password: &str) -> Result<String> {
        let mut salt_bytes = [0u8; Self::SALT_LENGTH];
        OsRng
            .try_fill_bytes(&mut salt_bytes)
            .context("failed to generate password salt")?;
        let salt =
            SaltString::encode_b64(&salt_bytes).map_err(|err| anyhow!("invalid salt: {err}"))?;
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| anyhow!("failed to hash password: {err}"))?;
        Ok(hash.to_string())
    }

    /// Verify a password against a stored PHC string.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored hash does not parse (a corrupt row,
    /// never a wrong password).
    pub fn verify(&self, password: &str, password_hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(password_hash)
            .map_err(|err| anyhow!("stored password hash is invalid: {err}"))?;
        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Hash of a fixed throwaway password. Verified against when a login
    /// email does not resolve, so both paths cost one Argon2 pass.
    #[must_use]
    pub fn dummy_hash(&self) -> &str {
        &self.dummy_hash
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> CredentialHasher {
    let params = ParamsBuilder::new()
        .m_cost(1024)
        .t_cost(1)
        .p_cost(1)
        .output_len(32)
        .build()
        .expect("test params");
    CredentialHasher::with_params(params).expect("test hasher")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_and_verifies() -> Result<()> {
        let hasher = test_hasher();
        let hash = hasher.hash("correct horse")?;
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &hash)?);
        assert!(!hasher.verify("battery staple", &hash)?);
        Ok(())
    }

    #[test]
    fn salts_differ_between_hashes() -> Result<()> {
        let hasher = test_hasher();
        assert_ne!(hasher.hash("same")?, hasher.hash("same")?);
        Ok(())
    }

    #[test]
    fn corrupt_hash_is_an_error_not_a_mismatch() {
        let hasher = test_hasher();
        assert!(hasher.verify("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn dummy_hash_never_matches_real_input() -> Result<()> {
        let hasher = test_hasher();
        assert!(!hasher.verify("hunter2", hasher.dummy_hash())?);
        Ok(())
    }
}
