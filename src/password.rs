//! Salted password hashing for stored credentials
//!
//! Hashes are PHC strings (`$argon2id$v=19$m=...`), so the salt and the
//! cost parameters travel with the hash and old hashes keep verifying after
//! the configured cost changes.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use thiserror::Error;

use crate::config::AuthConfig;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("invalid argon2 parameters: {0}")]
    Params(argon2::Error),

    #[error("password hashing failed: {0}")]
    Hash(argon2::password_hash::Error),

    #[error("stored hash is not a valid PHC string: {0}")]
    InvalidHash(argon2::password_hash::Error),
}

/// Argon2id hasher with a fixed cost
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher").finish_non_exhaustive()
    }
}

impl PasswordHasher {
    /// Memory cost in KiB, then iteration count and lanes
    pub fn with_params(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, PasswordError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(PasswordError::Params)?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, PasswordError> {
        Self::with_params(
            config.hash_memory_kib,
            config.hash_iterations,
            config.hash_parallelism,
        )
    }

    /// Hash `password` under a fresh random salt
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(PasswordError::Hash)
    }

    /// Check `password` against a stored PHC string. A wrong password is
    /// `Ok(false)`; only a corrupt hash is an error.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(hash).map_err(PasswordError::InvalidHash)?;
        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(err) => Err(PasswordError::Hash(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> PasswordHasher {
        PasswordHasher::with_params(64, 1, 1).unwrap()
    }

    #[test]
    fn test_hash_verifies_only_the_same_password() {
        let hasher = cheap();
        let hash = hasher.hash("s3cret").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("s3cret"));
        assert!(hasher.verify("s3cret", &hash).unwrap());
        assert!(!hasher.verify("S3cret", &hash).unwrap());
    }

    #[test]
    fn test_each_hash_gets_its_own_salt() {
        let hasher = cheap();
        let first = hasher.hash("same").unwrap();
        let second = hasher.hash("same").unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify("same", &first).unwrap());
        assert!(hasher.verify("same", &second).unwrap());
    }

    #[test]
    fn test_cost_is_read_from_the_hash() {
        let hash = cheap().hash("portable").unwrap();
        let stronger = PasswordHasher::with_params(128, 2, 1).unwrap();
        assert!(stronger.verify("portable", &hash).unwrap());
    }

    #[test]
    fn test_corrupt_hash_is_an_error() {
        assert!(matches!(
            cheap().verify("x", "not-a-phc-string"),
            Err(PasswordError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_invalid_params_are_rejected() {
        assert!(matches!(
            PasswordHasher::with_params(1, 1, 1),
            Err(PasswordError::Params(_))
        ));
    }
}
