//! Password hashing capability.
//!
//! The credential store only needs "hash" and "verify"; the algorithm lives
//! behind [`CredentialHasher`] so tests can dial the cost down.

use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;

use crmdesk_core::{CrmError, CrmResult};

/// One-way, salted password hashing.
pub trait CredentialHasher: Send + Sync {
    /// Produce a self-describing hash string (algorithm, salt and digest).
    fn hash(&self, raw: &str) -> CrmResult<String>;

    /// Check `raw` against a hash produced by [`CredentialHasher::hash`].
    ///
    /// Must not panic on malformed stored hashes; those simply fail.
    fn verify(&self, raw: &str, stored: &str) -> bool;
}

/// Argon2id with a fresh random salt per hash (PHC string format).
#[derive(Clone)]
pub struct Argon2Hasher {
    argon: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new(params: Params) -> Self {
        Self {
            argon: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Minimum-cost parameters. Only for tests and benches.
    pub fn low_cost() -> Self {
        let params = Params::new(Params::MIN_M_COST, Params::MIN_T_COST, Params::MIN_P_COST, None)
            .unwrap_or_default();
        Self::new(params)
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl core::fmt::Debug for Argon2Hasher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Argon2Hasher").finish_non_exhaustive()
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, raw: &str) -> CrmResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon
            .hash_password(raw.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| CrmError::storage(format!("password hashing failed: {e}")))
    }

    fn verify(&self, raw: &str, stored: &str) -> bool {
        match PasswordHash::new(stored) {
            Ok(parsed) => self.argon.verify_password(raw.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        }
    }
}
