//! Credential store: registered identities and their password hashes.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crmdesk_core::{CrmError, CrmResult, Username};

use crate::hasher::CredentialHasher;

/// A registered identity (public view; never carries the hash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: Username,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredCredential {
    identity: Identity,
    password_hash: String,
}

/// Registered identities keyed by username.
///
/// # Invariants
/// - usernames are unique (case-sensitive);
/// - only the salted hash of a password is retained;
/// - identities are never removed, so anything that references a username
///   registered here stays valid for the process lifetime.
pub struct CredentialStore {
    hasher: Arc<dyn CredentialHasher>,
    inner: RwLock<HashMap<Username, StoredCredential>>,
    // Verified against on unknown usernames so both login failure paths cost the same.
    dummy_hash: String,
}

impl CredentialStore {
    pub fn new(hasher: Arc<dyn CredentialHasher>) -> CrmResult<Self> {
        let dummy_hash = hasher.hash("crmdesk-dummy-password")?;
        Ok(Self {
            hasher,
            inner: RwLock::new(HashMap::new()),
            dummy_hash,
        })
    }

    /// Register a new identity.
    ///
    /// Hashing happens before the write lock is taken; the uniqueness check and
    /// insert happen under it, so two racing registrations of one name cannot
    /// both succeed.
    pub fn register(
        &self,
        username: &str,
        raw_password: &str,
        email: Option<String>,
    ) -> CrmResult<Identity> {
        let username = Username::new(username)?;
        if raw_password.is_empty() {
            return Err(CrmError::InvalidCredentials);
        }

        if self.contains(username.as_str()) {
            return Err(CrmError::DuplicateIdentity);
        }

        let password_hash = self.hasher.hash(raw_password)?;
        let identity = Identity {
            username: username.clone(),
            email: email.filter(|e| !e.trim().is_empty()),
            created_at: Utc::now(),
        };

        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if map.contains_key(&username) {
            return Err(CrmError::DuplicateIdentity);
        }
        map.insert(
            username.clone(),
            StoredCredential {
                identity: identity.clone(),
                password_hash,
            },
        );
        drop(map);

        tracing::info!(username = %username, "identity registered");
        Ok(identity)
    }

    /// True iff `username` exists and `raw_password` matches its stored hash.
    pub fn verify(&self, username: &str, raw_password: &str) -> bool {
        let stored = self.read().get(username).map(|c| c.password_hash.clone());

        match stored {
            Some(hash) => self.hasher.verify(raw_password, &hash),
            None => {
                let _ = self.hasher.verify(raw_password, &self.dummy_hash);
                false
            }
        }
    }

    pub fn identity(&self, username: &str) -> Option<Identity> {
        self.read().get(username).map(|c| c.identity.clone())
    }

    pub fn contains(&self, username: &str) -> bool {
        self.read().contains_key(username)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Username, StoredCredential>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn stored_hash(&self, username: &str) -> Option<String> {
        self.read().get(username).map(|c| c.password_hash.clone())
    }
}

impl core::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("identities", &self.len())
            .finish_non_exhaustive()
    }
}
