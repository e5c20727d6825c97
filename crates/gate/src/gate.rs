//! Access gate: login, logout, authentication, and owner-scoped record access.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crmdesk_auth::{CredentialStore, Identity, SessionRegistry, SessionToken};
use crmdesk_core::{CrmError, CrmResult, Username};
use crmdesk_records::{FieldMap, Record, RecordKind, RecordStore};

use crate::caller::Caller;

/// Per-kind record counts for one owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DashboardStats {
    pub customers: usize,
    pub leads: usize,
    pub sales: usize,
    pub candidates: usize,
}

/// Composition of the credential store, the session registry and the record
/// store. The only way a request reaches tenant data.
pub struct AccessGate {
    credentials: Arc<CredentialStore>,
    sessions: Arc<SessionRegistry>,
    records: Arc<RecordStore>,
}

impl AccessGate {
    pub fn new(
        credentials: Arc<CredentialStore>,
        sessions: Arc<SessionRegistry>,
        records: Arc<RecordStore>,
    ) -> Self {
        Self {
            credentials,
            sessions,
            records,
        }
    }

    // -------------------------
    // Identity & sessions
    // -------------------------

    pub fn register(&self, username: &str, raw_password: &str, email: Option<String>) -> CrmResult<Identity> {
        self.credentials.register(username, raw_password, email)
    }

    /// Verify credentials and open a session.
    ///
    /// Unknown user and wrong password both yield `InvalidCredentials`.
    pub fn login(&self, username: &str, raw_password: &str) -> CrmResult<SessionToken> {
        if !self.credentials.verify(username, raw_password) {
            tracing::info!("login rejected");
            return Err(CrmError::InvalidCredentials);
        }
        let username = Username::new(username).map_err(|_| CrmError::InvalidCredentials)?;
        let token = self.sessions.issue(&username);
        tracing::info!(username = %username, "login succeeded");
        Ok(token)
    }

    /// End the session behind `presented`. Idempotent.
    pub fn logout(&self, presented: &str) {
        self.sessions.revoke(presented);
    }

    /// Resolve a presented token to a [`Caller`].
    ///
    /// Missing, malformed, revoked, expired and unknown tokens are all
    /// `Unauthenticated`.
    pub fn authenticate(&self, presented: Option<&str>) -> CrmResult<Caller> {
        let presented = presented.map(str::trim).filter(|t| !t.is_empty());
        let username = presented
            .and_then(|token| self.sessions.resolve(token))
            .ok_or(CrmError::Unauthenticated)?;

        // Sessions must reference a registered identity.
        if !self.credentials.contains(username.as_str()) {
            if let Some(token) = presented {
                self.sessions.revoke(token);
            }
            tracing::warn!(username = %username, "session referenced an unknown identity");
            return Err(CrmError::Unauthenticated);
        }

        Ok(Caller::new(username))
    }

    pub fn identity(&self, caller: &Caller) -> Option<Identity> {
        self.credentials.identity(caller.username().as_str())
    }

    /// Drop expired sessions; returns how many were removed.
    pub fn purge_expired_sessions(&self) -> usize {
        self.sessions.purge_expired()
    }

    // -------------------------
    // Records
    // -------------------------

    pub fn create(&self, caller: &Caller, kind: RecordKind, fields: &FieldMap) -> CrmResult<Record> {
        self.records.create(caller.username(), kind, fields)
    }

    pub fn list(&self, caller: &Caller, kind: RecordKind) -> Vec<Record> {
        self.records.list_by_owner(caller.username(), kind)
    }

    pub fn count(&self, caller: &Caller, kind: RecordKind) -> usize {
        self.records.count_by_owner(caller.username(), kind)
    }

    pub fn get(&self, caller: &Caller, kind: RecordKind, id: &str) -> CrmResult<Record> {
        self.records.get(caller.username(), kind, id)
    }

    pub fn update_candidate(&self, caller: &Caller, id: &str, fields: &FieldMap) -> CrmResult<Record> {
        self.records
            .update(caller.username(), RecordKind::Candidate, id, fields)
    }

    pub fn delete_candidate(&self, caller: &Caller, id: &str) -> CrmResult<()> {
        self.records
            .delete(caller.username(), RecordKind::Candidate, id)
    }

    pub fn dashboard(&self, caller: &Caller) -> DashboardStats {
        DashboardStats {
            customers: self.count(caller, RecordKind::Customer),
            leads: self.count(caller, RecordKind::Lead),
            sales: self.count(caller, RecordKind::Sale),
            candidates: self.count(caller, RecordKind::Candidate),
        }
    }
}

impl core::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccessGate")
            .field("identities", &self.credentials.len())
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}
