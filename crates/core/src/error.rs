//! Error taxonomy for the identity, session and record layers.

use thiserror::Error;

/// Result type used across the workspace.
pub type CrmResult<T> = Result<T, CrmError>;

/// Every failure the core can report.
///
/// All variants are local and synchronous; nothing here is worth retrying.
/// The HTTP boundary collapses `Unauthenticated`/`InvalidCredentials` and
/// `Forbidden`/`NotFound` into uniform responses so callers cannot enumerate
/// identities or other tenants' record ids.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CrmError {
    /// A username is already registered.
    #[error("identity already exists")]
    DuplicateIdentity,

    /// Login failed (unknown user or wrong password; deliberately not distinguished).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No live session backs the presented token.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The record exists but belongs to another identity.
    #[error("forbidden")]
    Forbidden,

    /// No record with the given identifier exists.
    #[error("not found")]
    NotFound,

    /// Input fields failed validation.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// The durable journal could not be written or read.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl CrmError {
    pub fn invalid_record(msg: impl Into<String>) -> Self {
        Self::InvalidRecord(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// True for the two errors that must look identical at the boundary.
    pub fn is_hidden_record(&self) -> bool {
        matches!(self, Self::Forbidden | Self::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_and_not_found_are_hidden_records() {
        assert!(CrmError::Forbidden.is_hidden_record());
        assert!(CrmError::NotFound.is_hidden_record());
        assert!(!CrmError::Unauthenticated.is_hidden_record());
    }

    #[test]
    fn invalid_record_carries_reason() {
        let err = CrmError::invalid_record("missing field 'name'");
        assert_eq!(err.to_string(), "invalid record: missing field 'name'");
    }
}
