//! Service wiring: credential store, session registry, record store, gate.

use std::sync::Arc;

use crmdesk_auth::{CredentialHasher, CredentialStore, SessionRegistry};
use crmdesk_core::{CrmError, CrmResult};
use crmdesk_gate::AccessGate;
use crmdesk_records::{JsonLinesJournal, RecordStore};

use crate::config::ApiConfig;

/// Demo identities seeded when `SEED_DEMO_USERS` is on.
pub const DEMO_USERS: &[(&str, &str, &str)] = &[
    ("admin", "admin123", "admin@crm.com"),
    ("user1", "user123", "user1@crm.com"),
];

/// Build the access gate from configuration.
///
/// The hasher is injected so tests can trade Argon2 cost for speed.
pub fn build_gate(config: &ApiConfig, hasher: Arc<dyn CredentialHasher>) -> CrmResult<Arc<AccessGate>> {
    let credentials = Arc::new(CredentialStore::new(hasher)?);
    let sessions = Arc::new(SessionRegistry::new(config.session_policy()));

    let records = match &config.data_file {
        Some(path) => {
            let journal = JsonLinesJournal::open(path).map_err(CrmError::from)?;
            tracing::info!(path = %path.display(), "record journal enabled");
            RecordStore::with_journal(Arc::new(journal))?
        }
        None => {
            tracing::info!("records are held in memory only");
            RecordStore::in_memory()
        }
    };

    let gate = AccessGate::new(credentials, sessions, Arc::new(records));

    if config.seed_demo_users {
        for (username, password, email) in DEMO_USERS {
            gate.register(username, password, Some((*email).to_string()))?;
            tracing::info!(username, "seeded demo identity");
        }
    }

    Ok(Arc::new(gate))
}
