//! `crmdesk-records` — owner-scoped record collections.
//!
//! Four collections (customers, leads, sales, candidates) share one generic
//! implementation. Every operation takes the owner identity; no query can see
//! past it. Durability is optional and plugged in through [`RecordJournal`].

pub mod collection;
pub mod fields;
pub mod journal;
pub mod kind;
pub mod record;
pub mod store;

pub use collection::Collection;
pub use fields::{CandidateFields, CandidateStatus, CustomerFields, LeadFields, RecordData, SaleFields};
pub use journal::{JournalEntry, JournalError, JsonLinesJournal, NullJournal, RecordJournal};
pub use kind::{RecordId, RecordKind};
pub use record::Record;
pub use store::RecordStore;

/// Raw input for create/update: a JSON object of field name → value.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;
