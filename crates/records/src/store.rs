//! The tenant-scoped record store: four collections behind one API.

use std::sync::Arc;

use chrono::Utc;

use crmdesk_core::{CrmError, CrmResult, Username};

use crate::FieldMap;
use crate::collection::Collection;
use crate::journal::{JournalEntry, NullJournal, RecordJournal};
use crate::kind::{RecordId, RecordKind};
use crate::record::Record;

/// Owner-scoped storage for customers, leads, sales and candidates.
///
/// Every method takes the owning identity and never returns or touches a
/// record owned by anyone else. The store itself does not authenticate; it is
/// meant to be reached only through the access gate.
pub struct RecordStore {
    customers: Collection,
    leads: Collection,
    sales: Collection,
    candidates: Collection,
    journal: Arc<dyn RecordJournal>,
}

impl RecordStore {
    /// Memory-only store.
    pub fn in_memory() -> Self {
        Self::empty(Arc::new(NullJournal))
    }

    /// Store backed by `journal`, rebuilt from its existing entries.
    pub fn with_journal(journal: Arc<dyn RecordJournal>) -> CrmResult<Self> {
        let entries = journal.replay()?;
        let store = Self::empty(journal);
        let replayed = entries.len();
        for entry in entries {
            let kind = match &entry {
                JournalEntry::Created { record } | JournalEntry::Updated { record } => record.kind(),
                JournalEntry::Deleted { kind, .. } => *kind,
            };
            store.collection(kind).restore(entry)?;
        }
        tracing::info!(entries = replayed, "record store restored from journal");
        Ok(store)
    }

    fn empty(journal: Arc<dyn RecordJournal>) -> Self {
        Self {
            customers: Collection::new(RecordKind::Customer),
            leads: Collection::new(RecordKind::Lead),
            sales: Collection::new(RecordKind::Sale),
            candidates: Collection::new(RecordKind::Candidate),
            journal,
        }
    }

    fn collection(&self, kind: RecordKind) -> &Collection {
        match kind {
            RecordKind::Customer => &self.customers,
            RecordKind::Lead => &self.leads,
            RecordKind::Sale => &self.sales,
            RecordKind::Candidate => &self.candidates,
        }
    }

    /// Validate `fields`, allocate an id and store a new record owned by `owner`.
    pub fn create(&self, owner: &Username, kind: RecordKind, fields: &FieldMap) -> CrmResult<Record> {
        self.collection(kind)
            .create(owner, fields, Utc::now(), self.journal.as_ref())
    }

    pub fn list_by_owner(&self, owner: &Username, kind: RecordKind) -> Vec<Record> {
        self.collection(kind).list_by_owner(owner)
    }

    /// Always equal to `list_by_owner(owner, kind).len()`.
    pub fn count_by_owner(&self, owner: &Username, kind: RecordKind) -> usize {
        self.collection(kind).count_by_owner(owner)
    }

    pub fn get(&self, owner: &Username, kind: RecordKind, id: &str) -> CrmResult<Record> {
        let id = parse_id(kind, id)?;
        self.collection(kind).get(owner, &id)
    }

    /// Edit a record in place. Only candidates are editable.
    ///
    /// `NotFound` if the id does not exist, `Forbidden` if it belongs to
    /// another owner; in both cases nothing changes.
    pub fn update(&self, owner: &Username, kind: RecordKind, id: &str, fields: &FieldMap) -> CrmResult<Record> {
        ensure_mutable(kind)?;
        let id = parse_id(kind, id)?;
        self.collection(kind)
            .update(owner, &id, fields, Utc::now(), self.journal.as_ref())
    }

    /// Remove a record. Same rules as [`RecordStore::update`].
    pub fn delete(&self, owner: &Username, kind: RecordKind, id: &str) -> CrmResult<()> {
        ensure_mutable(kind)?;
        let id = parse_id(kind, id)?;
        self.collection(kind).delete(owner, &id, self.journal.as_ref())
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl core::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RecordStore").finish_non_exhaustive()
    }
}

fn ensure_mutable(kind: RecordKind) -> CrmResult<()> {
    if kind.is_mutable() {
        Ok(())
    } else {
        Err(CrmError::invalid_record(format!("{kind} records cannot be modified")))
    }
}

// A malformed id or an id of another kind names nothing in this collection.
fn parse_id(kind: RecordKind, raw: &str) -> CrmResult<RecordId> {
    raw.parse::<RecordId>()
        .ok()
        .filter(|id| id.kind() == kind)
        .ok_or(CrmError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{CandidateStatus, RecordData};
    use crate::journal::JournalError;
    use proptest::prelude::*;
    use serde_json::{Value, json};
    use std::sync::Mutex;

    fn user(name: &str) -> Username {
        Username::new(name).unwrap()
    }

    fn fields(value: Value) -> FieldMap {
        value.as_object().cloned().unwrap_or_default()
    }

    /// Keeps entries in memory; optionally refuses to append.
    #[derive(Default)]
    struct MemoryJournal {
        entries: Mutex<Vec<JournalEntry>>,
        fail: bool,
    }

    impl RecordJournal for MemoryJournal {
        fn append(&self, entry: &JournalEntry) -> Result<(), JournalError> {
            if self.fail {
                return Err(JournalError::Io(std::io::Error::other("disk full")));
            }
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }

        fn replay(&self) -> Result<Vec<JournalEntry>, JournalError> {
            Ok(self.entries.lock().unwrap().clone())
        }
    }

    #[test]
    fn create_stamps_owner_and_first_id() {
        let store = RecordStore::in_memory();
        let alice = user("alice");

        let record = store
            .create(&alice, RecordKind::Customer, &fields(json!({"name": "Acme"})))
            .unwrap();

        assert_eq!(record.id.to_string(), "cust_1");
        assert_eq!(record.owner, alice);
        assert_eq!(record.kind(), RecordKind::Customer);
        assert_eq!(store.list_by_owner(&alice, RecordKind::Customer), vec![record]);
    }

    #[test]
    fn id_spaces_are_independent_per_kind() {
        let store = RecordStore::in_memory();
        let alice = user("alice");

        let c = store.create(&alice, RecordKind::Customer, &fields(json!({"name": "A"}))).unwrap();
        let l = store.create(&alice, RecordKind::Lead, &fields(json!({"name": "B"}))).unwrap();
        let s = store.create(&alice, RecordKind::Sale, &fields(json!({"title": "C"}))).unwrap();

        assert_eq!(c.id.seq(), 1);
        assert_eq!(l.id.seq(), 1);
        assert_eq!(s.id.seq(), 1);
        // A customer id is not a lead id.
        assert_eq!(store.get(&alice, RecordKind::Lead, "cust_1"), Err(CrmError::NotFound));
    }

    #[test]
    fn listing_is_scoped_to_owner_in_creation_order() {
        let store = RecordStore::in_memory();
        let alice = user("alice");
        let bob = user("bob");

        let a1 = store.create(&alice, RecordKind::Lead, &fields(json!({"name": "a1"}))).unwrap();
        let b1 = store.create(&bob, RecordKind::Lead, &fields(json!({"name": "b1"}))).unwrap();
        let a2 = store.create(&alice, RecordKind::Lead, &fields(json!({"name": "a2"}))).unwrap();

        assert_eq!(store.list_by_owner(&alice, RecordKind::Lead), vec![a1, a2]);
        assert_eq!(store.list_by_owner(&bob, RecordKind::Lead), vec![b1]);
        assert!(store.list_by_owner(&bob, RecordKind::Customer).is_empty());
        assert_eq!(store.count_by_owner(&alice, RecordKind::Lead), 2);
        assert_eq!(store.count_by_owner(&user("carol"), RecordKind::Lead), 0);
    }

    #[test]
    fn invalid_input_stores_nothing() {
        let store = RecordStore::in_memory();
        let alice = user("alice");

        let err = store.create(&alice, RecordKind::Customer, &fields(json!({"email": "x@y"}))).unwrap_err();
        assert!(matches!(err, CrmError::InvalidRecord(_)));
        assert_eq!(store.count_by_owner(&alice, RecordKind::Customer), 0);

        // The failed attempt did not burn an id.
        let ok = store.create(&alice, RecordKind::Customer, &fields(json!({"name": "Acme"}))).unwrap();
        assert_eq!(ok.id.seq(), 1);
    }

    #[test]
    fn cross_tenant_update_is_forbidden_and_leaves_record_unchanged() {
        let store = RecordStore::in_memory();
        let alice = user("alice");
        let bob = user("bob");

        let cand = store
            .create(&alice, RecordKind::Candidate, &fields(json!({"name": "Dana"})))
            .unwrap();
        let id = cand.id.to_string();

        let err = store
            .update(&bob, RecordKind::Candidate, &id, &fields(json!({"status": "hired"})))
            .unwrap_err();
        assert_eq!(err, CrmError::Forbidden);
        assert_eq!(store.delete(&bob, RecordKind::Candidate, &id), Err(CrmError::Forbidden));
        assert_eq!(store.get(&bob, RecordKind::Candidate, &id), Err(CrmError::Forbidden));
        assert_eq!(store.get(&alice, RecordKind::Candidate, &id), Ok(cand));
    }

    #[test]
    fn update_unknown_or_malformed_id_is_not_found() {
        let store = RecordStore::in_memory();
        let alice = user("alice");
        let patch = fields(json!({"status": "offer"}));

        assert_eq!(store.update(&alice, RecordKind::Candidate, "cand_9", &patch), Err(CrmError::NotFound));
        assert_eq!(store.update(&alice, RecordKind::Candidate, "9", &patch), Err(CrmError::NotFound));
        assert_eq!(store.update(&alice, RecordKind::Candidate, "cust_1", &patch), Err(CrmError::NotFound));
    }

    #[test]
    fn owner_can_update_and_delete_candidates() {
        let store = RecordStore::in_memory();
        let alice = user("alice");
        let cand = store
            .create(&alice, RecordKind::Candidate, &fields(json!({"name": "Dana"})))
            .unwrap();
        let id = cand.id.to_string();

        let updated = store
            .update(&alice, RecordKind::Candidate, &id, &fields(json!({"status": "screening"})))
            .unwrap();
        assert!(updated.updated_at.is_some());
        assert_eq!(updated.created_at, cand.created_at);
        assert!(matches!(&updated.data, RecordData::Candidate(c) if c.status == CandidateStatus::Screening));

        store.delete(&alice, RecordKind::Candidate, &id).unwrap();
        assert_eq!(store.get(&alice, RecordKind::Candidate, &id), Err(CrmError::NotFound));
        assert_eq!(store.count_by_owner(&alice, RecordKind::Candidate), 0);

        // Deleted ids are not reused.
        let next = store
            .create(&alice, RecordKind::Candidate, &fields(json!({"name": "Eli"})))
            .unwrap();
        assert_eq!(next.id.to_string(), "cand_2");
    }

    #[test]
    fn non_candidate_records_are_immutable() {
        let store = RecordStore::in_memory();
        let alice = user("alice");
        let rec = store.create(&alice, RecordKind::Sale, &fields(json!({"title": "Deal"}))).unwrap();

        let err = store
            .update(&alice, RecordKind::Sale, &rec.id.to_string(), &fields(json!({"title": "x"})))
            .unwrap_err();
        assert!(matches!(err, CrmError::InvalidRecord(_)));
        assert!(store.delete(&alice, RecordKind::Sale, &rec.id.to_string()).is_err());
    }

    #[test]
    fn journal_failure_leaves_memory_untouched() {
        let journal = Arc::new(MemoryJournal {
            fail: true,
            ..Default::default()
        });
        let store = RecordStore::with_journal(journal).unwrap();
        let alice = user("alice");

        let err = store
            .create(&alice, RecordKind::Customer, &fields(json!({"name": "Acme"})))
            .unwrap_err();
        assert!(matches!(err, CrmError::Storage(_)));
        assert_eq!(store.count_by_owner(&alice, RecordKind::Customer), 0);
    }

    #[test]
    fn store_is_rebuilt_from_journal() {
        let journal = Arc::new(MemoryJournal::default());
        let alice = user("alice");
        let bob = user("bob");

        {
            let store = RecordStore::with_journal(journal.clone()).unwrap();
            store.create(&alice, RecordKind::Customer, &fields(json!({"name": "Acme"}))).unwrap();
            let c1 = store.create(&alice, RecordKind::Candidate, &fields(json!({"name": "Dana"}))).unwrap();
            let c2 = store.create(&bob, RecordKind::Candidate, &fields(json!({"name": "Eli"}))).unwrap();
            store
                .update(&alice, RecordKind::Candidate, &c1.id.to_string(), &fields(json!({"status": "offer"})))
                .unwrap();
            store.delete(&bob, RecordKind::Candidate, &c2.id.to_string()).unwrap();
        }

        let restored = RecordStore::with_journal(journal).unwrap();
        assert_eq!(restored.count_by_owner(&alice, RecordKind::Customer), 1);
        let cands = restored.list_by_owner(&alice, RecordKind::Candidate);
        assert_eq!(cands.len(), 1);
        assert!(matches!(&cands[0].data, RecordData::Candidate(c) if c.status == CandidateStatus::Offer));
        assert!(restored.list_by_owner(&bob, RecordKind::Candidate).is_empty());

        // Sequence continues past the deleted cand_2.
        let next = restored
            .create(&bob, RecordKind::Candidate, &fields(json!({"name": "Fay"})))
            .unwrap();
        assert_eq!(next.id.to_string(), "cand_3");
    }

    #[test]
    fn concurrent_creates_allocate_unique_ids() {
        let store = Arc::new(RecordStore::in_memory());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let owner = user(&format!("user{t}"));
                    for i in 0..50 {
                        store
                            .create(&owner, RecordKind::Lead, &fields(json!({"name": format!("lead {i}")})))
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let mut ids = std::collections::HashSet::new();
        for t in 0..8 {
            let owner = user(&format!("user{t}"));
            let records = store.list_by_owner(&owner, RecordKind::Lead);
            assert_eq!(records.len(), 50);
            for r in records {
                assert!(ids.insert(r.id));
            }
        }
        assert_eq!(ids.len(), 400);
    }

    fn arb_owner() -> impl Strategy<Value = usize> {
        0usize..3
    }

    fn arb_kind() -> impl Strategy<Value = RecordKind> {
        prop::sample::select(RecordKind::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: after any sequence of creates, each owner sees exactly its
        /// own records, and the count always matches the listing.
        #[test]
        fn isolation_and_count_consistency(ops in prop::collection::vec((arb_owner(), arb_kind()), 0..60)) {
            let store = RecordStore::in_memory();
            let owners = [user("alice"), user("bob"), user("carol")];
            let mut expected = std::collections::HashMap::new();

            for (owner_idx, kind) in &ops {
                let key = if *kind == RecordKind::Sale { "title" } else { "name" };
                let record = store
                    .create(&owners[*owner_idx], *kind, &fields(json!({ key: "x" })))
                    .unwrap();
                expected.entry((*owner_idx, *kind)).or_insert_with(Vec::new).push(record.id);
            }

            for (idx, owner) in owners.iter().enumerate() {
                for kind in RecordKind::ALL {
                    let listed = store.list_by_owner(owner, kind);
                    prop_assert_eq!(store.count_by_owner(owner, kind), listed.len());
                    prop_assert!(listed.iter().all(|r| &r.owner == owner));
                    let ids: Vec<RecordId> = listed.iter().map(|r| r.id).collect();
                    prop_assert_eq!(ids, expected.get(&(idx, kind)).cloned().unwrap_or_default());
                }
            }
        }
    }
}
