//! One owner-scoped collection, generic over record kind.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crmdesk_core::{CrmError, CrmResult, Username};

use crate::FieldMap;
use crate::fields::RecordData;
use crate::journal::{JournalEntry, RecordJournal};
use crate::kind::{RecordId, RecordKind};
use crate::record::Record;

#[derive(Debug, Default)]
struct CollectionState {
    /// Last allocated sequence. Never decremented, so ids are never reused.
    last_seq: u64,
    /// Keyed by sequence, which is creation order.
    records: BTreeMap<u64, Record>,
    by_owner: HashMap<Username, BTreeSet<u64>>,
}

impl CollectionState {
    fn owned(&self, owner: &Username, id: &RecordId) -> CrmResult<&Record> {
        let record = self.records.get(&id.seq()).ok_or(CrmError::NotFound)?;
        if !record.is_owned_by(owner) {
            tracing::warn!(
                kind = %id.kind(),
                id = %id,
                caller = %owner,
                "cross-tenant record access denied"
            );
            return Err(CrmError::Forbidden);
        }
        Ok(record)
    }

    fn insert(&mut self, record: Record) {
        let seq = record.id.seq();
        self.last_seq = self.last_seq.max(seq);
        self.by_owner
            .entry(record.owner.clone())
            .or_default()
            .insert(seq);
        self.records.insert(seq, record);
    }

    fn remove(&mut self, seq: u64) -> Option<Record> {
        let record = self.records.remove(&seq)?;
        if let Some(ids) = self.by_owner.get_mut(&record.owner) {
            ids.remove(&seq);
            if ids.is_empty() {
                self.by_owner.remove(&record.owner);
            }
        }
        Some(record)
    }
}

/// Records of a single kind, each tagged with its owner.
///
/// Holds its own lock so that a write to one collection never blocks readers
/// of another. Every mutation is journaled under the write lock before it is
/// applied, so a journal failure leaves the collection untouched.
#[derive(Debug)]
pub struct Collection {
    kind: RecordKind,
    inner: RwLock<CollectionState>,
}

impl Collection {
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            inner: RwLock::new(CollectionState::default()),
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn create(
        &self,
        owner: &Username,
        fields: &FieldMap,
        now: DateTime<Utc>,
        journal: &dyn RecordJournal,
    ) -> CrmResult<Record> {
        let data = RecordData::from_fields(self.kind, fields)?;

        let mut state = self.write();
        let record = Record {
            id: RecordId::new(self.kind, state.last_seq + 1),
            owner: owner.clone(),
            created_at: now,
            updated_at: None,
            data,
        };
        journal.append(&JournalEntry::Created {
            record: record.clone(),
        })?;
        state.insert(record.clone());
        drop(state);

        tracing::info!(kind = %self.kind, id = %record.id, owner = %owner, "record created");
        Ok(record)
    }

    /// All records of `owner`, in creation order.
    pub fn list_by_owner(&self, owner: &Username) -> Vec<Record> {
        let state = self.read();
        state
            .by_owner
            .get(owner)
            .into_iter()
            .flatten()
            .filter_map(|seq| state.records.get(seq).cloned())
            .collect()
    }

    pub fn count_by_owner(&self, owner: &Username) -> usize {
        self.read().by_owner.get(owner).map_or(0, BTreeSet::len)
    }

    pub fn get(&self, owner: &Username, id: &RecordId) -> CrmResult<Record> {
        self.check_kind(id)?;
        self.read().owned(owner, id).cloned()
    }

    pub fn update(
        &self,
        owner: &Username,
        id: &RecordId,
        patch: &FieldMap,
        now: DateTime<Utc>,
        journal: &dyn RecordJournal,
    ) -> CrmResult<Record> {
        self.check_kind(id)?;
        let mut state = self.write();

        let mut record = state.owned(owner, id)?.clone();
        record.data = record.data.patched(patch)?;
        record.updated_at = Some(now);

        journal.append(&JournalEntry::Updated {
            record: record.clone(),
        })?;
        state.records.insert(id.seq(), record.clone());
        drop(state);

        tracing::info!(kind = %self.kind, id = %id, owner = %owner, "record updated");
        Ok(record)
    }

    pub fn delete(&self, owner: &Username, id: &RecordId, journal: &dyn RecordJournal) -> CrmResult<()> {
        self.check_kind(id)?;
        let mut state = self.write();

        state.owned(owner, id)?;
        journal.append(&JournalEntry::Deleted {
            kind: self.kind,
            id: *id,
        })?;
        state.remove(id.seq());
        drop(state);

        tracing::info!(kind = %self.kind, id = %id, owner = %owner, "record deleted");
        Ok(())
    }

    /// Apply a replayed journal entry without re-journaling it.
    pub(crate) fn restore(&self, entry: JournalEntry) -> CrmResult<()> {
        let mut state = self.write();
        match entry {
            JournalEntry::Created { record } | JournalEntry::Updated { record } => {
                if record.kind() != self.kind || record.id.kind() != self.kind {
                    return Err(CrmError::storage(format!(
                        "journal entry {} does not belong to the {} collection",
                        record.id, self.kind
                    )));
                }
                state.remove(record.id.seq());
                state.insert(record);
            }
            JournalEntry::Deleted { id, .. } => {
                state.last_seq = state.last_seq.max(id.seq());
                state.remove(id.seq());
            }
        }
        Ok(())
    }

    // Ids of other kinds cannot exist in this collection.
    fn check_kind(&self, id: &RecordId) -> CrmResult<()> {
        if id.kind() == self.kind {
            Ok(())
        } else {
            Err(CrmError::NotFound)
        }
    }

    // Mutations are applied only after validation and journaling succeed, so a
    // poisoned lock still guards a consistent state and is recovered.
    fn read(&self) -> RwLockReadGuard<'_, CollectionState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CollectionState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
