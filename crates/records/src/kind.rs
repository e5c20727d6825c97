//! Record kinds and per-collection identifiers.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// The four managed entity types. Each owns an independent id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Customer,
    Lead,
    Sale,
    Candidate,
}

impl RecordKind {
    pub const ALL: [RecordKind; 4] = [
        RecordKind::Customer,
        RecordKind::Lead,
        RecordKind::Sale,
        RecordKind::Candidate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Customer => "customer",
            RecordKind::Lead => "lead",
            RecordKind::Sale => "sale",
            RecordKind::Candidate => "candidate",
        }
    }

    /// Collection name, also used as the JSON key for list responses.
    pub fn plural(self) -> &'static str {
        match self {
            RecordKind::Customer => "customers",
            RecordKind::Lead => "leads",
            RecordKind::Sale => "sales",
            RecordKind::Candidate => "candidates",
        }
    }

    /// Prefix of generated identifiers (`cust_1`, `lead_1`, ...).
    pub fn id_prefix(self) -> &'static str {
        match self {
            RecordKind::Customer => "cust",
            RecordKind::Lead => "lead",
            RecordKind::Sale => "sale",
            RecordKind::Candidate => "cand",
        }
    }

    /// Only candidates can be edited or deleted after creation.
    pub fn is_mutable(self) -> bool {
        matches!(self, RecordKind::Candidate)
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id_prefix() == prefix)
    }
}

impl core::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = UnknownRecordKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s || k.plural() == s)
            .ok_or(UnknownRecordKind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown record kind")]
pub struct UnknownRecordKind;

/// Identifier of a record, unique within its kind's collection.
///
/// Rendered as `<prefix>_<seq>`; sequences start at 1 and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId {
    kind: RecordKind,
    seq: u64,
}

impl RecordId {
    pub fn new(kind: RecordKind, seq: u64) -> Self {
        Self { kind, seq }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl core::fmt::Display for RecordId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}_{}", self.kind.id_prefix(), self.seq)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid record id: {0}")]
pub struct InvalidRecordId(String);

impl FromStr for RecordId {
    type Err = InvalidRecordId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidRecordId(s.to_string());
        let (prefix, seq) = s.split_once('_').ok_or_else(invalid)?;
        let kind = RecordKind::from_prefix(prefix).ok_or_else(invalid)?;
        if seq.is_empty() || !seq.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let seq: u64 = seq.parse().map_err(|_| invalid())?;
        if seq == 0 {
            return Err(invalid());
        }
        Ok(Self { kind, seq })
    }
}

impl TryFrom<String> for RecordId {
    type Error = InvalidRecordId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RecordId> for String {
    fn from(value: RecordId) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_renders_with_kind_prefix() {
        assert_eq!(RecordId::new(RecordKind::Customer, 1).to_string(), "cust_1");
        assert_eq!(RecordId::new(RecordKind::Candidate, 42).to_string(), "cand_42");
    }

    #[test]
    fn record_id_parses_its_own_rendering() {
        let id: RecordId = "lead_7".parse().unwrap();
        assert_eq!(id.kind(), RecordKind::Lead);
        assert_eq!(id.seq(), 7);
    }

    #[test]
    fn record_id_rejects_garbage() {
        for bad in ["", "cust", "cust_", "cust_0", "cust_-1", "cust_+1", "acct_1", "cust_1_2", "CUST_1"] {
            assert!(bad.parse::<RecordId>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn kind_parses_singular_and_plural() {
        assert_eq!("sale".parse::<RecordKind>(), Ok(RecordKind::Sale));
        assert_eq!("sales".parse::<RecordKind>(), Ok(RecordKind::Sale));
        assert!("invoices".parse::<RecordKind>().is_err());
    }
}
