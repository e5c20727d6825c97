use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crmdesk_core::Username;

use crate::fields::RecordData;
use crate::kind::{RecordId, RecordKind};

/// A tenant-owned record.
///
/// The owner is stamped at creation and never changes. Serialized flat, with
/// the owner under `username` and the kind-specific fields alongside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(rename = "username")]
    pub owner: Username,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub data: RecordData,
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        self.data.kind()
    }

    pub fn is_owned_by(&self, owner: &Username) -> bool {
        &self.owner == owner
    }
}
