//! Kind-specific record fields and their validation.
//!
//! Input arrives as a loose JSON object. Unknown keys are ignored; a missing or
//! blank required field, or an amount that is not a finite non-negative
//! number, is rejected with `InvalidRecord` instead of being stored empty.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crmdesk_core::{CrmError, CrmResult};

use crate::FieldMap;
use crate::kind::RecordKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerFields {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadFields {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    /// Estimated deal value.
    pub value: f64,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleFields {
    pub title: String,
    pub amount: f64,
    pub status: String,
}

/// Recruitment pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateStatus {
    #[default]
    Applied,
    Screening,
    Interview,
    Offer,
    Hired,
    Rejected,
}

impl CandidateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateStatus::Applied => "applied",
            CandidateStatus::Screening => "screening",
            CandidateStatus::Interview => "interview",
            CandidateStatus::Offer => "offer",
            CandidateStatus::Hired => "hired",
            CandidateStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for CandidateStatus {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "applied" => Ok(CandidateStatus::Applied),
            "screening" => Ok(CandidateStatus::Screening),
            "interview" => Ok(CandidateStatus::Interview),
            "offer" => Ok(CandidateStatus::Offer),
            "hired" => Ok(CandidateStatus::Hired),
            "rejected" => Ok(CandidateStatus::Rejected),
            other => Err(CrmError::invalid_record(format!(
                "unknown candidate status '{other}' (expected one of: applied, screening, interview, offer, hired, rejected)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateFields {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: CandidateStatus,
}

impl CandidateFields {
    /// Apply the recognised keys of `patch`. Absent keys are left alone;
    /// `null` or blank clears an optional field.
    fn apply_patch(&mut self, patch: &FieldReader<'_>) -> CrmResult<()> {
        if patch.has("name") {
            self.name = patch.required_text("name")?;
        }
        for (key, slot) in [
            ("email", &mut self.email),
            ("phone", &mut self.phone),
            ("position", &mut self.position),
            ("notes", &mut self.notes),
        ] {
            if patch.has(key) {
                *slot = patch.optional_text(key)?;
            }
        }
        if patch.has("status") {
            self.status = patch.required_text("status")?.parse()?;
        }
        Ok(())
    }
}

/// Validated fields of one record, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RecordData {
    Customer(CustomerFields),
    Lead(LeadFields),
    Sale(SaleFields),
    Candidate(CandidateFields),
}

impl RecordData {
    /// Validate raw input for a new record of `kind`.
    pub fn from_fields(kind: RecordKind, fields: &FieldMap) -> CrmResult<Self> {
        let input = FieldReader::new(fields);
        let data = match kind {
            RecordKind::Customer => RecordData::Customer(CustomerFields {
                name: input.required_text("name")?,
                email: input.optional_text("email")?,
                phone: input.optional_text("phone")?,
                company: input.optional_text("company")?,
                status: "active".to_string(),
            }),
            RecordKind::Lead => RecordData::Lead(LeadFields {
                name: input.required_text("name")?,
                email: input.optional_text("email")?,
                phone: input.optional_text("phone")?,
                company: input.optional_text("company")?,
                value: input.amount("value")?,
                status: "new".to_string(),
            }),
            RecordKind::Sale => RecordData::Sale(SaleFields {
                title: input.required_text("title")?,
                amount: input.amount("amount")?,
                status: "pending".to_string(),
            }),
            RecordKind::Candidate => RecordData::Candidate(CandidateFields {
                name: input.required_text("name")?,
                email: input.optional_text("email")?,
                phone: input.optional_text("phone")?,
                position: input.optional_text("position")?,
                notes: input.optional_text("notes")?,
                status: CandidateStatus::Applied,
            }),
        };
        Ok(data)
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            RecordData::Customer(_) => RecordKind::Customer,
            RecordData::Lead(_) => RecordKind::Lead,
            RecordData::Sale(_) => RecordKind::Sale,
            RecordData::Candidate(_) => RecordKind::Candidate,
        }
    }

    /// Produce an edited copy. Only candidate data is editable.
    pub fn patched(&self, patch: &FieldMap) -> CrmResult<Self> {
        match self {
            RecordData::Candidate(fields) => {
                let mut fields = fields.clone();
                fields.apply_patch(&FieldReader::new(patch))?;
                Ok(RecordData::Candidate(fields))
            }
            other => Err(CrmError::invalid_record(format!(
                "{} records cannot be modified",
                other.kind()
            ))),
        }
    }
}

/// Typed accessors over a raw field map.
struct FieldReader<'a> {
    fields: &'a FieldMap,
}

impl<'a> FieldReader<'a> {
    fn new(fields: &'a FieldMap) -> Self {
        Self { fields }
    }

    fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    fn required_text(&self, key: &str) -> CrmResult<String> {
        match self.optional_text(key)? {
            Some(text) => Ok(text),
            None => Err(CrmError::invalid_record(format!("missing required field '{key}'"))),
        }
    }

    fn optional_text(&self, key: &str) -> CrmResult<Option<String>> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => {
                let s = s.trim();
                Ok((!s.is_empty()).then(|| s.to_string()))
            }
            Some(_) => Err(CrmError::invalid_record(format!("field '{key}' must be a string"))),
        }
    }

    /// Monetary amount; absent means zero. Numeric strings are accepted.
    fn amount(&self, key: &str) -> CrmResult<f64> {
        let value = match self.fields.get(key) {
            None | Some(Value::Null) => return Ok(0.0),
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) if s.trim().is_empty() => return Ok(0.0),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            Some(_) => None,
        };
        match value {
            Some(v) if v.is_finite() && v >= 0.0 => Ok(v),
            _ => Err(CrmError::invalid_record(format!(
                "field '{key}' must be a non-negative number"
            ))),
        }
    }
}
