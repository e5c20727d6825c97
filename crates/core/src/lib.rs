//! `crmdesk-core` — domain foundation shared by every crate.
//!
//! Holds the caller identity type and the error taxonomy. No IO, no storage.

pub mod error;
pub mod id;

pub use error::{CrmError, CrmResult};
pub use id::Username;
