//! `crmdesk-auth` — credentials and sessions.
//!
//! This crate is decoupled from HTTP and from record storage. It answers two
//! questions: "is this the right password?" and "which identity does this
//! token belong to?".

pub mod credentials;
pub mod hasher;
pub mod session;
pub mod token;

pub use credentials::{CredentialStore, Identity};
pub use hasher::{Argon2Hasher, CredentialHasher};
pub use session::{Session, SessionPolicy, SessionRegistry};
pub use token::SessionToken;
