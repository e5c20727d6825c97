//! `crmdesk-gate` — the single path from a presented credential to tenant data.
//!
//! Record operations take a [`Caller`], and a `Caller` can only be obtained
//! from [`AccessGate::authenticate`]. Skipping authentication is a type error.

pub mod caller;
pub mod gate;

pub use caller::Caller;
pub use gate::{AccessGate, DashboardStats};
