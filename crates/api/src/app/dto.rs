use serde::{Deserialize, Serialize};

use crmdesk_auth::Identity;
use crmdesk_gate::DashboardStats;

// -------------------------
// Request DTOs
// -------------------------

/// Login body. Both fields are optional at the wire level so a missing one
/// can be reported as 400 rather than a deserialization rejection.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl LoginRequest {
    /// Both credentials, if present and non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let username = self.username.as_deref().filter(|u| !u.is_empty())?;
        let password = self.password.as_deref().filter(|p| !p.is_empty())?;
        Some((username, password))
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub username: String,
    pub email: Option<String>,
}

impl From<Identity> for WhoAmIResponse {
    fn from(identity: Identity) -> Self {
        Self {
            username: identity.username.into(),
            email: identity.email,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub username: String,
    pub stats: DashboardStats,
}
