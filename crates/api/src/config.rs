//! Process configuration, read from environment variables at startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crmdesk_auth::SessionPolicy;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Runtime settings for the API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// `BIND_ADDR`, or `0.0.0.0:$PORT` when only `PORT` is set.
    pub bind_addr: SocketAddr,
    /// `SESSION_TTL_SECS`; unset means sessions never expire.
    pub session_ttl: Option<chrono::Duration>,
    /// `MAX_SESSIONS_PER_USER`; unset means unlimited.
    pub max_sessions_per_user: Option<usize>,
    /// `SEED_DEMO_USERS`; seeds `admin` and `user1` at startup.
    pub seed_demo_users: bool,
    /// `DATA_FILE`; when set, records are journaled to this JSON-lines file.
    pub data_file: Option<PathBuf>,
    /// `SESSION_SWEEP_SECS`; how often expired sessions are purged.
    pub session_sweep_interval: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            session_ttl: None,
            max_sessions_per_user: None,
            seed_demo_users: true,
            data_file: None,
            session_sweep_interval: Duration::from_secs(60),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(addr) = get("BIND_ADDR") {
            config.bind_addr = addr.parse().map_err(|e| invalid("BIND_ADDR", e))?;
        } else if let Some(port) = get("PORT") {
            let port: u16 = port.parse().map_err(|e| invalid("PORT", e))?;
            config.bind_addr = SocketAddr::from(([0, 0, 0, 0], port));
        }

        if let Some(ttl) = get("SESSION_TTL_SECS") {
            let secs: i64 = ttl.parse().map_err(|e| invalid("SESSION_TTL_SECS", e))?;
            if secs <= 0 {
                return Err(invalid("SESSION_TTL_SECS", "must be positive"));
            }
            config.session_ttl = Some(chrono::Duration::seconds(secs));
        }

        if let Some(cap) = get("MAX_SESSIONS_PER_USER") {
            let cap: usize = cap.parse().map_err(|e| invalid("MAX_SESSIONS_PER_USER", e))?;
            if cap == 0 {
                return Err(invalid("MAX_SESSIONS_PER_USER", "must be at least 1"));
            }
            config.max_sessions_per_user = Some(cap);
        }

        if let Some(seed) = get("SEED_DEMO_USERS") {
            config.seed_demo_users = parse_bool(&seed).ok_or_else(|| invalid("SEED_DEMO_USERS", "expected true/false"))?;
        }

        config.data_file = get("DATA_FILE").map(PathBuf::from);

        if let Some(sweep) = get("SESSION_SWEEP_SECS") {
            let secs: u64 = sweep.parse().map_err(|e| invalid("SESSION_SWEEP_SECS", e))?;
            config.session_sweep_interval = Duration::from_secs(secs.max(1));
        }

        Ok(config)
    }

    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            ttl: self.session_ttl,
            max_per_identity: self.max_sessions_per_user,
        }
    }
}

fn invalid(var: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        var,
        reason: reason.to_string(),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_have_no_expiry_or_cap() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg, ApiConfig::default());
        assert_eq!(cfg.session_policy(), SessionPolicy::default());
        assert!(cfg.seed_demo_users);
    }

    #[test]
    fn reads_all_variables() {
        let cfg = config(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("SESSION_TTL_SECS", "1800"),
            ("MAX_SESSIONS_PER_USER", "3"),
            ("SEED_DEMO_USERS", "false"),
            ("DATA_FILE", "/var/lib/crmdesk/records.jsonl"),
            ("SESSION_SWEEP_SECS", "30"),
        ])
        .unwrap();

        assert_eq!(cfg.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(cfg.session_ttl, Some(chrono::Duration::minutes(30)));
        assert_eq!(cfg.max_sessions_per_user, Some(3));
        assert!(!cfg.seed_demo_users);
        assert_eq!(cfg.data_file, Some(PathBuf::from("/var/lib/crmdesk/records.jsonl")));
        assert_eq!(cfg.session_sweep_interval, Duration::from_secs(30));
    }

    #[test]
    fn port_is_used_when_bind_addr_is_absent() {
        let cfg = config(&[("PORT", "5000")]).unwrap();
        assert_eq!(cfg.bind_addr, SocketAddr::from(([0, 0, 0, 0], 5000)));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[("PORT", "http")]).is_err());
        assert!(config(&[("SESSION_TTL_SECS", "0")]).is_err());
        assert!(config(&[("MAX_SESSIONS_PER_USER", "0")]).is_err());
        assert!(matches!(
            config(&[("SEED_DEMO_USERS", "maybe")]),
            Err(ConfigError::Invalid { var: "SEED_DEMO_USERS", .. })
        ));
    }
}
