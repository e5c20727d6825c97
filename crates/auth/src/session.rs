//! Session registry: issues opaque tokens and resolves them back to identities.

use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crmdesk_core::Username;

use crate::token::SessionToken;

/// Session lifetime policy.
///
/// The default has no expiry and no cap on concurrent sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionPolicy {
    /// Sessions stop resolving once `issued_at + ttl` has passed.
    pub ttl: Option<Duration>,
    /// Upper bound on live sessions per identity; the oldest is evicted first.
    pub max_per_identity: Option<usize>,
}

/// A live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: Username,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    sessions: HashMap<SessionToken, Session>,
    // Issue order per identity; front is the oldest.
    by_identity: HashMap<Username, VecDeque<SessionToken>>,
}

impl RegistryState {
    fn remove(&mut self, token: &SessionToken) -> Option<Session> {
        let session = self.sessions.remove(token)?;
        if let Some(tokens) = self.by_identity.get_mut(&session.username) {
            tokens.retain(|t| t != token);
            if tokens.is_empty() {
                self.by_identity.remove(&session.username);
            }
        }
        Some(session)
    }

    fn purge_identity(&mut self, username: &Username, now: DateTime<Utc>) {
        let expired: Vec<SessionToken> = self
            .by_identity
            .get(username)
            .into_iter()
            .flatten()
            .filter(|t| self.sessions.get(*t).is_some_and(|s| !s.is_live_at(now)))
            .cloned()
            .collect();
        for token in expired {
            self.remove(&token);
        }
    }
}

/// Maps live tokens to identities.
///
/// Per-token lifecycle is `issued → resolved* → revoked | expired`; a token
/// that has left the registry never resolves again. Callers are expected to
/// pass only identities that exist in the credential store.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    policy: SessionPolicy,
    inner: RwLock<RegistryState>,
}

impl SessionRegistry {
    pub fn new(policy: SessionPolicy) -> Self {
        Self {
            policy,
            inner: RwLock::new(RegistryState::default()),
        }
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    pub fn issue(&self, username: &Username) -> SessionToken {
        self.issue_at(username, Utc::now())
    }

    /// Issue a new session for `username` as of `now`.
    ///
    /// The returned token is resolvable as soon as this returns.
    pub fn issue_at(&self, username: &Username, now: DateTime<Utc>) -> SessionToken {
        let mut state = self.write();

        let mut token = SessionToken::generate();
        while state.sessions.contains_key(&token) {
            token = SessionToken::generate();
        }

        if let Some(cap) = self.policy.max_per_identity {
            state.purge_identity(username, now);
            let cap = cap.max(1);
            while state.by_identity.get(username).is_some_and(|t| t.len() >= cap) {
                let oldest = state
                    .by_identity
                    .get(username)
                    .and_then(|t| t.front().cloned());
                match oldest {
                    Some(oldest) => {
                        state.remove(&oldest);
                        tracing::info!(username = %username, "evicted oldest session (per-identity cap)");
                    }
                    None => break,
                }
            }
        }

        let session = Session {
            username: username.clone(),
            issued_at: now,
            expires_at: self.policy.ttl.map(|ttl| now + ttl),
        };
        state.sessions.insert(token.clone(), session);
        state
            .by_identity
            .entry(username.clone())
            .or_default()
            .push_back(token.clone());

        tracing::debug!(username = %username, "session issued");
        token
    }

    pub fn resolve(&self, presented: &str) -> Option<Username> {
        self.resolve_at(presented, Utc::now())
    }

    /// Resolve a presented token to its identity as of `now`.
    ///
    /// Unknown, malformed, revoked and expired tokens all yield `None`.
    /// Expired entries found here are evicted.
    pub fn resolve_at(&self, presented: &str, now: DateTime<Utc>) -> Option<Username> {
        let token = SessionToken::parse(presented)?;

        {
            let state = self.read();
            let session = state.sessions.get(&token)?;
            if session.is_live_at(now) {
                return Some(session.username.clone());
            }
        }

        let mut state = self.write();
        if state.sessions.get(&token).is_some_and(|s| !s.is_live_at(now)) {
            state.remove(&token);
            tracing::debug!("expired session evicted on resolve");
        }
        None
    }

    /// Revoke a token. Unknown or malformed tokens are a no-op.
    pub fn revoke(&self, presented: &str) {
        let Some(token) = SessionToken::parse(presented) else {
            return;
        };
        if let Some(session) = self.write().remove(&token) {
            tracing::debug!(username = %session.username, "session revoked");
        }
    }

    /// Revoke every session of `username`. Returns how many were removed.
    pub fn revoke_all(&self, username: &Username) -> usize {
        let mut state = self.write();
        let tokens = state.by_identity.remove(username).unwrap_or_default();
        for token in &tokens {
            state.sessions.remove(token);
        }
        tokens.len()
    }

    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    /// Drop every session that is no longer live at `now`.
    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut state = self.write();
        let expired: Vec<SessionToken> = state
            .sessions
            .iter()
            .filter(|(_, s)| !s.is_live_at(now))
            .map(|(t, _)| t.clone())
            .collect();
        for token in &expired {
            state.remove(token);
        }
        expired.len()
    }

    /// Number of sessions held for `username` (including not-yet-evicted expired ones).
    pub fn session_count(&self, username: &Username) -> usize {
        self.read().by_identity.get(username).map_or(0, VecDeque::len)
    }

    pub fn len(&self) -> usize {
        self.read().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Every critical section leaves the maps consistent, so a poisoned lock
    // is recovered rather than turned into lost sessions.
    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn user(name: &str) -> Username {
        Username::new(name).unwrap()
    }

    #[test]
    fn issued_token_resolves_to_identity() {
        let registry = SessionRegistry::default();
        let alice = user("alice");

        let token = registry.issue(&alice);
        assert_eq!(registry.resolve(token.expose()), Some(alice));
    }

    #[test]
    fn token_does_not_embed_the_username() {
        let registry = SessionRegistry::default();
        let token = registry.issue(&user("alice"));
        assert!(!token.expose().contains("alice"));
    }

    #[test]
    fn unknown_and_malformed_tokens_resolve_to_none() {
        let registry = SessionRegistry::default();
        registry.issue(&user("alice"));

        assert_eq!(registry.resolve(""), None);
        assert_eq!(registry.resolve("Bearer"), None);
        assert_eq!(registry.resolve("token_alice_1700000000.0"), None);
        assert_eq!(registry.resolve(SessionToken::generate().expose()), None);
    }

    #[test]
    fn revoked_token_never_resolves_again() {
        let registry = SessionRegistry::default();
        let alice = user("alice");
        let token = registry.issue(&alice);

        registry.revoke(token.expose());
        assert_eq!(registry.resolve(token.expose()), None);

        // Idempotent, and a later login does not revive the old token.
        registry.revoke(token.expose());
        registry.revoke("not-a-token");
        let fresh = registry.issue(&alice);
        assert_ne!(fresh, token);
        assert_eq!(registry.resolve(token.expose()), None);
        assert_eq!(registry.resolve(fresh.expose()), Some(alice));
    }

    #[test]
    fn concurrent_sessions_are_independent() {
        let registry = SessionRegistry::default();
        let alice = user("alice");
        let t1 = registry.issue(&alice);
        let t2 = registry.issue(&alice);

        registry.revoke(t1.expose());
        assert_eq!(registry.resolve(t1.expose()), None);
        assert_eq!(registry.resolve(t2.expose()), Some(alice));
    }

    #[test]
    fn ttl_expires_sessions() {
        let registry = SessionRegistry::new(SessionPolicy {
            ttl: Some(Duration::minutes(30)),
            max_per_identity: None,
        });
        let alice = user("alice");
        let t0 = Utc::now();
        let token = registry.issue_at(&alice, t0);

        assert_eq!(
            registry.resolve_at(token.expose(), t0 + Duration::minutes(29)),
            Some(alice.clone())
        );
        assert_eq!(registry.resolve_at(token.expose(), t0 + Duration::minutes(30)), None);
        // Lazily evicted, so it stays gone even if the clock went backwards.
        assert_eq!(registry.resolve_at(token.expose(), t0), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn purge_expired_sweeps_only_expired_sessions() {
        let registry = SessionRegistry::new(SessionPolicy {
            ttl: Some(Duration::seconds(60)),
            max_per_identity: None,
        });
        let t0 = Utc::now();
        registry.issue_at(&user("alice"), t0);
        registry.issue_at(&user("bob"), t0 + Duration::seconds(45));

        assert_eq!(registry.purge_expired_at(t0 + Duration::seconds(90)), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.session_count(&user("alice")), 0);
        assert_eq!(registry.session_count(&user("bob")), 1);
    }

    #[test]
    fn no_ttl_means_no_expiry() {
        let registry = SessionRegistry::default();
        let t0 = Utc::now();
        let token = registry.issue_at(&user("alice"), t0);
        assert!(registry.resolve_at(token.expose(), t0 + Duration::days(3650)).is_some());
        assert_eq!(registry.purge_expired_at(t0 + Duration::days(3650)), 0);
    }

    #[test]
    fn cap_evicts_oldest_session() {
        let registry = SessionRegistry::new(SessionPolicy {
            ttl: None,
            max_per_identity: Some(2),
        });
        let alice = user("alice");
        let bob = user("bob");
        let t1 = registry.issue(&alice);
        let t2 = registry.issue(&alice);
        let tb = registry.issue(&bob);
        let t3 = registry.issue(&alice);

        assert_eq!(registry.resolve(t1.expose()), None);
        assert_eq!(registry.resolve(t2.expose()), Some(alice.clone()));
        assert_eq!(registry.resolve(t3.expose()), Some(alice.clone()));
        assert_eq!(registry.resolve(tb.expose()), Some(bob));
        assert_eq!(registry.session_count(&alice), 2);
    }

    #[test]
    fn revoke_all_ends_every_session_of_one_identity() {
        let registry = SessionRegistry::default();
        let alice = user("alice");
        let bob = user("bob");
        let a1 = registry.issue(&alice);
        let a2 = registry.issue(&alice);
        let b1 = registry.issue(&bob);

        assert_eq!(registry.revoke_all(&alice), 2);
        assert_eq!(registry.resolve(a1.expose()), None);
        assert_eq!(registry.resolve(a2.expose()), None);
        assert_eq!(registry.resolve(b1.expose()), Some(bob));
    }

    #[test]
    fn sessions_keep_working_after_a_panic_while_locked() {
        let registry = std::sync::Arc::new(SessionRegistry::default());
        let alice = user("alice");
        let before = registry.issue(&alice);

        let poisoner = registry.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.inner.write().unwrap();
            panic!("panic while holding the registry lock");
        })
        .join();
        assert!(registry.inner.is_poisoned());

        let after = registry.issue(&alice);
        assert_eq!(registry.resolve(before.expose()), Some(alice.clone()));
        assert_eq!(registry.resolve(after.expose()), Some(alice.clone()));
        assert_eq!(registry.session_count(&alice), 2);

        registry.revoke(after.expose());
        assert_eq!(registry.resolve(after.expose()), None);
        assert_eq!(registry.len(), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: N rapid logins for one identity yield N distinct tokens,
        /// each resolving to that identity.
        #[test]
        fn rapid_issuance_yields_distinct_tokens(n in 1usize..200) {
            let registry = SessionRegistry::default();
            let alice = user("alice");
            let now = Utc::now();

            let tokens: Vec<SessionToken> = (0..n).map(|_| registry.issue_at(&alice, now)).collect();
            let unique: HashSet<&SessionToken> = tokens.iter().collect();

            prop_assert_eq!(unique.len(), n);
            for token in &tokens {
                prop_assert_eq!(registry.resolve_at(token.expose(), now), Some(alice.clone()));
            }
        }
    }
}
