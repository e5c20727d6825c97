//! Opaque session tokens.

use rand::RngCore;
use rand::rngs::OsRng;

/// Random bytes per token (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Length of the rendered token (lowercase hex).
pub const TOKEN_LEN: usize = TOKEN_BYTES * 2;

/// An opaque bearer token.
///
/// Drawn from the OS CSPRNG and unrelated to the identity it maps to. `Debug`
/// redacts the value so tokens cannot leak through logs.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generate a fresh token. No shared counter; every call draws its own entropy.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Accept a presented token only if it has the shape `generate` produces.
    pub fn parse(presented: &str) -> Option<Self> {
        let well_formed = presented.len() == TOKEN_LEN
            && presented
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        well_formed.then(|| Self(presented.to_string()))
    }

    /// The raw token value, for handing back to the client exactly once.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "SessionToken({}…)", &self.0[..6.min(self.0.len())])
    }
}
