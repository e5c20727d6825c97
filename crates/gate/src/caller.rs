use crmdesk_core::Username;

/// Proof that a request authenticated as `username`.
///
/// Immutable, and constructible only inside this crate (by the gate after a
/// successful token resolution).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    username: Username,
}

impl Caller {
    pub(crate) fn new(username: Username) -> Self {
        Self { username }
    }

    pub fn username(&self) -> &Username {
        &self.username
    }
}
