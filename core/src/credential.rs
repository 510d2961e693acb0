//! Shared slot holding the current session credential.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// The access token attached to authenticated requests.
///
/// Clones share one slot: rotating the token through any clone is seen by
/// every other clone on its next read. The lock is held only to copy the
/// token in or out.
#[derive(Clone, Default)]
pub struct CredentialStore {
    slot: Arc<RwLock<Option<String>>>,
}

impl CredentialStore {
    pub fn set(&self, token: impl Into<String>) {
        let token = token.into();
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    pub fn clear(&self) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn current(&self) -> Option<String> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

// Never print the token itself.
impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.current().is_some() { "set" } else { "empty" };
        f.debug_struct("CredentialStore").field("token", &state).finish()
    }
}
