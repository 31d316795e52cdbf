//! Per-user gateway state kept by the host for the browser session.

use mailgate_core::Principal;
use mailgate_sso::SsoSession;
use tokio::sync::{Mutex, MutexGuard};

use crate::cache::TicketCache;

/// Host-owned session state the gateway reads and writes.
///
/// Created when the host starts a session and dropped with it; the ticket
/// cache therefore never outlives the login it was filled for.
#[derive(Debug, Default)]
pub struct Session {
    sso: Mutex<SsoSession>,
    tickets: TicketCache,
}

impl Session {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session resuming previously persisted SSO state.
    #[must_use]
    pub fn with_sso(sso: SsoSession) -> Self {
        Self {
            sso: Mutex::new(sso),
            tickets: TicketCache::new(),
        }
    }

    /// Locks the SSO state for the duration of one adapter call.
    pub async fn sso(&self) -> MutexGuard<'_, SsoSession> {
        self.sso.lock().await
    }

    /// Returns the proxy ticket cache.
    #[must_use]
    pub fn tickets(&self) -> &TicketCache {
        &self.tickets
    }

    /// Returns the authenticated principal, if any.
    pub async fn principal(&self) -> Option<Principal> {
        self.sso.lock().await.principal().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_session_has_no_principal() {
        let session = Session::new();
        assert!(session.principal().await.is_none());
        assert!(session.tickets().is_empty().await);
    }

    #[tokio::test]
    async fn sso_state_is_shared() {
        let session = Session::new();
        session
            .sso()
            .await
            .establish(Principal::new("alice").unwrap(), None);
        assert_eq!(
            session.principal().await,
            Some(Principal::new("alice").unwrap())
        );
    }
}
