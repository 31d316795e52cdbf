//! SSO state kept in the user's host session.
//!
//! The state is established once per login: the principal verified by the
//! SSO server and, in proxy mode, the proxy-granting ticket used to request
//! proxy tickets for backend services.

use mailgate_core::{Principal, ProxyGrantingTicket};
use serde::{Deserialize, Serialize};

/// SSO state of one user session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsoSession {
    /// The principal asserted by the SSO server.
    principal: Option<Principal>,
    /// Proxy-granting ticket delivered through the callback (proxy mode).
    pgt: Option<ProxyGrantingTicket>,
}

impl SsoSession {
    /// Creates an empty, unauthenticated session state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the authenticated principal, if any.
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Returns the proxy-granting ticket, if any.
    #[must_use]
    pub fn pgt(&self) -> Option<&ProxyGrantingTicket> {
        self.pgt.as_ref()
    }

    /// Returns true if the session is authenticated for the given mode.
    ///
    /// Proxy mode additionally needs a proxy-granting ticket.
    #[must_use]
    pub fn is_authenticated(&self, proxy: bool) -> bool {
        self.principal.is_some() && (!proxy || self.pgt.is_some())
    }

    /// Records a successful ticket validation.
    pub fn establish(&mut self, principal: Principal, pgt: Option<ProxyGrantingTicket>) {
        self.principal = Some(principal);
        self.pgt = pgt;
    }

    /// Forgets everything learned from the SSO server.
    pub fn clear(&mut self) {
        self.principal = None;
        self.pgt = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal() -> Principal {
        Principal::new("alice").expect("valid")
    }

    #[test]
    fn new_session_is_unauthenticated() {
        let session = SsoSession::new();
        assert!(session.principal().is_none());
        assert!(!session.is_authenticated(false));
        assert!(!session.is_authenticated(true));
    }

    #[test]
    fn direct_mode_needs_only_principal() {
        let mut session = SsoSession::new();
        session.establish(principal(), None);
        assert!(session.is_authenticated(false));
        assert!(!session.is_authenticated(true));
    }

    #[test]
    fn proxy_mode_needs_pgt() {
        let mut session = SsoSession::new();
        session.establish(
            principal(),
            Some(ProxyGrantingTicket::new("PGT-1-abc").expect("valid")),
        );
        assert!(session.is_authenticated(true));
        assert_eq!(session.principal(), Some(&principal()));
    }

    #[test]
    fn clear_forgets_state() {
        let mut session = SsoSession::new();
        session.establish(
            principal(),
            Some(ProxyGrantingTicket::new("PGT-1-abc").expect("valid")),
        );
        session.clear();
        assert!(session.principal().is_none());
        assert!(session.pgt().is_none());
    }
}
