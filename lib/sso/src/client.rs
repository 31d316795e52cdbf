//! Capability interface over the SSO client.
//!
//! The gateway drives the SSO server only through these traits, so the
//! protocol client can be swapped (or faked in tests) without touching the
//! authentication state machine.

use async_trait::async_trait;
use mailgate_core::{PgtIou, Principal, ProxyGrantingTicket, ProxyTicket, ServiceTicket};
use rootcause::Report;

use crate::config::OperatingMode;
use crate::error::SsoError;
use crate::session::SsoSession;

/// Per-request settings a client is initialized with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Credential forwarding mode.
    pub mode: OperatingMode,
    /// URL the SSO server sends the browser back to with a service ticket.
    pub service_url: String,
    /// URL the SSO server delivers proxy-granting tickets to (proxy mode).
    pub callback_url: Option<String>,
}

/// Outcome of forcing authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    /// The request carries a verified identity.
    Authenticated(Principal),
    /// No ticket yet; the browser must be sent to this SSO login URL.
    Redirect(String),
}

/// Parameters the SSO server posts to the proxy-granting ticket callback.
///
/// Both are absent when the server merely probes the callback URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PgtCallback {
    /// The IOU the validation response will refer to.
    pub iou: Option<PgtIou>,
    /// The proxy-granting ticket itself.
    pub pgt: Option<ProxyGrantingTicket>,
}

impl PgtCallback {
    /// Extracts the callback parameters from decoded query pairs.
    ///
    /// Malformed values are treated as absent.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut callback = Self::default();
        for (key, value) in pairs {
            match key {
                "pgtIou" => callback.iou = PgtIou::new(value).ok(),
                "pgtId" => callback.pgt = ProxyGrantingTicket::new(value).ok(),
                _ => {}
            }
        }
        callback
    }
}

/// A client configured for one request.
#[async_trait]
pub trait SsoClient: Send + Sync {
    /// Ensures the request is authenticated.
    ///
    /// Returns the principal already recorded in `session`, or validates
    /// `ticket` with the SSO server and records the result, or asks for a
    /// redirect to the SSO login when there is no ticket.
    ///
    /// # Errors
    ///
    /// Returns an error if the ticket is rejected or the server cannot be
    /// reached. Callers must treat this as "must re-authenticate".
    async fn force_authentication(
        &self,
        ticket: Option<&ServiceTicket>,
        session: &mut SsoSession,
    ) -> Result<Authentication, Report<SsoError>>;

    /// Requests a proxy ticket for `target_service` on the user's behalf.
    ///
    /// # Errors
    ///
    /// Returns `ProxyTicketRejected` with the server's code and diagnostic,
    /// or `NotAuthenticated` if the session holds no proxy-granting ticket.
    async fn fetch_proxy_ticket(
        &self,
        session: &SsoSession,
        target_service: &str,
    ) -> Result<ProxyTicket, Report<SsoError>>;

    /// Returns the URL that ends the SSO-side session.
    async fn logout(&self) -> Result<String, Report<SsoError>>;

    /// Accepts a proxy-granting ticket delivered by the SSO server.
    async fn receive_pgt_callback(&self, callback: PgtCallback) -> Result<(), Report<SsoError>>;
}

/// Factory turning per-request settings into a configured client.
pub trait SsoAdapter: Send + Sync {
    /// The client type produced.
    type Client: SsoClient;

    /// Builds a client for one request.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be applied.
    fn initialize(&self, settings: ClientSettings) -> Result<Self::Client, Report<SsoError>>;
}
