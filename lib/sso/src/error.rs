//! Error types for the SSO adapter crate.
//!
//! Errors are designed for layered context using rootcause. Callers at the
//! gateway boundary treat every variant as "must re-authenticate"; none of
//! them is surfaced to the browser directly.

use std::fmt;

/// Errors from SSO client operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SsoError {
    /// The SSO configuration is incomplete or inconsistent.
    Configuration { reason: String },
    /// The configured server certificate could not be loaded.
    Certificate { path: String, reason: String },
    /// The SSO server could not be reached or answered with an HTTP error.
    Transport { endpoint: String, reason: String },
    /// The SSO server rejected a service ticket.
    TicketRejected { code: String, description: String },
    /// The SSO server refused to issue a proxy ticket.
    ProxyTicketRejected { code: String, description: String },
    /// The SSO server answered with a body that could not be understood.
    MalformedResponse { endpoint: String, reason: String },
    /// No proxy-granting ticket was delivered for the given IOU.
    PgtUnavailable { iou: String },
    /// The operation needs an authenticated SSO session.
    NotAuthenticated,
    /// Proxy-granting ticket storage failed.
    PgtStorage { reason: String },
}

impl fmt::Display for SsoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { reason } => {
                write!(f, "invalid SSO configuration: {reason}")
            }
            Self::Certificate { path, reason } => {
                write!(f, "failed to load SSO server certificate '{path}': {reason}")
            }
            Self::Transport { endpoint, reason } => {
                write!(f, "request to SSO endpoint '{endpoint}' failed: {reason}")
            }
            Self::TicketRejected { code, description } => {
                write!(f, "service ticket rejected ({code}): {description}")
            }
            Self::ProxyTicketRejected { code, description } => {
                write!(f, "proxy ticket request rejected ({code}): {description}")
            }
            Self::MalformedResponse { endpoint, reason } => {
                write!(f, "malformed response from '{endpoint}': {reason}")
            }
            Self::PgtUnavailable { iou } => {
                write!(f, "no proxy-granting ticket delivered for IOU {iou}")
            }
            Self::NotAuthenticated => {
                write!(f, "no authenticated SSO session")
            }
            Self::PgtStorage { reason } => {
                write!(f, "proxy-granting ticket storage failed: {reason}")
            }
        }
    }
}

impl std::error::Error for SsoError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_rejected_display_carries_code() {
        let err = SsoError::TicketRejected {
            code: "INVALID_TICKET".to_string(),
            description: "Ticket ST-1 not recognized".to_string(),
        };
        assert!(err.to_string().contains("INVALID_TICKET"));
        assert!(err.to_string().contains("not recognized"));
    }

    #[test]
    fn proxy_rejected_display() {
        let err = SsoError::ProxyTicketRejected {
            code: "INVALID_REQUEST".to_string(),
            description: "pgt missing".to_string(),
        };
        assert!(err.to_string().contains("proxy ticket"));
        assert!(err.to_string().contains("INVALID_REQUEST"));
    }

    #[test]
    fn transport_display_names_endpoint() {
        let err = SsoError::Transport {
            endpoint: "https://sso.example.com/cas/proxy".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("sso.example.com"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn not_authenticated_display() {
        assert!(
            SsoError::NotAuthenticated
                .to_string()
                .contains("no authenticated")
        );
    }
}
