//! Error types for the gateway crate.

use std::fmt;

/// Errors surfaced by the gateway to its host.
///
/// SSO adapter failures never appear here; the state machine absorbs them
/// into the host's native failure paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Configuration could not be loaded or is inconsistent.
    Configuration { reason: String },
    /// The exchange already ended; no further hooks may run in this request.
    Terminated { event: &'static str },
    /// The event needs the user's session but none was supplied.
    SessionRequired { event: &'static str },
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { reason } => {
                write!(f, "invalid gateway configuration: {reason}")
            }
            Self::Terminated { event } => {
                write!(f, "exchange already terminated, refusing {event}")
            }
            Self::SessionRequired { event } => {
                write!(f, "{event} requires a session")
            }
        }
    }
}

impl std::error::Error for GatewayError {}
