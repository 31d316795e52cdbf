//! Strongly-typed identifiers for values exchanged with the SSO server and
//! the mail-store backend.
//!
//! All identifiers are opaque strings issued by an external party. Parsing
//! rejects empty values and values containing whitespace or control
//! characters, which never occur in well-formed tickets or host names.
//! Ticket types redact their value in `Debug` output.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when parsing an identifier from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of identifier that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

fn check_opaque(id_type: &'static str, s: &str) -> Result<(), ParseIdError> {
    if s.is_empty() {
        return Err(ParseIdError {
            id_type,
            reason: "value is empty".to_string(),
        });
    }
    if let Some(c) = s.chars().find(|c| c.is_whitespace() || c.is_control()) {
        return Err(ParseIdError {
            id_type,
            reason: format!("invalid character {c:?}"),
        });
    }
    Ok(())
}

/// Macro to generate a strongly-typed wrapper around an opaque string.
///
/// The `secret` form redacts the value in `Debug` and omits `Display`, so a
/// ticket only leaves the type through an explicit `as_str()`.
macro_rules! define_id {
    (@common $(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier, validating its contents.
            ///
            /// # Errors
            ///
            /// Returns an error if the value is empty or contains
            /// whitespace or control characters.
            pub fn new(value: impl Into<String>) -> Result<Self, ParseIdError> {
                let value = value.into();
                check_opaque(stringify!($name), &value)?;
                Ok(Self(value))
            }

            /// Returns the raw value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ParseIdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
    (secret $(#[$meta:meta])* $name:ident) => {
        define_id!(@common $(#[$meta])* $name);

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}([REDACTED])", stringify!($name))
            }
        }
    };
    ($(#[$meta:meta])* $name:ident) => {
        define_id!(@common $(#[$meta])* $name);

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.0).finish()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

define_id!(
    /// The identity asserted by the SSO server for an authenticated user.
    Principal
);

define_id!(
    /// The specific mail-store server instance a connection attempt targets.
    BackendNode
);

define_id!(
    /// Handle the SSO server returns on validation and posts to the callback
    /// together with the proxy-granting ticket it stands for.
    PgtIou
);

define_id!(secret
    /// Short-lived proof of authentication issued to this gateway.
    ServiceTicket
);

define_id!(secret
    /// Credential allowing the gateway to request proxy tickets on the
    /// user's behalf.
    ProxyGrantingTicket
);

define_id!(secret
    /// Per-backend credential presented to the mail store instead of a
    /// real password.
    ProxyTicket
);
