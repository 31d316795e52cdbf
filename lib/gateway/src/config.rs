//! Process-wide gateway configuration.
//!
//! Loaded once via the `config` crate from `MAILGATE__*` environment
//! variables, validated, and shared immutably afterwards.

use mailgate_core::Result;
use mailgate_sso::{OperatingMode, SsoConfig};
use rootcause::Report;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::GatewayError;

/// Prefix of every gateway environment variable.
pub const ENV_PREFIX: &str = "MAILGATE";

/// Gateway configuration.
///
/// Example environment:
///
/// ```text
/// MAILGATE__SSO__HOSTNAME=sso.example.com
/// MAILGATE__SSO__VALIDATION=ca
/// MAILGATE__SSO__CERT_PATH=/etc/mailgate/ca.pem
/// MAILGATE__MODE=proxy
/// MAILGATE__PROXY_CONSUMER=imap://mail.example.com
/// MAILGATE__BACKEND_CACHING=true
/// ```
#[derive(Clone, Deserialize)]
pub struct GatewayConfig {
    /// SSO server connection settings.
    sso: SsoConfig,
    /// Credential forwarding mode.
    /// Default: direct
    #[serde(default)]
    mode: OperatingMode,
    /// Service name proxy tickets are requested for (proxy mode).
    #[serde(default)]
    proxy_consumer: Option<String>,
    /// Whether the backend accepts a proxy ticket more than once.
    /// Default: false
    #[serde(default)]
    backend_caching: bool,
    /// Password forwarded to the backend in direct mode.
    #[serde(default)]
    static_credential: Option<String>,
    /// Directory for proxy-granting tickets awaiting validation.
    /// Tickets are kept in memory when unset.
    #[serde(default)]
    pgt_dir: Option<PathBuf>,
    /// Whether to set the Secure flag on gateway cookies.
    /// Default: true
    #[serde(default = "default_secure_cookies")]
    secure_cookies: bool,
}

fn default_secure_cookies() -> bool {
    true
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("sso", &self.sso)
            .field("mode", &self.mode)
            .field("proxy_consumer", &self.proxy_consumer)
            .field("backend_caching", &self.backend_caching)
            .field(
                "static_credential",
                &self.static_credential.as_ref().map(|_| "[REDACTED]"),
            )
            .field("pgt_dir", &self.pgt_dir)
            .field("secure_cookies", &self.secure_cookies)
            .finish()
    }
}

impl GatewayConfig {
    /// Creates a direct-mode configuration forwarding `static_credential`.
    #[must_use]
    pub fn direct(sso: SsoConfig, static_credential: impl Into<String>) -> Self {
        Self {
            sso,
            mode: OperatingMode::Direct,
            proxy_consumer: None,
            backend_caching: false,
            static_credential: Some(static_credential.into()),
            pgt_dir: None,
            secure_cookies: default_secure_cookies(),
        }
    }

    /// Creates a proxy-mode configuration requesting tickets for `consumer`.
    #[must_use]
    pub fn proxy(sso: SsoConfig, consumer: impl Into<String>, backend_caching: bool) -> Self {
        Self {
            sso,
            mode: OperatingMode::Proxy,
            proxy_consumer: Some(consumer.into()),
            backend_caching,
            static_credential: None,
            pgt_dir: None,
            secure_cookies: default_secure_cookies(),
        }
    }

    /// Sets the proxy-granting ticket directory.
    #[must_use]
    pub fn with_pgt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.pgt_dir = Some(dir.into());
        self
    }

    /// Sets whether cookies carry the Secure flag.
    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    /// Loads and validates configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, GatewayError> {
        let config: Self = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| GatewayError::Configuration {
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the settings needed by the chosen mode are present.
    ///
    /// # Errors
    ///
    /// Returns an error if proxy mode has no consumer, direct mode has no
    /// static credential, or certificate validation has no certificate.
    pub fn validate(&self) -> Result<(), GatewayError> {
        let missing = |reason: &str| -> Report<GatewayError> {
            GatewayError::Configuration {
                reason: reason.to_string(),
            }
            .into()
        };

        if self.sso.hostname().trim().is_empty() {
            return Err(missing("sso.hostname must not be empty"));
        }
        match self.mode {
            OperatingMode::Proxy if self.proxy_consumer().is_none() => {
                return Err(missing("proxy mode requires proxy_consumer"));
            }
            OperatingMode::Direct if self.static_credential.is_none() => {
                return Err(missing("direct mode requires static_credential"));
            }
            _ => {}
        }
        self.sso.tls_validation().map_err(|e| GatewayError::Configuration {
            reason: e.to_string(),
        })?;
        Ok(())
    }

    #[must_use]
    pub fn sso(&self) -> &SsoConfig {
        &self.sso
    }

    #[must_use]
    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// Returns the proxy ticket consumer, ignoring blank values.
    #[must_use]
    pub fn proxy_consumer(&self) -> Option<&str> {
        self.proxy_consumer
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    #[must_use]
    pub fn backend_caching(&self) -> bool {
        self.backend_caching
    }

    /// Returns the static backend credential (direct mode).
    #[must_use]
    pub fn static_credential(&self) -> Option<&str> {
        self.static_credential.as_deref()
    }

    #[must_use]
    pub fn pgt_dir(&self) -> Option<&Path> {
        self.pgt_dir.as_deref()
    }

    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }
}
