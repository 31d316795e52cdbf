//! SSO server configuration.
//!
//! This module provides configuration types for connecting to the external
//! CAS server that verifies user identity and issues tickets.

use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::SsoError;

/// How the gateway forwards credentials to the mail-store backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    /// Forward a static credential shared with the backend.
    #[default]
    Direct,
    /// Act as an SSO proxy and forward per-backend proxy tickets.
    Proxy,
}

impl OperatingMode {
    /// Returns true in proxy mode.
    #[must_use]
    pub fn is_proxy(self) -> bool {
        matches!(self, Self::Proxy)
    }
}

/// How the SSO server's TLS certificate is checked, as written in config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Accept any server certificate.
    #[default]
    None,
    /// Trust exactly one self-signed server certificate.
    #[serde(rename = "self")]
    SelfSigned,
    /// Trust server certificates issued by one certificate authority.
    Ca,
}

/// Resolved TLS validation policy with its certificate path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsValidation {
    /// No server validation.
    None,
    /// Pin the given self-signed certificate (PEM).
    SelfSigned(PathBuf),
    /// Trust the given CA certificate (PEM).
    Ca(PathBuf),
}

/// Configuration for the SSO server.
///
/// Fields with defaults can be omitted when loading from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsoConfig {
    /// SSO server host name (e.g., "sso.example.com").
    hostname: String,
    /// SSO server HTTPS port.
    /// Default: 443
    #[serde(default = "default_port")]
    port: u16,
    /// Path under which the CAS endpoints live.
    /// Default: "/cas"
    #[serde(default = "default_base_path")]
    base_path: String,
    /// TLS validation mode for the SSO server.
    /// Default: none
    #[serde(default)]
    validation: ValidationMode,
    /// PEM certificate used by the `self` and `ca` validation modes.
    #[serde(default)]
    cert_path: Option<PathBuf>,
    /// Replaces the derived login URL when set.
    #[serde(default)]
    login_url: Option<String>,
    /// Replaces the derived logout URL when set.
    #[serde(default)]
    logout_url: Option<String>,
    /// Timeout for a single round-trip to the SSO server, in seconds.
    /// Default: 10
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

fn default_port() -> u16 {
    443
}

fn default_base_path() -> String {
    "/cas".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl SsoConfig {
    /// Creates a new SSO configuration with defaults for optional fields.
    #[must_use]
    pub fn new(hostname: String) -> Self {
        Self {
            hostname,
            port: default_port(),
            base_path: default_base_path(),
            validation: ValidationMode::default(),
            cert_path: None,
            login_url: None,
            logout_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Creates a configuration builder for more customization.
    #[must_use]
    pub fn builder(hostname: String) -> SsoConfigBuilder {
        SsoConfigBuilder::new(hostname)
    }

    /// Returns the SSO server host name.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Returns the SSO server port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the base path of the CAS endpoints.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Returns the configured validation mode.
    #[must_use]
    pub fn validation(&self) -> ValidationMode {
        self.validation
    }

    /// Returns the certificate path, if any.
    #[must_use]
    pub fn cert_path(&self) -> Option<&Path> {
        self.cert_path.as_deref()
    }

    /// Returns the login URL override, ignoring blank values.
    #[must_use]
    pub fn login_url(&self) -> Option<&str> {
        non_blank(self.login_url.as_deref())
    }

    /// Returns the logout URL override, ignoring blank values.
    #[must_use]
    pub fn logout_url(&self) -> Option<&str> {
        non_blank(self.logout_url.as_deref())
    }

    /// Returns the round-trip timeout.
    #[must_use]
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }

    /// Returns the base URL of the CAS endpoints, always ending in `/`.
    ///
    /// The port is omitted when it is the HTTPS default.
    ///
    /// # Errors
    ///
    /// Returns an error if the host name or base path do not form a valid URL.
    pub fn server_base_url(&self) -> Result<Url, Report<SsoError>> {
        let port = if self.port == 443 {
            String::new()
        } else {
            format!(":{}", self.port)
        };
        let path = self.base_path.trim_matches('/');
        let raw = if path.is_empty() {
            format!("https://{}{port}/", self.hostname)
        } else {
            format!("https://{}{port}/{path}/", self.hostname)
        };
        Url::parse(&raw).map_err(|e| {
            SsoError::Configuration {
                reason: format!("invalid SSO server URL '{raw}': {e}"),
            }
            .into()
        })
    }

    /// Resolves the validation mode and certificate path into a policy.
    ///
    /// # Errors
    ///
    /// Returns an error if `self` or `ca` validation is configured without
    /// a certificate path.
    pub fn tls_validation(&self) -> Result<TlsValidation, Report<SsoError>> {
        match (self.validation, &self.cert_path) {
            (ValidationMode::None, _) => Ok(TlsValidation::None),
            (ValidationMode::SelfSigned, Some(path)) => Ok(TlsValidation::SelfSigned(path.clone())),
            (ValidationMode::Ca, Some(path)) => Ok(TlsValidation::Ca(path.clone())),
            (mode, None) => Err(SsoError::Configuration {
                reason: format!("validation mode {mode:?} requires cert_path"),
            }
            .into()),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Builder for `SsoConfig`.
#[derive(Debug)]
pub struct SsoConfigBuilder {
    config: SsoConfig,
}

impl SsoConfigBuilder {
    /// Creates a new builder with required fields.
    #[must_use]
    pub fn new(hostname: String) -> Self {
        Self {
            config: SsoConfig::new(hostname),
        }
    }

    /// Sets the SSO server port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the base path of the CAS endpoints.
    #[must_use]
    pub fn base_path(mut self, base_path: String) -> Self {
        self.config.base_path = base_path;
        self
    }

    /// Sets the validation mode and its certificate.
    #[must_use]
    pub fn validation(mut self, mode: ValidationMode, cert_path: Option<PathBuf>) -> Self {
        self.config.validation = mode;
        self.config.cert_path = cert_path;
        self
    }

    /// Overrides the login URL.
    #[must_use]
    pub fn login_url(mut self, url: String) -> Self {
        self.config.login_url = Some(url);
        self
    }

    /// Overrides the logout URL.
    #[must_use]
    pub fn logout_url(mut self, url: String) -> Self {
        self.config.logout_url = Some(url);
        self
    }

    /// Sets the round-trip timeout in seconds.
    #[must_use]
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    /// Builds the `SsoConfig`.
    #[must_use]
    pub fn build(self) -> SsoConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_config_has_defaults() {
        let config = SsoConfig::new("sso.example.com".to_string());

        assert_eq!(config.hostname(), "sso.example.com");
        assert_eq!(config.port(), 443);
        assert_eq!(config.base_path(), "/cas");
        assert_eq!(config.validation(), ValidationMode::None);
        assert!(config.login_url().is_none());
        assert_eq!(config.timeout(), std::time::Duration::from_secs(10));
    }

    #[test]
    fn base_url_omits_default_port() {
        let config = SsoConfig::new("sso.example.com".to_string());
        assert_eq!(
            config.server_base_url().expect("valid").as_str(),
            "https://sso.example.com/cas/"
        );
    }

    #[test]
    fn base_url_keeps_custom_port_and_trims_slashes() {
        let config = SsoConfig::builder("sso.example.com".to_string())
            .port(8443)
            .base_path("/auth/cas/".to_string())
            .build();
        assert_eq!(
            config.server_base_url().expect("valid").as_str(),
            "https://sso.example.com:8443/auth/cas/"
        );
    }

    #[test]
    fn base_url_with_empty_path() {
        let config = SsoConfig::builder("sso.example.com".to_string())
            .base_path(String::new())
            .build();
        assert_eq!(
            config.server_base_url().expect("valid").as_str(),
            "https://sso.example.com/"
        );
    }

    #[test]
    fn ca_validation_requires_cert_path() {
        let config = SsoConfig::builder("sso.example.com".to_string())
            .validation(ValidationMode::Ca, None)
            .build();
        assert!(config.tls_validation().is_err());

        let config = SsoConfig::builder("sso.example.com".to_string())
            .validation(ValidationMode::Ca, Some(PathBuf::from("/etc/ssl/ca.pem")))
            .build();
        assert_eq!(
            config.tls_validation().expect("valid"),
            TlsValidation::Ca(PathBuf::from("/etc/ssl/ca.pem"))
        );
    }

    #[test]
    fn blank_overrides_are_ignored() {
        let config = SsoConfig::builder("sso.example.com".to_string())
            .login_url("  ".to_string())
            .logout_url("https://sso.example.com/cas/logout?x=1".to_string())
            .build();
        assert!(config.login_url().is_none());
        assert_eq!(
            config.logout_url(),
            Some("https://sso.example.com/cas/logout?x=1")
        );
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let json = r#"{
            "hostname": "sso.example.com",
            "validation": "self",
            "cert_path": "/etc/mailgate/sso.pem"
        }"#;

        let config: SsoConfig = serde_json::from_str(json).expect("deserialize");

        assert_eq!(config.port(), 443);
        assert_eq!(config.validation(), ValidationMode::SelfSigned);
        assert_eq!(
            config.tls_validation().expect("valid"),
            TlsValidation::SelfSigned(PathBuf::from("/etc/mailgate/sso.pem"))
        );
    }

    #[test]
    fn operating_mode_parses_lowercase() {
        let mode: OperatingMode = serde_json::from_str("\"proxy\"").expect("deserialize");
        assert!(mode.is_proxy());
        assert!(!OperatingMode::default().is_proxy());
    }
}
