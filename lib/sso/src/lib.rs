//! SSO client adapter for mailgate.
//!
//! This crate provides:
//! - SSO server configuration (`SsoConfig`, TLS validation policy)
//! - The capability traits the gateway drives (`SsoAdapter`, `SsoClient`)
//! - Per-session SSO state (`SsoSession`)
//! - A CAS protocol 3.0 client (`CasAdapter`, `CasClient`)
//! - Proxy-granting ticket storage (`PgtStore`)
//!
//! # Example
//!
//! ```
//! use mailgate_sso::{SsoConfig, ValidationMode};
//!
//! let config = SsoConfig::builder("sso.example.com".to_string())
//!     .port(8443)
//!     .validation(ValidationMode::None, None)
//!     .build();
//!
//! assert_eq!(
//!     config.server_base_url().unwrap().as_str(),
//!     "https://sso.example.com:8443/cas/"
//! );
//! ```

pub mod cas;
pub mod client;
pub mod config;
pub mod error;
pub mod pgt;
pub mod session;

// Re-export main types at crate root
pub use cas::{CasAdapter, CasClient};
pub use client::{Authentication, ClientSettings, PgtCallback, SsoAdapter, SsoClient};
pub use config::{OperatingMode, SsoConfig, SsoConfigBuilder, TlsValidation, ValidationMode};
pub use error::SsoError;
pub use pgt::{FilePgtStore, MemoryPgtStore, PgtStore};
pub use session::SsoSession;
