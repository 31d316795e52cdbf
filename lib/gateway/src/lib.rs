//! Authentication gateway between a webmail host and an SSO server.
//!
//! The host feeds the lifecycle events of each request into an [`Exchange`]
//! opened from a process-wide [`Gateway`]. The exchange delegates identity
//! checks to the SSO adapter, forwards the derived credentials to the mail
//! backend, and takes over the response whenever the SSO flow requires it.
//!
//! # Example
//!
//! ```
//! use mailgate_gateway::{ActionParams, RequestContext, ServerInfo, UrlBuilder};
//!
//! let ctx = RequestContext::new(ServerInfo::new("mail.example.com", 443, true, "/?_task=mail"));
//! let params = ActionParams::new().with("action", "login").with("task", "mail");
//!
//! assert_eq!(
//!     UrlBuilder::new(&ctx).build(&params),
//!     "https://mail.example.com/?_task=mail&_action=login"
//! );
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod machine;
pub mod page;
pub mod params;
pub mod response;
pub mod return_url;
pub mod session;
pub mod urls;

// Re-export main types at crate root
pub use cache::TicketCache;
pub use self::config::GatewayConfig;
pub use context::{RequestContext, ServerInfo};
pub use error::GatewayError;
pub use event::{
    BackendConnect, Credentials, Flow, HookOutcome, InterceptedEvent, LOGIN_TEMPLATE,
    PGT_CALLBACK_ACTION, Redirect, SSO_LOGOUT_ACTION, Termination,
};
pub use machine::{Exchange, Gateway, Phase};
pub use page::ErrorPage;
pub use params::{ActionParams, MalformedParams};
pub use response::respond;
pub use session::Session;
pub use urls::UrlBuilder;
