//! Host lifecycle events the gateway intercepts, and what it answers.

use axum_extra::extract::cookie::Cookie;
use mailgate_core::BackendNode;
use std::fmt;

use crate::page::ErrorPage;
use crate::params::ActionParams;

/// Host action that receives proxy-granting tickets from the SSO server.
pub const PGT_CALLBACK_ACTION: &str = "pgt-callback";

/// Host action that ends the SSO-side session.
pub const SSO_LOGOUT_ACTION: &str = "sso-logout";

/// Template name of the host's native login form.
pub const LOGIN_TEMPLATE: &str = "login";

/// Credentials the host is about to use.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// User name presented to the backend.
    pub user: String,
    /// Password or proxy ticket presented to the backend.
    pub pass: String,
}

impl Credentials {
    #[must_use]
    pub fn new(user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            pass: pass.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("pass", &"[REDACTED]")
            .finish()
    }
}

/// The host is about to open a connection to a mail-store backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConnect {
    /// Backend the connection targets.
    pub node: BackendNode,
    /// Connection attempt number, starting at 1.
    pub attempt: u32,
    /// Credentials to present.
    pub credentials: Credentials,
    /// Whether the host should retry once if this attempt fails.
    pub retry: bool,
}

impl BackendConnect {
    #[must_use]
    pub fn new(node: BackendNode, attempt: u32, credentials: Credentials) -> Self {
        Self {
            node,
            attempt,
            credentials,
            retry: false,
        }
    }
}

/// A point in the host's request lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptedEvent {
    /// Request start, with the requested `_action` if any.
    Startup { action: Option<String> },
    /// The host is about to render a page template.
    RenderPage { template: String },
    /// The host is about to authenticate the user.
    Authenticate(Credentials),
    /// Login succeeded; the payload is where the host will redirect to.
    LoginSucceeded(ActionParams),
    /// The backend rejected the login.
    LoginFailed,
    /// The host finished its own logout.
    LogoutSucceeded,
    /// The host is about to connect to a backend.
    BackendConnect(BackendConnect),
}

impl InterceptedEvent {
    /// Returns the variant name, for logs and errors.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Startup { .. } => "Startup",
            Self::RenderPage { .. } => "RenderPage",
            Self::Authenticate(_) => "Authenticate",
            Self::LoginSucceeded(_) => "LoginSucceeded",
            Self::LoginFailed => "LoginFailed",
            Self::LogoutSucceeded => "LogoutSucceeded",
            Self::BackendConnect(_) => "BackendConnect",
        }
    }
}

/// Where to send the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    /// A host action on this site, relative to the current path.
    Action(ActionParams),
    /// An absolute URL elsewhere, such as the SSO server.
    External(String),
}

impl Redirect {
    /// Returns the `Location` value for this redirect.
    #[must_use]
    pub fn location(&self) -> String {
        match self {
            Self::Action(params) => format!("./?{}", params.to_action_query()),
            Self::External(url) => url.clone(),
        }
    }
}

/// How an exchange ends when the gateway takes over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Redirect the browser.
    Redirect(Redirect),
    /// Render an error page, optionally destroying the host session first.
    ErrorPage { page: ErrorPage, kill_session: bool },
    /// End the exchange with an empty response.
    Finished,
}

/// Whether the host carries on with its own processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Resume the host with the (possibly rewritten) event.
    Continue(InterceptedEvent),
    /// Stop the host; the gateway owns the response.
    Terminate(Termination),
}

/// Result of handling one event.
#[derive(Debug, Clone)]
pub struct HookOutcome {
    pub flow: Flow,
    /// Cookies to set on the response.
    pub cookies: Vec<Cookie<'static>>,
}

impl HookOutcome {
    /// Continues the host with `event`.
    #[must_use]
    pub fn proceed(event: InterceptedEvent) -> Self {
        Self {
            flow: Flow::Continue(event),
            cookies: Vec::new(),
        }
    }

    /// Ends the exchange.
    #[must_use]
    pub fn terminate(termination: Termination) -> Self {
        Self {
            flow: Flow::Terminate(termination),
            cookies: Vec::new(),
        }
    }

    /// Adds a cookie to the response.
    #[must_use]
    pub fn with_cookie(mut self, cookie: Cookie<'static>) -> Self {
        self.cookies.push(cookie);
        self
    }

    /// Returns true if the gateway ended the exchange.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.flow, Flow::Terminate(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_hides_password() {
        let debug = format!("{:?}", Credentials::new("alice", "PT-secret"));
        assert!(debug.contains("alice"));
        assert!(!debug.contains("PT-secret"));
    }

    #[test]
    fn action_redirect_is_relative() {
        let redirect = Redirect::Action(ActionParams::new().with("action", SSO_LOGOUT_ACTION));
        assert_eq!(redirect.location(), "./?_action=sso-logout");
    }

    #[test]
    fn external_redirect_is_verbatim() {
        let url = "https://sso.example.com/cas/logout";
        assert_eq!(Redirect::External(url.to_string()).location(), url);
    }

    #[test]
    fn backend_connect_starts_without_retry() {
        let connect = BackendConnect::new(
            BackendNode::new("imap-1").unwrap(),
            1,
            Credentials::default(),
        );
        assert!(!connect.retry);
    }

    #[test]
    fn outcome_terminality() {
        assert!(HookOutcome::terminate(Termination::Finished).is_terminal());
        assert!(!HookOutcome::proceed(InterceptedEvent::LoginFailed).is_terminal());
    }
}
