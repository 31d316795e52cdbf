//! Absolute URLs back to this host for use with the SSO server.
//!
//! The SSO server compares the service URL byte for byte between the login
//! redirect and ticket validation, so the same request context and
//! parameters must always produce the same string.

use crate::context::RequestContext;
use crate::params::{ActionParams, encode_action_pairs};

/// Builds fully-qualified URLs to the current host.
#[derive(Debug, Clone, Copy)]
pub struct UrlBuilder<'a> {
    ctx: &'a RequestContext,
}

impl<'a> UrlBuilder<'a> {
    /// Creates a builder for the given request.
    #[must_use]
    pub fn new(ctx: &'a RequestContext) -> Self {
        Self { ctx }
    }

    /// Returns `scheme://host[:port]/path` for the current request.
    ///
    /// The port is left out when it is the scheme's default.
    #[must_use]
    pub fn base(&self) -> String {
        let server = self.ctx.server();
        let secure = server.is_secure();
        let scheme = if secure { "https" } else { "http" };
        let port = match (secure, server.effective_port()) {
            (false, 80) | (true, 443) => String::new(),
            (_, port) => format!(":{port}"),
        };
        format!("{scheme}://{}{port}{}", server.name, server.path())
    }

    /// Returns the base URL with `params` appended as a query string.
    ///
    /// Parameters are emitted in reverse declaration order, so
    /// `{action: login, task: mail}` yields `?_task=mail&_action=login`.
    /// Names without the `_` marker gain it; empty values are skipped.
    #[must_use]
    pub fn build(&self, params: &ActionParams) -> String {
        let query = encode_action_pairs(params.iter().rev());
        if query.is_empty() {
            self.base()
        } else {
            format!("{}?{query}", self.base())
        }
    }
}
