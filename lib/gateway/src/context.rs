//! Explicit per-request state handed to the gateway.
//!
//! Everything the state machine reads from the inbound request (query and
//! form fields, cookies, server metadata) travels in a `RequestContext`
//! value; there is no ambient request state.

use axum::http::{HeaderMap, header, request::Parts};
use axum_extra::extract::CookieJar;
use std::collections::HashMap;
use url::form_urlencoded;

/// Header set by TLS-terminating proxies to report the original scheme.
pub const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Header set by TLS-terminating proxies to report the original port.
pub const FORWARDED_PORT: &str = "x-forwarded-port";

/// How the request reached the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// Host name the request was addressed to.
    pub name: String,
    /// Port the host received the request on.
    pub port: u16,
    /// Whether the host itself terminated TLS.
    pub tls: bool,
    /// Scheme reported by a TLS-terminating proxy.
    pub forwarded_proto: Option<String>,
    /// Port reported by a TLS-terminating proxy.
    pub forwarded_port: Option<u16>,
    /// Request path including the query string.
    pub request_uri: String,
}

impl ServerInfo {
    /// Creates server metadata for a request received directly.
    #[must_use]
    pub fn new(name: impl Into<String>, port: u16, tls: bool, request_uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            port,
            tls,
            forwarded_proto: None,
            forwarded_port: None,
            request_uri: request_uri.into(),
        }
    }

    /// Returns true if the browser talked TLS, directly or via a proxy.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.tls
            || self
                .forwarded_proto
                .as_deref()
                .is_some_and(|p| p.eq_ignore_ascii_case("https"))
    }

    /// Returns the port the browser used.
    #[must_use]
    pub fn effective_port(&self) -> u16 {
        self.forwarded_port.unwrap_or(self.port)
    }

    /// Returns the request path without its query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.request_uri
            .split_once('?')
            .map_or(self.request_uri.as_str(), |(path, _)| path)
    }
}

/// Inbound request data consumed by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    server: ServerInfo,
    raw_query: String,
    query: Vec<(String, String)>,
    form: Vec<(String, String)>,
    cookies: HashMap<String, String>,
}

fn decode(raw: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(raw.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

impl RequestContext {
    /// Creates a context; the query string is taken from the request URI.
    #[must_use]
    pub fn new(server: ServerInfo) -> Self {
        let raw_query = server
            .request_uri
            .split_once('?')
            .map(|(_, q)| q.to_string())
            .unwrap_or_default();
        let query = decode(&raw_query);
        Self {
            server,
            raw_query,
            query,
            form: Vec::new(),
            cookies: HashMap::new(),
        }
    }

    /// Builds a context from HTTP request parts.
    ///
    /// `tls` tells whether this process terminated TLS for the request.
    /// Host and port come from the `Host` header (falling back to the URI
    /// authority); proxy headers are recorded as reported. A `Host` without
    /// a port means the default port of the scheme the browser used.
    #[must_use]
    pub fn from_parts(parts: &Parts, tls: bool) -> Self {
        let authority = parts
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_default();
        let (name, port) = split_host_port(&authority);

        let request_uri = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_string(), |pq| pq.as_str().to_string());

        let mut server = ServerInfo::new(name, 0, tls, request_uri);
        server.forwarded_proto = header_str(&parts.headers, FORWARDED_PROTO).map(str::to_string);
        server.forwarded_port = header_str(&parts.headers, FORWARDED_PORT).and_then(|p| p.parse().ok());
        server.port = port.unwrap_or(if server.is_secure() { 443 } else { 80 });

        let mut ctx = Self::new(server);
        for cookie in CookieJar::from_headers(&parts.headers).iter() {
            ctx.cookies
                .insert(cookie.name().to_string(), cookie.value().to_string());
        }
        ctx
    }

    /// Adds decoded form fields from a URL-encoded request body.
    #[must_use]
    pub fn with_form_body(mut self, body: &str) -> Self {
        self.form = decode(body);
        self
    }

    /// Adds a form field.
    #[must_use]
    pub fn with_form_field(mut self, name: &str, value: &str) -> Self {
        self.form.push((name.to_string(), value.to_string()));
        self
    }

    /// Adds a request cookie.
    #[must_use]
    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.to_string(), value.to_string());
        self
    }

    /// Returns the server metadata.
    #[must_use]
    pub fn server(&self) -> &ServerInfo {
        &self.server
    }

    /// Returns the undecoded query string.
    #[must_use]
    pub fn raw_query(&self) -> &str {
        &self.raw_query
    }

    /// Returns the first decoded query value for `name`.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates over decoded query pairs.
    pub fn query_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.query.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the first decoded form value for `name`.
    #[must_use]
    pub fn form_field(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns a request cookie's value.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Returns the requested host action (`_action`), if any.
    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.query_param("_action")
    }
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

fn split_host_port(authority: &str) -> (String, Option<u16>) {
    match authority.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => match port.parse() {
            Ok(port) => (host.to_string(), Some(port)),
            Err(_) => (authority.to_string(), None),
        },
        _ => (authority.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(uri: &str, headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn new_splits_query_from_uri() {
        let ctx = RequestContext::new(ServerInfo::new(
            "mail.example.com",
            80,
            false,
            "/webmail/?_task=mail&_action=compose&_to=a%40b.c",
        ));
        assert_eq!(ctx.raw_query(), "_task=mail&_action=compose&_to=a%40b.c");
        assert_eq!(ctx.query_param("_to"), Some("a@b.c"));
        assert_eq!(ctx.action(), Some("compose"));
        assert_eq!(ctx.server().path(), "/webmail/");
    }

    #[test]
    fn from_parts_reads_host_cookies_and_proxy_headers() {
        let parts = parts(
            "/?_action=pgt-callback&pgtIou=PGTIOU-1",
            &[
                ("host", "mail.example.com:8080"),
                ("cookie", "a=1; mailgate_return_url=abc"),
                ("x-forwarded-proto", "https"),
                ("x-forwarded-port", "443"),
            ],
        );
        let ctx = RequestContext::from_parts(&parts, false);

        assert_eq!(ctx.server().name, "mail.example.com");
        assert_eq!(ctx.server().port, 8080);
        assert!(ctx.server().is_secure());
        assert_eq!(ctx.server().effective_port(), 443);
        assert_eq!(ctx.cookie("mailgate_return_url"), Some("abc"));
        assert_eq!(ctx.query_param("pgtIou"), Some("PGTIOU-1"));
    }

    #[test]
    fn from_parts_defaults_port_by_scheme() {
        let ctx = RequestContext::from_parts(&parts("/", &[("host", "mail.example.com")]), true);
        assert_eq!(ctx.server().port, 443);
        assert!(ctx.server().is_secure());
        assert!(ctx.raw_query().is_empty());
    }

    #[test]
    fn from_parts_defaults_port_by_forwarded_scheme() {
        let ctx = RequestContext::from_parts(
            &parts(
                "/webmail/?_task=logout",
                &[("host", "mail.example.com"), ("x-forwarded-proto", "https")],
            ),
            false,
        );
        assert_eq!(ctx.server().port, 443);
        assert_eq!(ctx.server().effective_port(), 443);
        assert!(ctx.server().is_secure());

        let params = crate::ActionParams::new().with("action", "login").with("task", "mail");
        assert_eq!(
            crate::UrlBuilder::new(&ctx).build(&params),
            "https://mail.example.com/webmail/?_task=mail&_action=login"
        );
    }

    #[test]
    fn from_parts_defaults_plain_port_without_tls() {
        let ctx = RequestContext::from_parts(&parts("/", &[("host", "mail.example.com")]), false);
        assert_eq!(ctx.server().port, 80);
        assert!(!ctx.server().is_secure());
    }

    #[test]
    fn explicit_host_port_is_kept_behind_proxy() {
        let ctx = RequestContext::from_parts(
            &parts(
                "/",
                &[("host", "mail.example.com:8443"), ("x-forwarded-proto", "https")],
            ),
            false,
        );
        assert_eq!(ctx.server().effective_port(), 8443);
    }

    #[test]
    fn ipv6_host_keeps_brackets() {
        assert_eq!(split_host_port("[::1]:8080"), ("[::1]".to_string(), Some(8080)));
        assert_eq!(split_host_port("[::1]"), ("[::1]".to_string(), None));
    }

    #[test]
    fn form_fields_are_decoded() {
        let ctx = RequestContext::new(ServerInfo::new("h", 80, false, "/"))
            .with_form_body("_url=_task%3Dmail%26_action%3Dcompose&_user=");
        assert_eq!(ctx.form_field("_url"), Some("_task=mail&_action=compose"));
        assert_eq!(ctx.form_field("_user"), Some(""));
    }
}
