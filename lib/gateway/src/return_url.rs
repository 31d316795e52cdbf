//! The page a user asked for before being sent through the SSO login.
//!
//! The query string is parked in a short-lived cookie while the browser
//! visits the SSO server and is restored once, after login succeeds. The
//! cookie holds the query in canonical form-encoded shape, for example
//! `_task=mail&_action=compose`.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration as TimeDuration;

use crate::context::RequestContext;
use crate::params::{ActionParams, MalformedParams};

/// Cookie holding the pending return URL.
pub const RETURN_URL_COOKIE: &str = "mailgate_return_url";

/// Form field the host's login form posts the requested URL in.
const URL_FIELD: &str = "_url";

/// Query fragment marking a logout request, which is never worth returning to.
const LOGOUT_MARKER: &str = "_task=logout";

/// How long the cookie survives a round-trip through the SSO server.
const RETURN_URL_TTL: TimeDuration = TimeDuration::minutes(10);

/// Returns the page to come back to after login, if any.
///
/// A posted `_url` field wins over the current query string. Logout
/// requests and empty queries are not worth returning to.
#[must_use]
pub fn capture(ctx: &RequestContext) -> Option<Result<ActionParams, MalformedParams>> {
    let query = match ctx.form_field(URL_FIELD).filter(|v| !v.is_empty()) {
        Some(posted) => posted,
        None => ctx.raw_query(),
    };
    if query.is_empty() || query.contains(LOGOUT_MARKER) {
        None
    } else {
        Some(ActionParams::parse_query(query))
    }
}

/// Builds the cookie carrying `params`.
#[must_use]
pub fn cookie(params: &ActionParams, secure: bool) -> Cookie<'static> {
    Cookie::build((RETURN_URL_COOKIE, params.to_query()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(RETURN_URL_TTL)
        .build()
}

/// Builds the cookie that clears the pending return URL.
#[must_use]
pub fn removal(secure: bool) -> Cookie<'static> {
    Cookie::build((RETURN_URL_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::ZERO)
        .build()
}

/// Reads the pending return URL from the request.
///
/// Returns `None` when no cookie is present.
#[must_use]
pub fn read(ctx: &RequestContext) -> Option<Result<ActionParams, MalformedParams>> {
    let raw = ctx.cookie(RETURN_URL_COOKIE).filter(|v| !v.is_empty())?;
    Some(ActionParams::parse_query(raw))
}
