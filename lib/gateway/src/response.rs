//! HTTP rendering of gateway terminations.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::Cookie;

use crate::event::Termination;

impl IntoResponse for Termination {
    fn into_response(self) -> Response {
        match self {
            Self::Redirect(redirect) => {
                axum::response::Redirect::to(&redirect.location()).into_response()
            }
            Self::ErrorPage { page, .. } => Html(page.to_html()).into_response(),
            Self::Finished => StatusCode::OK.into_response(),
        }
    }
}

/// Renders `termination` with `cookies` attached as `Set-Cookie` headers.
pub fn respond(termination: Termination, cookies: Vec<Cookie<'static>>) -> Response {
    let jar = cookies.into_iter().fold(CookieJar::new(), CookieJar::add);
    (jar, termination).into_response()
}
