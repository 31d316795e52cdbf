//! Error page shown when the backend rejects a login the SSO server accepted.

use crate::event::SSO_LOGOUT_ACTION;

/// A minimal error view whose only control is an SSO logout button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPage {
    title: String,
    text: String,
}

impl ErrorPage {
    /// Creates a page with the given title and explanation.
    #[must_use]
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }

    /// The page shown after a backend (IMAP) login failure.
    ///
    /// The SSO login itself succeeded, so the text points at the mail
    /// service rather than at the user's credentials.
    #[must_use]
    pub fn login_failed() -> Self {
        Self::new(
            "IMAP login failed",
            "Could not log into your IMAP service. The service may be interrupted, \
             or you may not be authorized to access the service. \
             Please contact the administrator of your IMAP service.",
        )
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Renders the page as a standalone HTML document.
    #[must_use]
    pub fn to_html(&self) -> String {
        let title = escape(&self.title);
        format!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n\
             <h3 class=\"error-title\">{title}</h3>\n\
             <p class=\"error-text\">{text}</p>\n\
             <form action=\"./\" method=\"get\">\n\
             <input type=\"hidden\" name=\"_action\" value=\"{SSO_LOGOUT_ACTION}\" />\n\
             <p><input type=\"submit\" value=\"Logout\" /></p>\n\
             </form>\n</body>\n</html>\n",
            text = escape(&self.text),
        )
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
