//! Host action parameters.
//!
//! The host addresses its pages through query parameters whose names carry a
//! `_` namespace marker (`_task`, `_action`, ...). `ActionParams` keeps names
//! exactly as given, in declaration order. The marker is added to bare names
//! only when a host action URL is rendered.

use std::fmt;
use url::form_urlencoded;

/// Namespace marker prefixed to every host parameter name.
pub const PARAM_PREFIX: char = '_';

/// A query string that could not be turned into action parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedParams {
    /// Why the value was rejected.
    pub reason: String,
}

impl fmt::Display for MalformedParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed action parameters: {}", self.reason)
    }
}

impl std::error::Error for MalformedParams {}

fn bare(name: &str) -> &str {
    name.strip_prefix(PARAM_PREFIX).unwrap_or(name)
}

fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
}

/// Ordered host parameters such as `{task: mail, action: compose}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionParams {
    pairs: Vec<(String, String)>,
}

impl ActionParams {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, returning the updated set.
    #[must_use]
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets a parameter, keeping its original position if already present.
    pub fn insert(&mut self, name: &str, value: &str) {
        match self.pairs.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.pairs.push((name.to_string(), value.to_string())),
        }
    }

    /// Returns a parameter's value.
    ///
    /// An exact name match wins; otherwise the marker is ignored on both
    /// sides, so `get("task")` finds `_task`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .or_else(|| self.pairs.iter().find(|(n, _)| bare(n) == bare(name)))
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Iterates over `(name, value)` in declaration order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Parses a raw query string such as `_task=mail&_action=compose`.
    ///
    /// # Errors
    ///
    /// Returns an error if the string yields no parameters or a name is not
    /// a plain identifier.
    pub fn parse_query(raw: &str) -> Result<Self, MalformedParams> {
        let mut params = Self::new();
        for (name, value) in form_urlencoded::parse(raw.trim_start_matches('?').as_bytes()) {
            if !valid_name(&name) || bare(&name).is_empty() {
                return Err(MalformedParams {
                    reason: format!("invalid parameter name {name:?}"),
                });
            }
            params.insert(&name, &value);
        }
        if params.is_empty() {
            return Err(MalformedParams {
                reason: "no parameters".to_string(),
            });
        }
        Ok(params)
    }

    /// Renders the parameters as a form-encoded query string, names and
    /// values unchanged, in declaration order.
    #[must_use]
    pub fn to_query(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }

    /// Renders the parameters as a host action query in declaration order.
    ///
    /// Bare names gain the marker and empty values are skipped.
    #[must_use]
    pub fn to_action_query(&self) -> String {
        encode_action_pairs(self.iter())
    }
}

/// Form-encodes host action pairs, adding the marker to names that lack it
/// and skipping empty values.
pub(crate) fn encode_action_pairs<'a>(
    pairs: impl Iterator<Item = (&'a str, &'a str)>,
) -> String {
    let mut out = form_urlencoded::Serializer::new(String::new());
    for (name, value) in pairs.filter(|(_, v)| !v.is_empty()) {
        if name.starts_with(PARAM_PREFIX) {
            out.append_pair(name, value);
        } else {
            out.append_pair(&format!("{PARAM_PREFIX}{name}"), value);
        }
    }
    out.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_kept_as_given() {
        let params = ActionParams::new().with("_task", "mail").with("action", "compose");
        assert_eq!(params.get("task"), Some("mail"));
        assert_eq!(params.get("_action"), Some("compose"));
        assert_eq!(
            params.iter().collect::<Vec<_>>(),
            vec![("_task", "mail"), ("action", "compose")]
        );
    }

    #[test]
    fn exact_name_wins_lookup() {
        let params = ActionParams::new().with("_id", "marked").with("id", "bare");
        assert_eq!(params.get("id"), Some("bare"));
        assert_eq!(params.get("_id"), Some("marked"));
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut params = ActionParams::new().with("_task", "mail").with("_action", "show");
        params.insert("_task", "settings");
        assert_eq!(
            params.iter().collect::<Vec<_>>(),
            vec![("_task", "settings"), ("_action", "show")]
        );
    }

    #[test]
    fn parse_query_restores_params() {
        let params = ActionParams::parse_query("_task=mail&_action=compose").expect("valid");
        assert_eq!(
            params,
            ActionParams::new().with("_task", "mail").with("_action", "compose")
        );
    }

    #[test]
    fn unmarked_names_survive_restore() {
        let params = ActionParams::parse_query("_task=mail&foo=bar&_uid=").expect("valid");
        assert_eq!(params.get("foo"), Some("bar"));
        assert_eq!(params.to_query(), "_task=mail&foo=bar&_uid=");
    }

    #[test]
    fn parse_query_decodes_values() {
        let params = ActionParams::parse_query("_task=mail&_mbox=INBOX%2FSent&_search=a+b")
            .expect("valid");
        assert_eq!(params.get("mbox"), Some("INBOX/Sent"));
        assert_eq!(params.get("search"), Some("a b"));
        assert_eq!(params.to_query(), "_task=mail&_mbox=INBOX%2FSent&_search=a+b");
    }

    #[test]
    fn parse_query_rejects_garbage() {
        assert!(ActionParams::parse_query("").is_err());
        assert!(ActionParams::parse_query("<script>=1").is_err());
        assert!(ActionParams::parse_query("_=x").is_err());
    }

    #[test]
    fn action_query_prefixes_and_skips_empty() {
        let params = ActionParams::new()
            .with("task", "mail")
            .with("uid", "")
            .with("_action", "show");
        assert_eq!(params.to_action_query(), "_task=mail&_action=show");
    }

    #[test]
    fn action_query_encodes_values() {
        let params = ActionParams::new().with("search", "a&b c");
        assert_eq!(params.to_action_query(), "_search=a%26b+c");
    }
}
