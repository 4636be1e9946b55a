//! EHLO extensions and SASL mechanism names.

use std::collections::HashMap;

/// Extensions advertised in an EHLO reply.
///
/// Keywords are stored upper-cased so lookups are case-insensitive. A fresh
/// value is built for every EHLO; nothing is carried over from an earlier
/// negotiation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extensions {
    entries: HashMap<String, String>,
    mechanisms: Vec<String>,
}

impl Extensions {
    /// Parses the text lines of an EHLO reply.
    ///
    /// The first line is the server's banner and carries no extension. Each
    /// following line is a keyword, optionally followed by a space and its
    /// parameter string.
    #[must_use]
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut entries = HashMap::new();
        for line in lines.iter().skip(1) {
            let line = line.as_ref();
            let (keyword, param) = line.split_once(' ').unwrap_or((line, ""));
            if keyword.is_empty() {
                continue;
            }
            entries.insert(keyword.to_ascii_uppercase(), param.to_string());
        }

        let mechanisms = entries
            .get("AUTH")
            .map(|param| param.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        Self {
            entries,
            mechanisms,
        }
    }

    /// Looks up an extension keyword, returning its parameter string.
    ///
    /// Extensions without a parameter yield an empty string.
    #[must_use]
    pub fn get(&self, keyword: &str) -> Option<&str> {
        self.entries
            .get(&keyword.to_ascii_uppercase())
            .map(String::as_str)
    }

    /// Checks if the server advertised an extension.
    #[must_use]
    pub fn supports(&self, keyword: &str) -> bool {
        self.get(keyword).is_some()
    }

    /// Checks if STARTTLS is advertised.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.supports("STARTTLS")
    }

    /// Returns the maximum message size, if advertised with a value.
    #[must_use]
    pub fn max_message_size(&self) -> Option<usize> {
        self.get("SIZE").and_then(|size| size.trim().parse().ok())
    }

    /// Returns the advertised authentication mechanism names, in server order.
    #[must_use]
    pub fn mechanisms(&self) -> &[String] {
        &self.mechanisms
    }

    /// Iterates over `(keyword, parameter)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of advertised extensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is advertised (HELO sessions, or a bare EHLO).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// SASL mechanisms this crate knows by name.
///
/// Servers may advertise others; those stay plain strings in
/// [`Extensions::mechanisms`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// RFC 4616.
    Plain,
    /// Username/password prompts, never standardized.
    Login,
    /// RFC 2195. Named only; no authenticator ships for it.
    CramMd5,
    /// Google and Microsoft bearer-token variant.
    XOAuth2,
    /// RFC 7628.
    OAuthBearer,
}

const MECHANISM_NAMES: [(AuthMechanism, &str); 5] = [
    (AuthMechanism::Plain, "PLAIN"),
    (AuthMechanism::Login, "LOGIN"),
    (AuthMechanism::CramMd5, "CRAM-MD5"),
    (AuthMechanism::XOAuth2, "XOAUTH2"),
    (AuthMechanism::OAuthBearer, "OAUTHBEARER"),
];

impl AuthMechanism {
    /// Looks a mechanism up by its advertised name, ignoring case.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        MECHANISM_NAMES
            .iter()
            .find(|(_, known)| known.eq_ignore_ascii_case(name))
            .map(|&(mechanism, _)| mechanism)
    }

    /// Name as written after `AUTH`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        MECHANISM_NAMES[self as usize].1
    }
}

impl std::fmt::Display for AuthMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_ehlo_reply() {
        let ext = Extensions::parse(&["greet", "AUTH PLAIN LOGIN", "SIZE 100"]);
        assert_eq!(ext.len(), 2);
        assert_eq!(ext.get("AUTH"), Some("PLAIN LOGIN"));
        assert_eq!(ext.get("SIZE"), Some("100"));
        assert_eq!(ext.mechanisms(), ["PLAIN", "LOGIN"]);
        assert_eq!(ext.max_message_size(), Some(100));
    }

    #[test]
    fn banner_line_is_not_an_extension() {
        let ext = Extensions::parse(&["STARTTLS"]);
        assert!(ext.is_empty());
        assert!(!ext.supports_starttls());
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let ext = Extensions::parse(&["mx.example.net", "starttls", "8bitmime"]);
        assert!(ext.supports_starttls());
        assert_eq!(ext.get("8BITMIME"), Some(""));
        assert_eq!(ext.get("StartTLS"), Some(""));
        assert_eq!(ext.get("PIPELINING"), None);
    }

    #[test]
    fn no_auth_means_no_mechanisms() {
        let ext = Extensions::parse(&["mx.example.net", "PIPELINING"]);
        assert!(ext.mechanisms().is_empty());
    }

    #[test]
    fn size_without_value() {
        let ext = Extensions::parse(&["mx.example.net", "SIZE"]);
        assert!(ext.supports("size"));
        assert_eq!(ext.max_message_size(), None);
    }

    #[test]
    fn auth_mechanism_names() {
        assert_eq!(AuthMechanism::parse("plain"), Some(AuthMechanism::Plain));
        assert_eq!(
            AuthMechanism::parse("CRAM-MD5"),
            Some(AuthMechanism::CramMd5)
        );
        assert_eq!(AuthMechanism::parse("GSSAPI"), None);
        assert_eq!(AuthMechanism::XOAuth2.to_string(), "XOAUTH2");
        for (mechanism, name) in MECHANISM_NAMES {
            assert_eq!(mechanism.as_str(), name);
        }
    }
}
