//! Pluggable SASL authenticators for the AUTH exchange.
//!
//! The session drives the exchange and handles the base64 framing; an
//! [`Authenticator`] only sees and produces raw bytes.

mod mechanisms;

pub use mechanisms::{Login, OAuthBearer, OAuthError, Plain, XOAuth2};

use crate::error::Result;

/// What the server and session look like when authentication starts.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext<'a> {
    /// Identity this side announced in HELO/EHLO.
    pub local_identity: &'a str,
    /// Whether STARTTLS completed on this session.
    pub tls: bool,
    /// Mechanisms the server advertised in its last EHLO.
    pub mechanisms: &'a [String],
}

impl AuthContext<'_> {
    /// Checks whether the server advertised `mechanism` (case-insensitive).
    #[must_use]
    pub fn advertises(&self, mechanism: &str) -> bool {
        self.mechanisms
            .iter()
            .any(|m| m.eq_ignore_ascii_case(mechanism))
    }
}

/// First step of an exchange: which mechanism, and the optional initial response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthStart {
    /// Mechanism name sent after `AUTH`.
    pub mechanism: String,
    /// Initial response (unencoded), sent on the AUTH line when present.
    pub initial_response: Option<Vec<u8>>,
}

impl AuthStart {
    /// Starts without an initial response.
    #[must_use]
    pub fn new(mechanism: impl Into<String>) -> Self {
        Self {
            mechanism: mechanism.into(),
            initial_response: None,
        }
    }

    /// Starts with an initial response.
    #[must_use]
    pub fn with_response(mechanism: impl Into<String>, response: impl Into<Vec<u8>>) -> Self {
        Self {
            mechanism: mechanism.into(),
            initial_response: Some(response.into()),
        }
    }
}

/// Client side of one SASL mechanism.
pub trait Authenticator {
    /// Begins an exchange.
    ///
    /// # Errors
    ///
    /// Returns an error to refuse, e.g. a plaintext mechanism without TLS.
    /// The session then sends QUIT and propagates the error.
    fn start(&mut self, context: &AuthContext<'_>) -> Result<AuthStart>;

    /// Handles a server message.
    ///
    /// `more` is true for a decoded 334 challenge, false for the text of
    /// the final 235. Returning `None` ends the exchange.
    ///
    /// # Errors
    ///
    /// Returns an error to abort the exchange.
    fn next(&mut self, from_server: &[u8], more: bool) -> Result<Option<Vec<u8>>>;
}

impl<A: Authenticator + ?Sized> Authenticator for Box<A> {
    fn start(&mut self, context: &AuthContext<'_>) -> Result<AuthStart> {
        (**self).start(context)
    }

    fn next(&mut self, from_server: &[u8], more: bool) -> Result<Option<Vec<u8>>> {
        (**self).next(from_server, more)
    }
}
