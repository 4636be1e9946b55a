//! Ready-made authenticators: PLAIN, LOGIN, XOAUTH2 and OAUTHBEARER.

use tracing::debug;

use super::{AuthContext, AuthStart, Authenticator};
use crate::error::{Error, Result};
use crate::types::AuthMechanism;

/// PLAIN: `\0<username>\0<password>` as the initial response.
///
/// Refuses to run over plaintext unless [`Plain::allow_insecure`] was called.
#[derive(Clone)]
pub struct Plain {
    username: String,
    password: String,
    allow_insecure: bool,
}

impl Plain {
    /// Creates a PLAIN authenticator.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            allow_insecure: false,
        }
    }

    /// Permits sending credentials on a session without TLS.
    #[must_use]
    pub const fn allow_insecure(mut self) -> Self {
        self.allow_insecure = true;
        self
    }
}

impl Authenticator for Plain {
    fn start(&mut self, context: &AuthContext<'_>) -> Result<AuthStart> {
        if !context.tls && !self.allow_insecure {
            return Err(Error::Auth("PLAIN refused on an unencrypted session".into()));
        }
        // The first NUL is for the authorization identity (empty = same as auth identity)
        let response = format!("\0{}\0{}", self.username, self.password);
        Ok(AuthStart::with_response(
            AuthMechanism::Plain.as_str(),
            response,
        ))
    }

    fn next(&mut self, _from_server: &[u8], more: bool) -> Result<Option<Vec<u8>>> {
        if more {
            return Err(Error::Auth("unexpected server challenge for PLAIN".into()));
        }
        Ok(None)
    }
}

impl std::fmt::Debug for Plain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plain")
            .field("username", &self.username)
            .field("allow_insecure", &self.allow_insecure)
            .finish_non_exhaustive()
    }
}

/// LOGIN: answers the server's `Username:` and `Password:` prompts.
#[derive(Clone)]
pub struct Login {
    username: String,
    password: String,
}

impl Login {
    /// Creates a LOGIN authenticator.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Authenticator for Login {
    fn start(&mut self, _context: &AuthContext<'_>) -> Result<AuthStart> {
        Ok(AuthStart::new(AuthMechanism::Login.as_str()))
    }

    fn next(&mut self, from_server: &[u8], more: bool) -> Result<Option<Vec<u8>>> {
        if !more {
            return Ok(None);
        }
        let prompt = String::from_utf8_lossy(from_server);
        match prompt.trim().to_ascii_lowercase().as_str() {
            "username:" | "user name" | "username" => Ok(Some(self.username.clone().into_bytes())),
            "password:" | "password" => Ok(Some(self.password.clone().into_bytes())),
            other => Err(Error::Auth(format!("unexpected LOGIN prompt: {other}"))),
        }
    }
}

impl std::fmt::Debug for Login {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Login")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// XOAUTH2: `user=<user>\x01auth=Bearer <token>\x01\x01` as the initial response.
#[derive(Clone)]
pub struct XOAuth2 {
    user: String,
    token: String,
}

impl XOAuth2 {
    /// Creates an XOAUTH2 authenticator.
    #[must_use]
    pub fn new(user: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            token: token.into(),
        }
    }
}

impl Authenticator for XOAuth2 {
    fn start(&mut self, _context: &AuthContext<'_>) -> Result<AuthStart> {
        let response = format!("user={}\x01auth=Bearer {}\x01\x01", self.user, self.token);
        Ok(AuthStart::with_response(
            AuthMechanism::XOAuth2.as_str(),
            response,
        ))
    }

    fn next(&mut self, from_server: &[u8], more: bool) -> Result<Option<Vec<u8>>> {
        if !more {
            return Ok(None);
        }
        // A challenge here is the server's JSON error; an empty answer lets
        // it finish with its failure code.
        log_oauth_error(from_server);
        Ok(Some(Vec::new()))
    }
}

impl std::fmt::Debug for XOAuth2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XOAuth2")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// OAUTHBEARER: `n,a=<user>,\x01auth=Bearer <token>\x01\x01` as the initial response.
#[derive(Clone)]
pub struct OAuthBearer {
    user: String,
    token: String,
}

impl OAuthBearer {
    /// Creates an OAUTHBEARER authenticator.
    #[must_use]
    pub fn new(user: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            token: token.into(),
        }
    }
}

impl Authenticator for OAuthBearer {
    fn start(&mut self, _context: &AuthContext<'_>) -> Result<AuthStart> {
        let response = format!("n,a={},\x01auth=Bearer {}\x01\x01", self.user, self.token);
        Ok(AuthStart::with_response(
            AuthMechanism::OAuthBearer.as_str(),
            response,
        ))
    }

    fn next(&mut self, from_server: &[u8], more: bool) -> Result<Option<Vec<u8>>> {
        if !more {
            return Ok(None);
        }
        // RFC 7628 §3.2.3: acknowledge the error with a lone ^A.
        log_oauth_error(from_server);
        Ok(Some(vec![0x01]))
    }
}

impl std::fmt::Debug for OAuthBearer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthBearer")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// JSON body of the 334 challenge a server sends when it rejects a bearer
/// token, e.g. `{"status":"401","schemes":"bearer","scope":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct OAuthError {
    /// HTTP-style status, e.g. `401`.
    pub status: String,
    /// Schemes the server accepts.
    #[serde(default)]
    pub schemes: Option<String>,
    /// Scope the token needs.
    #[serde(default)]
    pub scope: Option<String>,
}

impl OAuthError {
    /// Parses the decoded challenge of a failed `OAuth2` exchange.
    ///
    /// # Errors
    ///
    /// Returns an error if the challenge is not the expected JSON.
    pub fn parse(challenge: &[u8]) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_slice(challenge)
    }
}

fn log_oauth_error(challenge: &[u8]) {
    match OAuthError::parse(challenge) {
        Ok(err) => debug!(status = %err.status, scope = ?err.scope, "OAuth2 token rejected"),
        Err(_) => debug!("OAuth2 challenge is not a JSON error"),
    }
}
