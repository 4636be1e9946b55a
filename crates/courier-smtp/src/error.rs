//! Error types for SMTP session operations.

use std::io;
use std::time::Duration;

/// Result type alias for SMTP session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP session error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error on the transport.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS handshake or record error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// The server did not answer within the command's time bound.
    #[error("server did not reply within {0:?}")]
    Timeout(Duration),

    /// Server answered with a code other than the one the command requires.
    #[error("SMTP error {code}: {message}")]
    Protocol {
        /// Reply code (e.g., 550).
        code: u16,
        /// Reply text, continuation lines joined by `\n`.
        message: String,
    },

    /// Recipient refused with a code other than 250/251.
    ///
    /// Displays as the server's reply text and nothing else.
    #[error("{message}")]
    Rejected {
        /// Reply code (e.g., 252 or 550).
        code: u16,
        /// Reply text as sent by the server.
        message: String,
    },

    /// The authenticator refused to proceed or a challenge could not be decoded.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The server sent a line that is not an SMTP reply.
    #[error("malformed reply: {0}")]
    Malformed(String),

    /// A command argument would not fit on one command line.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The transport was closed (QUIT, failed TLS upgrade, explicit close,
    /// or a timeout that left the conversation out of step).
    #[error("not connected")]
    NotConnected,

    /// Invalid state for operation.
    #[error("invalid state for operation: {0}")]
    InvalidState(String),
}

impl Error {
    /// Creates a protocol error from a reply code and message.
    #[must_use]
    pub fn protocol(code: u16, message: impl Into<String>) -> Self {
        Self::Protocol {
            code,
            message: message.into(),
        }
    }

    /// Returns the server reply code carried by this error, if any.
    #[must_use]
    pub const fn code(&self) -> Option<u16> {
        match self {
            Self::Protocol { code, .. } | Self::Rejected { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self.code(), Some(code) if code >= 500 && code < 600)
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.code(), Some(code) if code >= 400 && code < 500)
    }

    /// Returns true if the server simply ran out of time.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rejected_displays_server_text_only() {
        let err = Error::Rejected {
            code: 252,
            message: "Cannot VRFY user, but will accept message".into(),
        };
        assert_eq!(err.to_string(), "Cannot VRFY user, but will accept message");
        assert_eq!(err.code(), Some(252));
    }

    #[test]
    fn classifies_reply_classes() {
        assert!(Error::protocol(451, "try later").is_transient());
        assert!(Error::protocol(550, "no such user").is_permanent());
        assert!(!Error::protocol(550, "no such user").is_transient());
        assert!(Error::Timeout(Duration::from_secs(10)).is_timeout());
        assert!(!Error::NotConnected.is_permanent());
    }
}
