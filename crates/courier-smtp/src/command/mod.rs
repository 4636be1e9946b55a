//! Client commands and their wire form.

use std::fmt;

use crate::error::{Error, Result};

/// A command line the client can send.
///
/// `Debug` prints the line as sent, with SASL payloads replaced by
/// `<redacted>`; it is what the session logs.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// `HELO <hostname>`
    Helo {
        /// Local identity.
        hostname: String,
    },
    /// `EHLO <hostname>`
    Ehlo {
        /// Local identity.
        hostname: String,
    },
    /// `STARTTLS`
    StartTls,
    /// `AUTH <mechanism> [<initial-response>]`
    Auth {
        /// Mechanism name as sent on the wire.
        mechanism: String,
        /// Base64 initial response; `Some("")` goes out as `=`.
        initial_response: Option<String>,
    },
    /// Base64 answer to a 334 challenge, sent as a bare line.
    AuthResponse(String),
    /// `*`, cancelling an AUTH exchange.
    AuthAbort,
    /// `MAIL FROM:<from>`
    MailFrom {
        /// Reverse path without angle brackets; empty for the null path.
        from: String,
    },
    /// `RCPT TO:<to>`
    RcptTo {
        /// Forward path without angle brackets.
        to: String,
    },
    /// `DATA`
    Data,
    /// `RSET`
    Rset,
    /// `NOOP`
    Noop,
    /// `QUIT`
    Quit,
}

impl Command {
    /// Checks that every argument fits on a single command line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for hostnames or mechanisms that
    /// are empty or contain whitespace or control characters, paths that
    /// contain angle brackets or control characters (only MAIL may have an
    /// empty path), and SASL payloads that contain CR or LF.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Helo { hostname } | Self::Ehlo { hostname } => check_word("hostname", hostname),
            Self::Auth {
                mechanism,
                initial_response,
            } => {
                check_word("mechanism", mechanism)?;
                initial_response
                    .as_deref()
                    .map_or(Ok(()), check_payload)
            }
            Self::AuthResponse(response) => check_payload(response),
            Self::MailFrom { from } => check_path("reverse path", from),
            Self::RcptTo { to } if to.is_empty() => {
                Err(Error::InvalidArgument("empty forward path".into()))
            }
            Self::RcptTo { to } => check_path("forward path", to),
            Self::StartTls
            | Self::AuthAbort
            | Self::Data
            | Self::Rset
            | Self::Noop
            | Self::Quit => Ok(()),
        }
    }

    /// The command line as sent, CRLF included.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut line = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_line(&mut line, false);
        line.push_str("\r\n");
        line.into_bytes()
    }

    fn write_line(&self, out: &mut impl fmt::Write, redact: bool) -> fmt::Result {
        match self {
            Self::Helo { hostname } => write!(out, "HELO {hostname}"),
            Self::Ehlo { hostname } => write!(out, "EHLO {hostname}"),
            Self::StartTls => out.write_str("STARTTLS"),
            Self::Auth {
                mechanism,
                initial_response,
            } => {
                write!(out, "AUTH {mechanism}")?;
                match initial_response.as_deref() {
                    None => Ok(()),
                    Some(_) if redact => out.write_str(" <redacted>"),
                    Some("") => out.write_str(" ="),
                    Some(response) => write!(out, " {response}"),
                }
            }
            Self::AuthResponse(_) if redact => out.write_str("<redacted>"),
            Self::AuthResponse(response) => out.write_str(response),
            Self::AuthAbort => out.write_char('*'),
            Self::MailFrom { from } => write!(out, "MAIL FROM:<{from}>"),
            Self::RcptTo { to } => write!(out, "RCPT TO:<{to}>"),
            Self::Data => out.write_str("DATA"),
            Self::Rset => out.write_str("RSET"),
            Self::Noop => out.write_str("NOOP"),
            Self::Quit => out.write_str("QUIT"),
        }
    }
}

fn check_word(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidArgument(format!("empty {what}")));
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::InvalidArgument(format!(
            "{what} contains whitespace or control characters: {value:?}"
        )));
    }
    Ok(())
}

fn check_path(what: &str, value: &str) -> Result<()> {
    if value.chars().any(|c| matches!(c, '<' | '>') || c.is_control()) {
        return Err(Error::InvalidArgument(format!(
            "{what} contains angle brackets or control characters: {value:?}"
        )));
    }
    Ok(())
}

fn check_payload(value: &str) -> Result<()> {
    if value.contains(['\r', '\n']) {
        return Err(Error::InvalidArgument("SASL payload contains a line break".into()));
    }
    Ok(())
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_line(f, true)
    }
}
