//! Server replies.

use std::fmt;

/// One complete server reply, possibly spanning several lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Three-digit status.
    pub code: ReplyCode,
    /// Reply text, one entry per line, code and separator stripped.
    pub message: Vec<String>,
}

impl Reply {
    /// Creates a reply.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(code: ReplyCode, message: Vec<String>) -> Self {
        Self { code, message }
    }

    /// The text of every line, joined by `\n`.
    #[must_use]
    pub fn message_text(&self) -> String {
        self.message.join("\n")
    }
}

/// Renders the reply as the server's final line would read, e.g. `250 ok`.
impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message.last() {
            Some(last) if !last.is_empty() => write!(f, "{} {last}", self.code),
            _ => write!(f, "{}", self.code),
        }
    }
}

/// First digit of a reply code (RFC 5321 §4.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyClass {
    /// 2xx: the command was accepted.
    Completion,
    /// 3xx: the server waits for more input (DATA body, AUTH answer).
    Intermediate,
    /// 4xx: refused for now; trying again later may work.
    Transient,
    /// 5xx: refused for good.
    Permanent,
    /// Anything outside 2xx-5xx.
    Other,
}

/// Three-digit reply status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// 220: greeting, or go-ahead for the TLS handshake.
    pub const SERVICE_READY: Self = Self(220);
    /// 221: answer to QUIT.
    pub const CLOSING: Self = Self(221);
    /// 235: authenticated.
    pub const AUTH_SUCCESS: Self = Self(235);
    /// 250: done.
    pub const OK: Self = Self(250);
    /// 251: recipient not local, will forward.
    pub const FORWARD: Self = Self(251);
    /// 334: AUTH challenge follows.
    pub const AUTH_CONTINUE: Self = Self(334);
    /// 354: send the message body.
    pub const START_DATA: Self = Self(354);
    /// 501: syntax error in arguments; also the answer to a cancelled AUTH.
    pub const PARAMETER_ERROR: Self = Self(501);

    /// Wraps a numeric code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// The numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Which class the code belongs to.
    #[must_use]
    pub const fn class(self) -> ReplyClass {
        match self.0 / 100 {
            2 => ReplyClass::Completion,
            3 => ReplyClass::Intermediate,
            4 => ReplyClass::Transient,
            5 => ReplyClass::Permanent,
            _ => ReplyClass::Other,
        }
    }

    /// 2xx.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self.class(), ReplyClass::Completion)
    }

    /// 4xx.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self.class(), ReplyClass::Transient)
    }

    /// 5xx.
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        matches!(self.class(), ReplyClass::Permanent)
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_follow_first_digit() {
        assert_eq!(ReplyCode::OK.class(), ReplyClass::Completion);
        assert_eq!(ReplyCode::new(252).class(), ReplyClass::Completion);
        assert_eq!(ReplyCode::AUTH_CONTINUE.class(), ReplyClass::Intermediate);
        assert_eq!(ReplyCode::new(421).class(), ReplyClass::Transient);
        assert_eq!(ReplyCode::new(535).class(), ReplyClass::Permanent);
        assert_eq!(ReplyCode::new(199).class(), ReplyClass::Other);
        assert!(ReplyCode::new(451).is_transient());
        assert!(ReplyCode::PARAMETER_ERROR.is_permanent());
        assert!(!ReplyCode::START_DATA.is_success());
    }

    #[test]
    fn message_text_joins_lines_with_newline() {
        let reply = Reply::new(
            ReplyCode::OK,
            vec!["mx.example.net".into(), "PIPELINING".into(), "SIZE 100".into()],
        );
        assert_eq!(reply.message_text(), "mx.example.net\nPIPELINING\nSIZE 100");
        assert_eq!(Reply::new(ReplyCode::OK, vec![]).message_text(), "");
    }

    #[test]
    fn display_uses_last_line() {
        let reply = Reply::new(ReplyCode::OK, vec!["greet".into(), "SIZE 100".into()]);
        assert_eq!(reply.to_string(), "250 SIZE 100");
        assert_eq!(Reply::new(ReplyCode::AUTH_CONTINUE, vec![String::new()]).to_string(), "334");
        assert_eq!(ReplyCode::AUTH_SUCCESS.to_string(), "235");
    }
}
