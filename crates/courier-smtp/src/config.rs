//! Session configuration: local identity and per-command time bounds.

use std::time::Duration;

/// Time bound for each command the session issues.
///
/// Every network exchange runs against one of these; when it elapses the
/// exchange is dropped and [`Error::Timeout`](crate::Error::Timeout) is
/// returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Reading the 220 greeting after connect.
    pub greeting: Duration,
    /// EHLO.
    pub ehlo: Duration,
    /// HELO.
    pub helo: Duration,
    /// STARTTLS command and the TLS handshake that follows.
    pub starttls: Duration,
    /// AUTH and every challenge answer.
    pub auth: Duration,
    /// The `*` line cancelling an AUTH exchange.
    pub auth_abort: Duration,
    /// MAIL FROM.
    pub mail_from: Duration,
    /// RCPT TO.
    pub rcpt_to: Duration,
    /// DATA (waiting for 354).
    pub data: Duration,
    /// Each body write and the reply to the final `.`.
    pub data_dot: Duration,
    /// RSET.
    pub rset: Duration,
    /// NOOP.
    pub noop: Duration,
    /// QUIT.
    pub quit: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            greeting: Duration::from_secs(30),
            ehlo: Duration::from_secs(10),
            helo: Duration::from_secs(30),
            starttls: Duration::from_secs(30),
            auth: Duration::from_secs(30),
            auth_abort: Duration::from_secs(10),
            mail_from: Duration::from_secs(30),
            rcpt_to: Duration::from_secs(30),
            data: Duration::from_secs(30),
            data_dot: Duration::from_secs(300),
            rset: Duration::from_secs(30),
            noop: Duration::from_secs(30),
            quit: Duration::from_secs(10),
        }
    }
}

impl Timeouts {
    /// Uses the same bound for every command. Handy for tests and probes.
    #[must_use]
    pub const fn uniform(limit: Duration) -> Self {
        Self {
            greeting: limit,
            ehlo: limit,
            helo: limit,
            starttls: limit,
            auth: limit,
            auth_abort: limit,
            mail_from: limit,
            rcpt_to: limit,
            data: limit,
            data_dot: limit,
            rset: limit,
            noop: limit,
            quit: limit,
        }
    }
}

/// Per-session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Name sent in HELO/EHLO and handed to authenticators.
    pub local_identity: String,
    /// Command time bounds.
    pub timeouts: Timeouts,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new("localhost")
    }
}

impl SessionConfig {
    /// Creates a configuration with default timeouts.
    #[must_use]
    pub fn new(local_identity: impl Into<String>) -> Self {
        Self {
            local_identity: local_identity.into(),
            timeouts: Timeouts::default(),
        }
    }

    /// Replaces the command time bounds.
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let t = Timeouts::default();
        assert_eq!(t.ehlo, Duration::from_secs(10));
        assert_eq!(t.helo, Duration::from_secs(30));
        assert_eq!(t.auth_abort, Duration::from_secs(10));
        assert_eq!(t.quit, Duration::from_secs(10));
        assert_eq!(t.mail_from, Duration::from_secs(30));
    }

    #[test]
    fn test_session_config() {
        let config = SessionConfig::new("mta1.example.com")
            .with_timeouts(Timeouts::uniform(Duration::from_secs(5)));
        assert_eq!(config.local_identity, "mta1.example.com");
        assert_eq!(config.timeouts.data_dot, Duration::from_secs(5));
        assert_eq!(SessionConfig::default().local_identity, "localhost");
    }
}
