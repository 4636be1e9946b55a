//! Dialer configuration.

use std::time::Duration;

use courier_smtp::{SessionConfig, Timeouts};

/// Default bound on a single connect attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings shared by every connection a [`Dialer`](crate::Dialer) opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Name announced in HELO/EHLO.
    pub local_identity: String,
    /// Bound on each connect attempt.
    pub connect_timeout: Duration,
    /// Command bounds for the sessions that get opened.
    pub timeouts: Timeouts,
}

impl Config {
    /// Creates a configuration with default timeouts.
    #[must_use]
    pub fn new(local_identity: impl Into<String>) -> Self {
        Self {
            local_identity: local_identity.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            timeouts: Timeouts::default(),
        }
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(local_identity: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(local_identity)
    }

    /// Session settings for a freshly opened connection.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.local_identity.clone()).with_timeouts(self.timeouts)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("localhost")
    }
}

/// Builder for [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    local_identity: String,
    connect_timeout: Duration,
    timeouts: Timeouts,
}

impl ConfigBuilder {
    /// Creates a new builder with the given local identity.
    #[must_use]
    pub fn new(local_identity: impl Into<String>) -> Self {
        Self {
            local_identity: local_identity.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            timeouts: Timeouts::default(),
        }
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets how long to wait for the 220 greeting.
    #[must_use]
    pub const fn greeting_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.greeting = timeout;
        self
    }

    /// Replaces all command timeouts.
    #[must_use]
    pub const fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            local_identity: self.local_identity,
            connect_timeout: self.connect_timeout,
            timeouts: self.timeouts,
        }
    }
}
