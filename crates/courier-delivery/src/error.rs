//! Error types for connection establishment.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

/// Result type alias for delivery operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Delivery error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The route's local-IP specification mixes failover and round-robin.
    #[error("failover and round-robin are mixed in the local IP of route {route}")]
    Configuration {
        /// Identifier of the offending route.
        route: u64,
    },

    /// An entry of a local-IP specification is not an IP address.
    #[error("invalid IP {value:?} in local IP specification {spec:?}")]
    Address {
        /// The entry that failed to parse.
        value: String,
        /// The whole specification it came from.
        spec: String,
    },

    /// The remote host could not be resolved.
    #[error("cannot resolve {host}: {source}")]
    Resolution {
        /// Host name that was looked up.
        host: String,
        /// Resolver error.
        #[source]
        source: io::Error,
    },

    /// The local address could not be bound.
    #[error("cannot bind {local}: {source}")]
    Bind {
        /// Address the socket was bound to (port 0).
        local: SocketAddr,
        /// Socket error.
        #[source]
        source: io::Error,
    },

    /// A connect attempt did not finish in time.
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),

    /// A connect attempt failed.
    #[error("connect failed: {0}")]
    Connect(#[source] io::Error),

    /// The SMTP session could not be opened (greeting refused, read error).
    #[error(transparent)]
    Smtp(#[from] courier_smtp::Error),

    /// Every candidate of every route failed.
    #[error("unable to get a client, all routes have been tested ({routes} routes, {attempts} attempts)")]
    Exhausted {
        /// Number of routes tried.
        routes: usize,
        /// Number of connect attempts made.
        attempts: usize,
    },
}

impl Error {
    /// Returns true if a later attempt could succeed without a configuration change.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Connect(_) | Self::Exhausted { .. } => true,
            Self::Smtp(err) => {
                err.is_transient()
                    || matches!(
                        err,
                        courier_smtp::Error::Io(_) | courier_smtp::Error::Timeout(_)
                    )
            }
            Self::Configuration { .. }
            | Self::Address { .. }
            | Self::Resolution { .. }
            | Self::Bind { .. } => false,
        }
    }
}
