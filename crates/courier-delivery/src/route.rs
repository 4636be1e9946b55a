//! Route records and local source-address policies.
//!
//! A route names the local addresses to send from and the remote host to
//! deliver to. The local-IP specification is a single address, a failover
//! list joined with `&` (tried in order) or a round-robin list joined with
//! `|` (tried in a fresh random order on every connection attempt).

use std::net::IpAddr;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Separator of a failover list.
pub const FAILOVER_SEPARATOR: char = '&';

/// Separator of a round-robin list.
pub const ROUND_ROBIN_SEPARATOR: char = '|';

/// Default SMTP port.
pub const DEFAULT_PORT: u16 = 25;

/// One way of reaching a destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Route {
    /// Identifier, used in errors and logs.
    pub id: u64,
    /// Local-IP specification, e.g. `192.0.2.1&192.0.2.2`.
    pub local_ip: String,
    /// Literal IP address or host name of the remote server.
    pub remote_host: String,
    /// Remote port.
    #[serde(default = "default_port")]
    pub remote_port: u16,
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Route {
    /// Creates a route.
    #[must_use]
    pub fn new(
        id: u64,
        local_ip: impl Into<String>,
        remote_host: impl Into<String>,
        remote_port: u16,
    ) -> Self {
        Self {
            id,
            local_ip: local_ip.into(),
            remote_host: remote_host.into(),
            remote_port,
        }
    }

    /// Parses the local-IP specification.
    ///
    /// # Errors
    ///
    /// See [`LocalIpPolicy::parse`].
    pub fn local_ip_policy(&self) -> Result<LocalIpPolicy> {
        LocalIpPolicy::parse(self.id, &self.local_ip)
    }

    /// The remote host as an IP address, if it is a literal.
    ///
    /// IPv6 literals may be written with or without brackets.
    #[must_use]
    pub fn remote_ip(&self) -> Option<IpAddr> {
        let host = self.remote_host.trim();
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        host.parse().ok()
    }
}

/// Order in which a route's local addresses are tried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalIpPolicy {
    /// One address.
    Single(IpAddr),
    /// Addresses in priority order, first is preferred.
    Failover(Vec<IpAddr>),
    /// Addresses tried in a random order that changes on every attempt.
    RoundRobin(Vec<IpAddr>),
}

impl LocalIpPolicy {
    /// Parses a local-IP specification belonging to route `route`.
    ///
    /// Whitespace around each entry is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if both separators appear, and
    /// [`Error::Address`] for any entry that is not an IP address
    /// (including an empty one).
    pub fn parse(route: u64, spec: &str) -> Result<Self> {
        let failover = spec.contains(FAILOVER_SEPARATOR);
        let round_robin = spec.contains(ROUND_ROBIN_SEPARATOR);
        match (failover, round_robin) {
            (true, true) => Err(Error::Configuration { route }),
            (true, false) => Ok(Self::Failover(parse_list(spec, FAILOVER_SEPARATOR)?)),
            (false, true) => Ok(Self::RoundRobin(parse_list(spec, ROUND_ROBIN_SEPARATOR)?)),
            (false, false) => Ok(Self::Single(parse_ip(spec, spec)?)),
        }
    }

    /// Addresses as configured, before any shuffling.
    #[must_use]
    pub fn addresses(&self) -> &[IpAddr] {
        match self {
            Self::Single(ip) => std::slice::from_ref(ip),
            Self::Failover(ips) | Self::RoundRobin(ips) => ips,
        }
    }

    /// Addresses in the order to try them for one connection attempt.
    pub fn ordered<R>(&self, rng: &mut R) -> Vec<IpAddr>
    where
        R: Rng + ?Sized,
    {
        let mut ips = self.addresses().to_vec();
        if let Self::RoundRobin(_) = self {
            ips.shuffle(rng);
        }
        ips
    }
}

fn parse_list(spec: &str, separator: char) -> Result<Vec<IpAddr>> {
    spec.split(separator)
        .map(|value| parse_ip(value, spec))
        .collect()
}

fn parse_ip(value: &str, spec: &str) -> Result<IpAddr> {
    value.trim().parse().map_err(|_| Error::Address {
        value: value.to_string(),
        spec: spec.to_string(),
    })
}
