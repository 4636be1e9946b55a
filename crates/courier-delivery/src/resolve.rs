//! Remote host resolution and candidate-pair expansion.

use std::fmt;
use std::future::Future;
use std::io;
use std::net::{IpAddr, SocketAddr};

use tracing::trace;

use crate::error::{Error, Result};
use crate::route::Route;

/// Forward name lookup.
///
/// Implemented by [`SystemResolver`]; tests and embedders with their own DNS
/// stack supply another implementation.
pub trait Resolve {
    /// Returns the addresses of `host`, in the order they should be tried.
    fn lookup_ip(&self, host: &str) -> impl Future<Output = io::Result<Vec<IpAddr>>> + Send;
}

/// Resolver backed by the operating system (`getaddrinfo`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl Resolve for SystemResolver {
    async fn lookup_ip(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, 0)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// A local source address paired with a remote address of the same family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CandidatePair {
    /// Address to bind before connecting.
    pub local: IpAddr,
    /// Address and port to connect to.
    pub remote: SocketAddr,
}

impl fmt::Display for CandidatePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.local, self.remote)
    }
}

/// Resolves the remote side of a route.
///
/// A literal address yields itself; a host name yields every address the
/// resolver returns, in its order.
///
/// # Errors
///
/// Returns [`Error::Resolution`] if the lookup fails.
pub async fn remote_candidates<R>(resolver: &R, route: &Route) -> Result<Vec<SocketAddr>>
where
    R: Resolve,
{
    if let Some(ip) = route.remote_ip() {
        return Ok(vec![SocketAddr::new(ip, route.remote_port)]);
    }
    let host = route.remote_host.trim();
    let ips = resolver
        .lookup_ip(host)
        .await
        .map_err(|source| Error::Resolution {
            host: host.to_string(),
            source,
        })?;
    trace!(host, answers = ips.len(), "resolved remote host");
    Ok(ips
        .into_iter()
        .map(|ip| SocketAddr::new(ip, route.remote_port))
        .collect())
}

/// Crosses local addresses with remote candidates, locals outermost.
///
/// Pairs whose address families differ are dropped.
#[must_use]
pub fn candidate_pairs(locals: &[IpAddr], remotes: &[SocketAddr]) -> Vec<CandidatePair> {
    locals
        .iter()
        .flat_map(|&local| {
            remotes
                .iter()
                .filter(move |remote| local.is_ipv4() == remote.is_ipv4())
                .map(move |&remote| CandidatePair { local, remote })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedResolver {
        answer: std::result::Result<Vec<IpAddr>, io::ErrorKind>,
        lookups: Arc<AtomicUsize>,
    }

    impl Resolve for FixedResolver {
        async fn lookup_ip(&self, _host: &str) -> io::Result<Vec<IpAddr>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.answer.clone().map_err(io::Error::from)
        }
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_family_mismatch_is_dropped() {
        let pairs = candidate_pairs(&[ip("192.0.2.1"), ip("2001:db8::1")], &[addr("198.51.100.7:25")]);
        assert_eq!(
            pairs,
            vec![CandidatePair {
                local: ip("192.0.2.1"),
                remote: addr("198.51.100.7:25"),
            }]
        );
    }

    #[test]
    fn test_pairs_are_nested_locals_first() {
        let remotes = [addr("198.51.100.7:25"), addr("[2001:db8::25]:25"), addr("198.51.100.8:25")];
        let pairs = candidate_pairs(&[ip("192.0.2.2"), ip("192.0.2.1")], &remotes);
        let rendered: Vec<String> = pairs.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            [
                "192.0.2.2 -> 198.51.100.7:25",
                "192.0.2.2 -> 198.51.100.8:25",
                "192.0.2.1 -> 198.51.100.7:25",
                "192.0.2.1 -> 198.51.100.8:25",
            ]
        );
    }

    #[tokio::test]
    async fn test_literal_host_skips_lookup() {
        let lookups = Arc::new(AtomicUsize::new(0));
        let resolver = FixedResolver {
            answer: Ok(vec![]),
            lookups: lookups.clone(),
        };
        let route = Route::new(1, "192.0.2.1", "198.51.100.7", 2525);
        let remotes = remote_candidates(&resolver, &route).await.unwrap();
        assert_eq!(remotes, vec![addr("198.51.100.7:2525")]);
        assert_eq!(lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_lookup_order_is_kept() {
        let resolver = FixedResolver {
            answer: Ok(vec![ip("2001:db8::25"), ip("198.51.100.7")]),
            lookups: Arc::default(),
        };
        let route = Route::new(1, "192.0.2.1", "mx.example.com", 25);
        let remotes = remote_candidates(&resolver, &route).await.unwrap();
        assert_eq!(remotes, vec![addr("[2001:db8::25]:25"), addr("198.51.100.7:25")]);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_resolution_error() {
        let resolver = FixedResolver {
            answer: Err(io::ErrorKind::NotFound),
            lookups: Arc::default(),
        };
        let route = Route::new(1, "192.0.2.1", "nowhere.invalid", 25);
        match remote_candidates(&resolver, &route).await.unwrap_err() {
            Error::Resolution { host, .. } => assert_eq!(host, "nowhere.invalid"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
