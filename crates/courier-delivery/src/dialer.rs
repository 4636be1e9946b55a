//! Connection establishment with sequential fallback.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use courier_smtp::Session;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::net::{TcpSocket, TcpStream};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::resolve::{CandidatePair, Resolve, SystemResolver, candidate_pairs, remote_candidates};
use crate::route::{LocalIpPolicy, Route};

/// A greeted session and where it leads.
#[derive(Debug)]
pub struct Connected {
    /// Session that has read a 220 greeting and nothing else.
    pub session: Session<TcpStream>,
    /// Route the session was opened on.
    pub route: Route,
    /// Local and remote address that answered.
    pub candidate: CandidatePair,
}

/// Opens SMTP sessions over a list of routes.
///
/// Routes are tried in order, and within a route every candidate pair in
/// order; the first candidate that connects and greets with 220 wins.
/// Candidates are never raced against each other.
#[derive(Debug)]
pub struct Dialer<R = SystemResolver, G = StdRng> {
    config: Config,
    resolver: R,
    rng: G,
}

impl Dialer {
    /// Creates a dialer using the system resolver and an entropy-seeded RNG.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            resolver: SystemResolver,
            rng: StdRng::from_entropy(),
        }
    }
}

impl<R, G> Dialer<R, G> {
    /// Replaces the resolver used for host names.
    #[must_use]
    pub fn with_resolver<R2>(self, resolver: R2) -> Dialer<R2, G> {
        Dialer {
            config: self.config,
            resolver,
            rng: self.rng,
        }
    }

    /// Replaces the randomness source used to shuffle round-robin addresses.
    #[must_use]
    pub fn with_rng<G2>(self, rng: G2) -> Dialer<R, G2> {
        Dialer {
            config: self.config,
            resolver: self.resolver,
            rng,
        }
    }

    /// Dialer settings.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }
}

impl<R, G> Dialer<R, G>
where
    R: Resolve,
    G: Rng,
{
    /// Expands a route into the candidate pairs the next attempt would try.
    ///
    /// Round-robin routes are reshuffled on every call.
    ///
    /// # Errors
    ///
    /// Returns a configuration or address error for a bad local-IP
    /// specification, and [`Error::Resolution`] if the host lookup fails.
    pub async fn resolve(&mut self, route: &Route) -> Result<Vec<CandidatePair>> {
        let policy = route.local_ip_policy()?;
        self.expand(route, &policy).await
    }

    /// Opens a session on the first candidate that connects and greets.
    ///
    /// Every route's local-IP specification is checked before any lookup or
    /// connect. Failed candidates (bind, connect, timeout, greeting) are
    /// logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns a configuration or address error before any I/O, a
    /// resolution error as soon as a host lookup fails, or
    /// [`Error::Exhausted`] once every candidate has failed.
    pub async fn connect(&mut self, routes: &[Route]) -> Result<Connected> {
        let policies = routes
            .iter()
            .map(Route::local_ip_policy)
            .collect::<Result<Vec<_>>>()?;

        let mut attempts = 0;
        for (route, policy) in routes.iter().zip(&policies) {
            for candidate in self.expand(route, policy).await? {
                attempts += 1;
                match self.attempt(candidate).await {
                    Ok(session) => {
                        info!(route = route.id, %candidate, "connected");
                        return Ok(Connected {
                            session,
                            route: route.clone(),
                            candidate,
                        });
                    }
                    Err(err) => {
                        debug!(route = route.id, %candidate, error = %err, "unable to get an SMTP client");
                    }
                }
            }
        }

        Err(Error::Exhausted {
            routes: routes.len(),
            attempts,
        })
    }

    async fn expand(&mut self, route: &Route, policy: &LocalIpPolicy) -> Result<Vec<CandidatePair>> {
        let locals = policy.ordered(&mut self.rng);
        let remotes = remote_candidates(&self.resolver, route).await?;
        Ok(candidate_pairs(&locals, &remotes))
    }

    async fn attempt(&self, candidate: CandidatePair) -> Result<Session<TcpStream>> {
        let stream = race(self.config.connect_timeout, open(candidate)).await?;
        Ok(Session::from_stream(stream, self.config.session_config()).await?)
    }
}

/// Runs `attempt` against a timer of `limit`.
///
/// When the timer wins the attempt is dropped, which closes any socket it
/// was holding.
pub(crate) async fn race<F, T>(limit: Duration, attempt: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    timeout(limit, attempt)
        .await
        .unwrap_or(Err(Error::Timeout(limit)))
}

/// Binds the local address (port 0) and connects to the remote one.
async fn open(candidate: CandidatePair) -> Result<TcpStream> {
    let socket = match candidate.remote {
        SocketAddr::V4(_) => TcpSocket::new_v4(),
        SocketAddr::V6(_) => TcpSocket::new_v6(),
    }
    .map_err(Error::Connect)?;

    // Commands are small and strictly request/response.
    socket.set_nodelay(true).map_err(Error::Connect)?;

    let local = SocketAddr::new(candidate.local, 0);
    if let Err(source) = socket.bind(local) {
        warn!(%local, remote = %candidate.remote, error = %source, "bind failed");
        return Err(Error::Bind { local, source });
    }

    socket.connect(candidate.remote).await.map_err(Error::Connect)
}
