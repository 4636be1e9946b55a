//! Establisher tests against loopback servers.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use courier_delivery::{Config, Dialer, Error, Resolve, Route};

/// Answers every lookup with the same addresses and counts the calls.
#[derive(Clone, Default)]
struct CountingResolver {
    answer: Vec<IpAddr>,
    lookups: Arc<AtomicUsize>,
}

impl Resolve for CountingResolver {
    async fn lookup_ip(&self, _host: &str) -> io::Result<Vec<IpAddr>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer.clone())
    }
}

fn dialer(config: Config) -> Dialer<CountingResolver, StdRng> {
    Dialer::new(config)
        .with_resolver(CountingResolver::default())
        .with_rng(StdRng::seed_from_u64(1))
}

/// Accepts one connection and greets it with `greeting`, then waits for the
/// client to hang up.
async fn server(greeting: &'static [u8]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.write_all(greeting).await.unwrap();
        let mut rest = Vec::new();
        let _ = socket.read_to_end(&mut rest).await;
    });
    addr
}

/// A port nothing listens on.
async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

fn route(id: u64, addr: SocketAddr) -> Route {
    Route::new(id, "127.0.0.1", addr.ip().to_string(), addr.port())
}

#[tokio::test]
async fn first_greeting_server_wins() {
    let addr = server(b"220 mx.example.com ESMTP\r\n").await;
    let mut dialer = dialer(Config::new("mta1.example.com"));

    let connected = dialer.connect(&[route(1, addr)]).await.unwrap();
    assert_eq!(connected.route.id, 1);
    assert_eq!(connected.candidate.remote, addr);
    assert_eq!(connected.session.greeting().message_text(), "mx.example.com ESMTP");
    assert_eq!(connected.session.peer_addr().unwrap(), addr);
    assert_eq!(
        connected.session.local_addr().unwrap().ip(),
        "127.0.0.1".parse::<IpAddr>().unwrap()
    );
}

#[tokio::test]
async fn refused_greeting_falls_back_to_next_route() {
    let refusing = server(b"554 5.3.2 not accepting mail\r\n").await;
    let accepting = server(b"220 backup.example.com ESMTP\r\n").await;
    let mut dialer = dialer(Config::new("mta1.example.com"));

    let connected = dialer
        .connect(&[route(1, refusing), route(2, accepting)])
        .await
        .unwrap();
    assert_eq!(connected.route.id, 2);
}

#[tokio::test]
async fn silent_server_falls_back() {
    let silent = server(b"").await;
    let accepting = server(b"220 backup.example.com ESMTP\r\n").await;
    let config = Config::builder("mta1.example.com")
        .greeting_timeout(Duration::from_millis(200))
        .build();
    let mut dialer = dialer(config);

    let connected = dialer
        .connect(&[route(1, silent), route(2, accepting)])
        .await
        .unwrap();
    assert_eq!(connected.route.id, 2);
}

#[tokio::test]
async fn unreachable_candidate_falls_back_within_route() {
    let accepting = server(b"220 mx.example.com ESMTP\r\n").await;
    // Nothing listens on 127.0.0.2 at the live server's port.
    let resolver = CountingResolver {
        answer: vec!["127.0.0.2".parse().unwrap(), accepting.ip()],
        ..CountingResolver::default()
    };
    let mut dialer = dialer(Config::new("mta1.example.com")).with_resolver(resolver.clone());

    let routes = [Route::new(1, "127.0.0.1", "mx.example.com", accepting.port())];
    let connected = dialer.connect(&routes).await.unwrap();
    assert_eq!(connected.route.id, 1);
    assert_eq!(connected.candidate.remote, accepting);
    assert_eq!(resolver.lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn every_candidate_failing_is_exhaustion() {
    let dead = closed_port().await;
    let mut dialer = dialer(Config::new("mta1.example.com"));

    let err = dialer.connect(&[route(1, dead), route(2, dead)]).await.unwrap_err();
    assert!(matches!(err, Error::Exhausted { routes: 2, attempts: 2 }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn family_mismatch_is_never_attempted() {
    let accepting = server(b"220 mx.example.com ESMTP\r\n").await;
    let mut dialer = dialer(Config::new("mta1.example.com"));
    let route = Route::new(1, "::1&127.0.0.1", "127.0.0.1", accepting.port());

    let pairs = dialer.resolve(&route).await.unwrap();
    assert_eq!(pairs.len(), 1);
    assert!(pairs[0].local.is_ipv4());

    let connected = dialer.connect(&[route]).await.unwrap();
    assert!(connected.candidate.local.is_ipv4());
}

#[tokio::test]
async fn bad_policy_fails_before_any_io() {
    let resolver = CountingResolver::default();
    let mut dialer = dialer(Config::new("mta1.example.com")).with_resolver(resolver.clone());
    let routes = [
        Route::new(1, "127.0.0.1", "mx.example.com", 25),
        Route::new(2, "127.0.0.1&127.0.0.2|127.0.0.3", "mx.example.com", 25),
    ];

    let err = dialer.connect(&routes).await.unwrap_err();
    assert!(matches!(err, Error::Configuration { route: 2 }));
    assert!(!err.is_retryable());
    assert_eq!(resolver.lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_answer_moves_on() {
    let accepting = server(b"220 mx.example.com ESMTP\r\n").await;
    let mut dialer = dialer(Config::new("mta1.example.com"));

    let routes = [
        Route::new(1, "127.0.0.1", "nothing.example.com", 25),
        route(2, accepting),
    ];
    let connected = dialer.connect(&routes).await.unwrap();
    assert_eq!(connected.route.id, 2);
}

#[tokio::test]
async fn round_robin_is_reshuffled_per_resolution() {
    let mut dialer = dialer(Config::new("mta1.example.com"));
    let route = Route::new(1, "127.0.0.1|127.0.0.2", "127.0.0.1", 25);

    let mut firsts = std::collections::HashSet::new();
    for _ in 0..64 {
        let pairs = dialer.resolve(&route).await.unwrap();
        assert_eq!(pairs.len(), 2);
        firsts.insert(pairs[0].local);
    }
    assert_eq!(firsts.len(), 2);
}
