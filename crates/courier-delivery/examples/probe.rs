//! Connects over one route and reports what the server offers.
//!
//! ```text
//! RUST_LOG=courier_delivery=debug,courier_smtp=trace \
//!     cargo run -p courier-delivery --example probe -- 192.0.2.1 mx.example.com [port]
//! ```

use anyhow::Context;
use courier_delivery::{Config, Dialer, Route};
use courier_smtp::TlsOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier_delivery=debug,courier_smtp=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let local_ip = args.next().context("usage: probe <local-ip> <host> [port]")?;
    let host = args.next().context("usage: probe <local-ip> <host> [port]")?;
    let port = match args.next() {
        Some(port) => port.parse().context("invalid port")?,
        None => 25,
    };

    let identity = std::env::var("PROBE_IDENTITY").unwrap_or_else(|_| "localhost".into());
    let mut dialer = Dialer::new(Config::new(identity));
    let route = Route::new(1, local_ip, host.clone(), port);

    for candidate in dialer.resolve(&route).await? {
        println!("candidate: {candidate}");
    }

    let mut connected = dialer.connect(&[route]).await?;
    let session = &mut connected.session;
    println!("connected: {}", connected.candidate);
    println!("greeting:  {}", session.greeting().message_text());

    session.hello().await?;
    for (keyword, param) in session.extensions().iter() {
        println!("extension: {keyword} {param}");
    }

    if session.extensions().supports_starttls() {
        let tls = TlsOptions::with_webpki_roots(&host)?;
        session.starttls(&tls).await?;
        println!(
            "tls:       {} {}",
            session.tls_version(),
            session.tls_cipher_suite()
        );
        println!("auth:      {}", session.auth_mechanisms().join(" "));
    }

    session.quit().await?;
    Ok(())
}
