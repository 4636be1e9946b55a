//! # courier-smtp
//!
//! The client half of an SMTP conversation for an outbound mail transfer
//! agent, implementing RFC 5321 with STARTTLS (RFC 3207) and SASL AUTH
//! (RFC 4954).
//!
//! ## Features
//!
//! - **One command primitive**: every exchange goes through
//!   [`Session::execute`], which races the write/read against a per-command
//!   time bound and drops the exchange when the bound elapses
//! - **Extension negotiation**: EHLO with HELO fallback; extensions are
//!   replaced, never merged, on each greeting
//! - **Opportunistic TLS**: STARTTLS with caller-supplied rustls settings,
//!   followed by a fresh EHLO
//! - **Pluggable SASL**: the [`Authenticator`] trait, with PLAIN, LOGIN,
//!   XOAUTH2 and OAUTHBEARER provided
//! - **Envelope**: MAIL, RCPT, a dot-stuffing DATA writer, QUIT
//!
//! ## Quick Start
//!
//! ```ignore
//! use courier_smtp::{Session, SessionConfig, TlsOptions, auth::Plain};
//! use tokio::net::TcpStream;
//!
//! #[tokio::main]
//! async fn main() -> courier_smtp::Result<()> {
//!     let tcp = TcpStream::connect("mx.example.com:25").await?;
//!     let mut session = Session::from_stream(tcp, SessionConfig::new("mta1.example.net")).await?;
//!
//!     session.hello().await?;
//!     if session.extensions().supports_starttls() {
//!         session.starttls(&TlsOptions::with_webpki_roots("mx.example.com")?).await?;
//!     }
//!     session.auth(&mut Plain::new("user", "password")).await?;
//!
//!     session.mail("sender@example.net").await?;
//!     session.rcpt("recipient@example.com").await?;
//!     let mut body = session.data().await?;
//!     body.write(b"Subject: Test\r\n\r\nHello, World!\r\n").await?;
//!     body.finish().await?;
//!
//!     session.quit().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`auth`]: authenticator trait and SASL mechanisms
//! - [`command`]: SMTP command builder
//! - [`connection`]: transport and session
//! - [`parser`]: reply parser
//! - [`types`]: replies and extensions

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod command;
mod config;
pub mod connection;
mod error;
pub mod parser;
mod tls;
pub mod types;

pub use auth::{AuthContext, AuthStart, Authenticator};
pub use config::{SessionConfig, Timeouts};
pub use connection::{DataWriter, Session, SmtpStream};
pub use error::{Error, Result};
pub use tls::{NO_TLS, TlsOptions};
pub use types::{AuthMechanism, Extensions, Reply, ReplyClass, ReplyCode};
