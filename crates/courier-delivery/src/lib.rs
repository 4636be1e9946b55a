//! # courier-delivery
//!
//! Finds a server to talk to. Given the routes for a destination, the
//! [`Dialer`] expands each route's local source addresses and remote host
//! into candidate pairs, then tries them one after another until a server
//! accepts the connection and greets with 220.
//!
//! ## Local address policies
//!
//! A route's local-IP specification is one of:
//!
//! - `192.0.2.1`: a single source address
//! - `192.0.2.1&192.0.2.2`: failover, tried in the order written
//! - `192.0.2.1|192.0.2.2`: round-robin, shuffled on every attempt
//!
//! Mixing `&` and `|` is a configuration error, reported before any lookup
//! or connect. Only local/remote pairs of the same address family are
//! tried.
//!
//! ## Quick Start
//!
//! ```ignore
//! use courier_delivery::{Config, Dialer, Route};
//!
//! #[tokio::main]
//! async fn main() -> courier_delivery::Result<()> {
//!     let routes = [
//!         Route::new(1, "192.0.2.1|192.0.2.2", "mx1.example.com", 25),
//!         Route::new(2, "192.0.2.1", "mx2.example.com", 25),
//!     ];
//!     let mut dialer = Dialer::new(Config::new("mta1.example.net"));
//!     let mut connected = dialer.connect(&routes).await?;
//!     connected.session.hello().await?;
//!     connected.session.quit().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;
mod dialer;
mod error;
pub mod resolve;
pub mod route;

pub use config::{Config, ConfigBuilder, DEFAULT_CONNECT_TIMEOUT};
pub use dialer::{Connected, Dialer};
pub use error::{Error, Result};
pub use resolve::{CandidatePair, Resolve, SystemResolver};
pub use route::{LocalIpPolicy, Route};
