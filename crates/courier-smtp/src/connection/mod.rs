//! SMTP session over a plain or TLS transport.

mod auth;
mod data;
mod envelope;
mod session;
mod stream;

pub use data::{DataWriter, DotStuffer};
pub use session::Session;
pub use stream::{MAX_LINE_LEN, SmtpStream};
