//! SMTP client session: command execution, greeting, HELO/EHLO and STARTTLS.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

use super::SmtpStream;
use crate::command::Command;
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::tls::{self, NO_TLS, TlsOptions};
use crate::types::{Extensions, Reply, ReplyCode};

/// One SMTP conversation with one server.
///
/// A session owns its transport and is driven by a single caller; commands
/// run strictly one after another. Extension state is replaced wholesale by
/// every successful HELO/EHLO.
#[derive(Debug)]
pub struct Session<S> {
    pub(super) stream: SmtpStream<S>,
    pub(super) config: SessionConfig,
    greeting: Reply,
    extensions: Extensions,
    tls: bool,
    pub(super) in_data: bool,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a connected transport and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if no greeting arrives in time, and
    /// [`Error::Protocol`] if the greeting code is not 220.
    pub async fn from_stream(inner: S, config: SessionConfig) -> Result<Self> {
        let mut stream = SmtpStream::new(inner);
        let limit = config.timeouts.greeting;
        let greeting = match timeout(limit, read_reply(&mut stream)).await {
            Ok(reply) => reply?,
            Err(_) => return Err(Error::Timeout(limit)),
        };
        if greeting.code != ReplyCode::SERVICE_READY {
            return Err(Error::protocol(
                greeting.code.as_u16(),
                greeting.message_text(),
            ));
        }

        Ok(Self {
            stream,
            config,
            greeting,
            extensions: Extensions::default(),
            tls: false,
            in_data: false,
        })
    }

    /// Sends one command and reads its reply, bounded by `limit`.
    ///
    /// With `expected` set, any other reply code becomes [`Error::Protocol`]
    /// carrying the server's code and text. With `None` the reply is returned
    /// as-is for the caller to judge.
    ///
    /// Arguments that could break the command line (CR, LF, stray angle
    /// brackets) are refused with [`Error::InvalidArgument`] before anything
    /// is written.
    ///
    /// When `limit` elapses the in-flight write/read is dropped and
    /// [`Error::Timeout`] is returned. A late reply would then be read as the
    /// answer to the next command, so the session is closed instead; the
    /// same goes for transport errors and malformed replies.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid arguments, timeout, transport failure, a
    /// malformed reply, or a code mismatch.
    pub async fn execute(
        &mut self,
        limit: Duration,
        expected: Option<ReplyCode>,
        command: &Command,
    ) -> Result<Reply> {
        if self.in_data {
            return Err(Error::InvalidState(
                "message data in progress; finish the data writer first".into(),
            ));
        }
        command.validate()?;
        trace!(?command, "sending");
        self.exchange(limit, expected, &command.serialize()).await
    }

    /// Writes raw bytes, then reads and checks one reply within `limit`.
    pub(super) async fn exchange(
        &mut self,
        limit: Duration,
        expected: Option<ReplyCode>,
        data: &[u8],
    ) -> Result<Reply> {
        let stream = &mut self.stream;
        let transact = async move {
            stream.write_all(data).await?;
            read_reply(stream).await
        };
        let reply = match timeout(limit, transact).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => return Err(self.abandon(err)),
            Err(_) => return Err(self.abandon(Error::Timeout(limit))),
        };
        trace!(code = %reply.code, "reply");

        match expected {
            Some(code) if reply.code != code => Err(Error::protocol(
                reply.code.as_u16(),
                reply.message_text(),
            )),
            _ => Ok(reply),
        }
    }

    /// Drops the transport after a failure that leaves the conversation out
    /// of step, and hands the error back.
    pub(super) fn abandon(&mut self, err: Error) -> Error {
        if self.stream.is_open() {
            debug!(error = %err, "closing session");
        }
        self.stream = SmtpStream::Closed;
        self.in_data = false;
        err
    }

    /// Greets the server, preferring EHLO.
    ///
    /// An EHLO refusal falls back to HELO. A timeout or transport failure
    /// closes the session, so it is returned as-is.
    ///
    /// # Errors
    ///
    /// Returns the EHLO error if the session was closed, else the HELO error
    /// if both greetings fail.
    pub async fn hello(&mut self) -> Result<Reply> {
        match self.ehlo().await {
            Ok(reply) => Ok(reply),
            Err(err) if self.is_open() => {
                debug!(error = %err, "EHLO failed, falling back to HELO");
                self.helo().await
            }
            Err(err) => Err(err),
        }
    }

    /// Sends EHLO and records the advertised extensions.
    ///
    /// # Errors
    ///
    /// Returns an error unless the server answers 250.
    pub async fn ehlo(&mut self) -> Result<Reply> {
        let command = Command::Ehlo {
            hostname: self.config.local_identity.clone(),
        };
        let reply = self
            .execute(self.config.timeouts.ehlo, Some(ReplyCode::OK), &command)
            .await?;
        self.extensions = Extensions::parse(&reply.message);
        Ok(reply)
    }

    /// Sends HELO. HELO advertises nothing, so extensions are cleared.
    ///
    /// # Errors
    ///
    /// Returns an error unless the server answers 250.
    pub async fn helo(&mut self) -> Result<Reply> {
        self.extensions = Extensions::default();
        let command = Command::Helo {
            hostname: self.config.local_identity.clone(),
        };
        self.execute(self.config.timeouts.helo, Some(ReplyCode::OK), &command)
            .await
    }

    /// Upgrades the session with STARTTLS, then re-runs EHLO over TLS.
    ///
    /// The session only reports TLS as active once the post-handshake EHLO
    /// succeeds. A failed handshake leaves the session closed; there is no
    /// way back to the plaintext channel.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is refused, the handshake fails or times
    /// out, or the second EHLO fails.
    pub async fn starttls(&mut self, options: &TlsOptions) -> Result<Reply> {
        self.tls = false;
        let limit = self.config.timeouts.starttls;
        self.execute(limit, Some(ReplyCode::SERVICE_READY), &Command::StartTls)
            .await?;
        // Nothing learned over plaintext is trusted past this point.
        self.extensions = Extensions::default();

        let plain = std::mem::replace(&mut self.stream, SmtpStream::Closed);
        self.stream = match timeout(limit, plain.upgrade_to_tls(options)).await {
            Ok(upgraded) => upgraded?,
            Err(_) => return Err(self.abandon(Error::Timeout(limit))),
        };

        let reply = self.ehlo().await?;
        self.tls = true;
        debug!(
            version = %self.tls_version(),
            cipher = %self.tls_cipher_suite(),
            "TLS established"
        );
        Ok(reply)
    }

    /// Sends NOOP.
    ///
    /// # Errors
    ///
    /// Returns an error unless the server answers 250.
    pub async fn noop(&mut self) -> Result<Reply> {
        self.execute(self.config.timeouts.noop, Some(ReplyCode::OK), &Command::Noop)
            .await
    }

    /// Sends RSET, abandoning the current mail transaction.
    ///
    /// # Errors
    ///
    /// Returns an error unless the server answers 250.
    pub async fn rset(&mut self) -> Result<Reply> {
        self.execute(self.config.timeouts.rset, Some(ReplyCode::OK), &Command::Rset)
            .await
    }

    /// Closes the transport without saying goodbye.
    ///
    /// # Errors
    ///
    /// Returns the shutdown error, if any; the session is closed regardless.
    pub async fn close(&mut self) -> Result<()> {
        self.in_data = false;
        self.stream.shutdown().await
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Reply the server greeted us with.
    #[must_use]
    pub const fn greeting(&self) -> &Reply {
        &self.greeting
    }

    /// Extensions from the most recent HELO/EHLO.
    #[must_use]
    pub const fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Looks up an advertised extension (case-insensitive) and its parameter.
    #[must_use]
    pub fn extension(&self, keyword: &str) -> Option<&str> {
        self.extensions.get(keyword)
    }

    /// Authentication mechanisms from the most recent EHLO.
    #[must_use]
    pub fn auth_mechanisms(&self) -> &[String] {
        self.extensions.mechanisms()
    }

    /// True once STARTTLS and the EHLO that follows it have both succeeded.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        self.tls
    }

    /// True until QUIT, `close`, a failed TLS upgrade, or a timeout or
    /// transport error that leaves the conversation out of step.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.stream.is_open()
    }

    /// Session settings.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Negotiated TLS protocol version, or [`NO_TLS`].
    #[must_use]
    pub fn tls_version(&self) -> String {
        match self.stream.tls_connection() {
            Some(conn) if self.tls => tls::version_name(conn),
            _ => NO_TLS.to_string(),
        }
    }

    /// Negotiated TLS cipher suite, or [`NO_TLS`].
    #[must_use]
    pub fn tls_cipher_suite(&self) -> String {
        match self.stream.tls_connection() {
            Some(conn) if self.tls => tls::cipher_suite_name(conn),
            _ => NO_TLS.to_string(),
        }
    }
}

impl Session<TcpStream> {
    /// Local socket address of the connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] once the session is closed.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        let tcp = self.stream.get_ref().ok_or(Error::NotConnected)?;
        Ok(tcp.local_addr()?)
    }

    /// Remote socket address of the connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] once the session is closed.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        let tcp = self.stream.get_ref().ok_or(Error::NotConnected)?;
        Ok(tcp.peer_addr()?)
    }
}

/// Reads one complete (possibly multi-line) reply.
pub(super) async fn read_reply<S>(stream: &mut SmtpStream<S>) -> Result<Reply>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut lines = Vec::new();
    loop {
        let line = stream.read_line().await?;
        if line.is_empty() {
            continue;
        }

        let is_last = is_last_reply_line(&line);
        lines.push(line);

        if is_last {
            break;
        }
    }

    parse_reply(&lines)
}
