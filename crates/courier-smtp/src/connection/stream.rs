//! Low-level SMTP stream handling.

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use crate::error::{Error, Result};
use crate::tls::TlsOptions;

/// Longest reply line accepted, CRLF included (RFC 5321 §4.5.3.1.6).
pub const MAX_LINE_LEN: usize = 1000;

/// SMTP transport: plain, TLS, or already closed.
#[derive(Debug)]
pub enum SmtpStream<S> {
    /// Plain connection.
    Plain(BufReader<S>),
    /// TLS-encrypted connection.
    Tls(Box<BufReader<TlsStream<S>>>),
    /// No transport left: QUIT ran, the TLS upgrade failed, the caller closed
    /// it, or a failed exchange left it out of step.
    Closed,
}

impl<S> SmtpStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a freshly connected transport.
    pub fn new(inner: S) -> Self {
        Self::Plain(BufReader::new(inner))
    }

    /// Reads one line, without its line ending.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails, the peer closed the connection,
    /// or the line runs past [`MAX_LINE_LEN`] without ending.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = Vec::new();
        let n = match self {
            Self::Plain(reader) => read_capped(reader, &mut line).await?,
            Self::Tls(reader) => read_capped(&mut **reader, &mut line).await?,
            Self::Closed => return Err(Error::NotConnected),
        };
        if n == 0 {
            return Err(Error::Io(std::io::ErrorKind::UnexpectedEof.into()));
        }
        if line.last() != Some(&b'\n') {
            if n >= MAX_LINE_LEN {
                return Err(Error::Malformed(format!(
                    "reply line longer than {MAX_LINE_LEN} bytes"
                )));
            }
            return Err(Error::Io(std::io::ErrorKind::UnexpectedEof.into()));
        }
        let line = String::from_utf8_lossy(&line);
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Writes data to the stream and flushes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Self::Plain(reader) => {
                reader.get_mut().write_all(data).await?;
                reader.get_mut().flush().await?;
            }
            Self::Tls(reader) => {
                reader.get_mut().write_all(data).await?;
                reader.get_mut().flush().await?;
            }
            Self::Closed => return Err(Error::NotConnected),
        }
        Ok(())
    }

    /// Upgrades a plain stream to TLS.
    ///
    /// The plain transport is consumed whether or not the handshake succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is not plain or the handshake fails.
    pub async fn upgrade_to_tls(self, options: &TlsOptions) -> Result<Self> {
        let inner = match self {
            Self::Plain(reader) => reader.into_inner(),
            Self::Tls(_) => return Err(Error::InvalidState("already using TLS".into())),
            Self::Closed => return Err(Error::NotConnected),
        };

        let connector = TlsConnector::from(options.config.clone());
        let tls_stream = connector
            .connect(options.server_name.clone(), inner)
            .await
            .map_err(handshake_error)?;
        Ok(Self::Tls(Box::new(BufReader::new(tls_stream))))
    }

    /// Shuts the transport down and leaves the stream closed.
    ///
    /// # Errors
    ///
    /// Returns the shutdown error, if any; the stream is closed regardless.
    pub async fn shutdown(&mut self) -> Result<()> {
        let result = match self {
            Self::Plain(reader) => reader.get_mut().shutdown().await,
            Self::Tls(reader) => reader.get_mut().shutdown().await,
            Self::Closed => Ok(()),
        };
        *self = Self::Closed;
        result.map_err(Error::from)
    }
}

impl<S> SmtpStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the underlying transport, beneath any TLS layer.
    #[must_use]
    pub fn get_ref(&self) -> Option<&S> {
        match self {
            Self::Plain(reader) => Some(reader.get_ref()),
            Self::Tls(reader) => Some(reader.get_ref().get_ref().0),
            Self::Closed => None,
        }
    }

    /// Returns the TLS connection state, when encrypted.
    #[must_use]
    pub fn tls_connection(&self) -> Option<&rustls::ClientConnection> {
        match self {
            Self::Tls(reader) => Some(reader.get_ref().get_ref().1),
            _ => None,
        }
    }

    /// Returns true unless the stream has been closed.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }
}

/// Reads up to and including `\n`, giving up after [`MAX_LINE_LEN`] bytes.
async fn read_capped<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    reader.take(MAX_LINE_LEN as u64).read_until(b'\n', buf).await
}

/// tokio-rustls reports handshake failures as `io::Error`s wrapping the
/// rustls error; unwrap those so callers can tell TLS from transport trouble.
fn handshake_error(err: std::io::Error) -> Error {
    let tls = err
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<rustls::Error>())
        .cloned();
    match tls {
        Some(tls) => Error::Tls(tls),
        None => Error::Io(err),
    }
}
