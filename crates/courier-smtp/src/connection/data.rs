//! Message body transfer with dot-stuffing.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;

use super::Session;
use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Streaming encoder for the DATA phase.
///
/// Normalizes bare LF to CRLF and doubles a `.` at the start of any line,
/// keeping line state across chunks so a body can be fed in arbitrary
/// pieces.
#[derive(Debug, Clone, Copy)]
pub struct DotStuffer {
    line_start: bool,
    last_cr: bool,
}

impl Default for DotStuffer {
    fn default() -> Self {
        Self {
            line_start: true,
            last_cr: false,
        }
    }
}

impl DotStuffer {
    /// Encodes the next chunk of the body.
    #[must_use]
    pub fn encode(&mut self, chunk: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(chunk.len() + chunk.len() / 64 + 2);
        for &b in chunk {
            if b == b'\n' {
                if !self.last_cr {
                    out.push(b'\r');
                }
                out.push(b'\n');
                self.line_start = true;
                self.last_cr = false;
                continue;
            }
            if self.line_start && b == b'.' {
                out.push(b'.');
            }
            out.push(b);
            self.line_start = false;
            self.last_cr = b == b'\r';
        }
        out
    }

    /// Bytes that end the body: a line break if the body did not end with
    /// one, then `.` CRLF.
    #[must_use]
    pub const fn terminator(&self) -> &'static [u8] {
        if self.line_start {
            b".\r\n"
        } else if self.last_cr {
            b"\n.\r\n"
        } else {
            b"\r\n.\r\n"
        }
    }
}

/// Writer for the body of one message, handed out by [`Session::data`].
#[derive(Debug)]
pub struct DataWriter<'a, S> {
    session: &'a mut Session<S>,
    stuffer: DotStuffer,
}

impl<'a, S> DataWriter<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(super) fn new(session: &'a mut Session<S>) -> Self {
        session.in_data = true;
        Self {
            session,
            stuffer: DotStuffer::default(),
        }
    }

    /// Writes a chunk of the message body.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or exceeds the data timeout.
    /// Either way part of the body may already be on the wire, so the
    /// session is closed.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        let encoded = self.stuffer.encode(chunk);
        let limit = self.session.config.timeouts.data_dot;
        match timeout(limit, self.session.stream.write_all(&encoded)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(self.session.abandon(err)),
            Err(_) => Err(self.session.abandon(Error::Timeout(limit))),
        }
    }

    /// Ends the body and reads the server's verdict on the message.
    ///
    /// # Errors
    ///
    /// Returns an error unless the server answers 250.
    pub async fn finish(self) -> Result<Reply> {
        let limit = self.session.config.timeouts.data_dot;
        let terminator = self.stuffer.terminator();
        self.session.in_data = false;
        self.session
            .exchange(limit, Some(ReplyCode::OK), terminator)
            .await
    }
}
