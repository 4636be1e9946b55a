//! MAIL, RCPT, DATA and QUIT.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::{DataWriter, Session};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Sends `MAIL FROM:<from>`. An empty `from` is the null reverse path.
    ///
    /// # Errors
    ///
    /// Returns an error unless the server answers 250.
    pub async fn mail(&mut self, from: &str) -> Result<Reply> {
        let command = Command::MailFrom {
            from: from.to_string(),
        };
        self.execute(self.config.timeouts.mail_from, Some(ReplyCode::OK), &command)
            .await
    }

    /// Sends `RCPT TO:<to>`. 250 and 251 accept the recipient.
    ///
    /// # Errors
    ///
    /// Any other code becomes [`Error::Rejected`], whose text is exactly the
    /// server's reply text.
    pub async fn rcpt(&mut self, to: &str) -> Result<Reply> {
        let command = Command::RcptTo { to: to.to_string() };
        let reply = self
            .execute(self.config.timeouts.rcpt_to, None, &command)
            .await?;
        match reply.code {
            ReplyCode::OK | ReplyCode::FORWARD => Ok(reply),
            code => Err(Error::Rejected {
                code: code.as_u16(),
                message: reply.message_text(),
            }),
        }
    }

    /// Sends DATA and returns a writer for the message body.
    ///
    /// The writer borrows the session; the body must be written and
    /// [`DataWriter::finish`] called before the session accepts another
    /// command.
    ///
    /// # Errors
    ///
    /// Returns an error unless the server answers 354.
    pub async fn data(&mut self) -> Result<DataWriter<'_, S>> {
        self.execute(
            self.config.timeouts.data,
            Some(ReplyCode::START_DATA),
            &Command::Data,
        )
        .await?;
        Ok(DataWriter::new(self))
    }

    /// Sends QUIT, then closes the transport.
    ///
    /// The transport is closed whatever happens to the QUIT command itself.
    ///
    /// # Errors
    ///
    /// Returns the QUIT error (timeout, unexpected code, transport error).
    pub async fn quit(&mut self) -> Result<Reply> {
        let result = self
            .execute(self.config.timeouts.quit, Some(ReplyCode::CLOSING), &Command::Quit)
            .await;
        if let Err(err) = self.close().await {
            debug!(error = %err, "transport shutdown after QUIT failed");
        }
        result
    }
}
