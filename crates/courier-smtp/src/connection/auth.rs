//! The AUTH exchange.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::Session;
use crate::auth::{AuthContext, Authenticator};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Authenticates with the given mechanism.
    ///
    /// Sends `AUTH` (with the base64 initial response if the authenticator
    /// has one), then answers 334 challenges until the authenticator has
    /// nothing more to say. A 235 straight after `AUTH` finishes the exchange
    /// without consulting the authenticator again; a 235 after challenges is
    /// handed to it as plain text.
    ///
    /// If the authenticator refuses to start, QUIT is sent. If a challenge
    /// cannot be decoded, the authenticator errors, or the server answers
    /// with any code other than 334/235, the exchange is cancelled with `*`
    /// and QUIT is sent. Either way the session is closed afterwards.
    ///
    /// Returns the last reply read, normally the 235.
    ///
    /// # Errors
    ///
    /// Returns the authenticator's error, [`Error::Auth`] for an undecodable
    /// challenge, [`Error::Protocol`] for an unexpected code, or any
    /// transport error while sending.
    pub async fn auth<A>(&mut self, authenticator: &mut A) -> Result<Reply>
    where
        A: Authenticator + ?Sized,
    {
        let context = AuthContext {
            local_identity: &self.config.local_identity,
            tls: self.is_tls(),
            mechanisms: self.auth_mechanisms(),
        };
        let start = match authenticator.start(&context) {
            Ok(start) => start,
            Err(err) => {
                debug!(error = %err, "authenticator refused to start");
                if let Err(quit) = self.quit().await {
                    debug!(error = %quit, "QUIT after refused AUTH failed");
                }
                return Err(err);
            }
        };

        debug!(mechanism = %start.mechanism, "authenticating");
        let limit = self.config.timeouts.auth;
        let command = Command::Auth {
            mechanism: start.mechanism,
            initial_response: start.initial_response.map(|resp| STANDARD.encode(resp)),
        };
        let mut reply = self.execute(limit, None, &command).await?;
        let mut challenged = false;

        loop {
            let step = match reply.code {
                ReplyCode::AUTH_SUCCESS if !challenged => Ok(None),
                code => answer(authenticator, &reply, code),
            };
            match step {
                Ok(Some(response)) => {
                    challenged = true;
                    let command = Command::AuthResponse(STANDARD.encode(response));
                    reply = self.execute(limit, None, &command).await?;
                }
                Ok(None) => return Ok(reply),
                Err(err) => {
                    self.abort_auth().await;
                    return Err(err);
                }
            }
        }
    }

    async fn abort_auth(&mut self) {
        let limit = self.config.timeouts.auth_abort;
        if let Err(err) = self
            .execute(limit, Some(ReplyCode::PARAMETER_ERROR), &Command::AuthAbort)
            .await
        {
            debug!(error = %err, "AUTH cancel not acknowledged");
        }
        if let Err(err) = self.quit().await {
            debug!(error = %err, "QUIT after cancelled AUTH failed");
        }
    }
}

fn answer<A>(authenticator: &mut A, reply: &Reply, code: ReplyCode) -> Result<Option<Vec<u8>>>
where
    A: Authenticator + ?Sized,
{
    match code {
        ReplyCode::AUTH_CONTINUE => {
            let challenge = STANDARD
                .decode(reply.message_text().trim())
                .map_err(|err| Error::Auth(format!("undecodable challenge: {err}")))?;
            authenticator.next(&challenge, true)
        }
        // The final status is human-readable text, never base64.
        ReplyCode::AUTH_SUCCESS => authenticator.next(reply.message_text().as_bytes(), false),
        code => Err(Error::protocol(code.as_u16(), reply.message_text())),
    }
}
