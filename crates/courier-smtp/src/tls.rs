//! Caller-supplied TLS parameters and display names for negotiated TLS state.

use std::sync::Arc;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore};

use crate::error::{Error, Result};

/// Returned by TLS queries before STARTTLS has completed.
pub const NO_TLS: &str = "no TLS";

/// Trust policy and peer name for a STARTTLS upgrade.
///
/// The session imposes nothing on the configuration: protocol versions,
/// cipher suites and trust roots are whatever the caller built.
#[derive(Clone)]
pub struct TlsOptions {
    /// Client configuration handed to the handshake.
    pub config: Arc<ClientConfig>,
    /// Name the server certificate is verified against.
    pub server_name: ServerName<'static>,
}

impl TlsOptions {
    /// Creates options from an existing configuration.
    #[must_use]
    pub const fn new(config: Arc<ClientConfig>, server_name: ServerName<'static>) -> Self {
        Self {
            config,
            server_name,
        }
    }

    /// Builds options verifying `host` against the bundled webpki roots.
    ///
    /// # Errors
    ///
    /// Returns an error if `host` is neither a DNS name nor an IP address.
    pub fn with_webpki_roots(host: &str) -> Result<Self> {
        let root_store = RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };

        let config = ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let server_name = ServerName::try_from(host.to_string())
            .map_err(|_| Error::InvalidState(format!("invalid TLS server name: {host}")))?;

        Ok(Self::new(Arc::new(config), server_name))
    }
}

impl std::fmt::Debug for TlsOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsOptions")
            .field("server_name", &self.server_name)
            .finish_non_exhaustive()
    }
}

/// Human-readable protocol version of an established connection.
pub(crate) fn version_name(conn: &ClientConnection) -> String {
    conn.protocol_version()
        .map_or_else(|| "UNKNOWN".to_string(), |version| {
            version
                .as_str()
                .map_or_else(|| format!("{version:?}"), str::to_string)
        })
}

/// Human-readable cipher suite of an established connection.
pub(crate) fn cipher_suite_name(conn: &ClientConnection) -> String {
    conn.negotiated_cipher_suite()
        .map_or_else(|| "UNKNOWN".to_string(), |suite| {
            let suite = suite.suite();
            suite
                .as_str()
                .map_or_else(|| format!("{suite:?}"), str::to_string)
        })
}
