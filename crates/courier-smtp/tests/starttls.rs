//! STARTTLS against an in-process TLS server holding a throwaway certificate.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, KeyPair};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, ServerName};
use rustls::{ClientConfig, RootCertStore, ServerConfig};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

use courier_smtp::{Error, NO_TLS, ReplyCode, Session, SessionConfig, TlsOptions};

const HOST: &str = "mx.example.com";

/// A private CA, a leaf for [`HOST`] signed by it, and configs for both ends.
fn tls_configs() -> (TlsAcceptor, TlsOptions) {
    let ca_key = KeyPair::generate().unwrap();
    let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
    ca_params
        .distinguished_name
        .push(DnType::CommonName, "courier test CA");
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let ca = ca_params.self_signed(&ca_key).unwrap();

    let leaf_key = KeyPair::generate().unwrap();
    let mut leaf_params = CertificateParams::new(vec![HOST.to_string()]).unwrap();
    leaf_params.distinguished_name.push(DnType::CommonName, HOST);
    let leaf = leaf_params.signed_by(&leaf_key, &ca, &ca_key).unwrap();

    let server = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(
            vec![CertificateDer::from_slice(leaf.der()).into_owned()],
            PrivateKeyDer::from(PrivatePkcs8KeyDer::from(leaf_key.serialize_der())),
        )
        .unwrap();

    let mut roots = RootCertStore::empty();
    roots
        .add(CertificateDer::from_slice(ca.der()).into_owned())
        .unwrap();
    let client = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    (
        TlsAcceptor::from(Arc::new(server)),
        TlsOptions::new(Arc::new(client), ServerName::try_from(HOST).unwrap()),
    )
}

async fn expect_line<R: AsyncBufRead + Unpin>(reader: &mut R, want: &str) {
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    assert_eq!(line.trim_end(), want);
}

/// Offers STARTTLS in the clear, upgrades, answers the second EHLO with
/// `ehlo_over_tls`, then takes QUIT.
fn serve(
    stream: DuplexStream,
    acceptor: TlsAcceptor,
    ehlo_over_tls: &'static [u8],
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut plain = BufReader::new(stream);
        plain
            .get_mut()
            .write_all(b"220 mx.example.com ESMTP\r\n")
            .await
            .unwrap();
        expect_line(&mut plain, "EHLO mta1.example.com").await;
        plain
            .get_mut()
            .write_all(b"250-mx.example.com\r\n250-SIZE 500\r\n250 STARTTLS\r\n")
            .await
            .unwrap();
        expect_line(&mut plain, "STARTTLS").await;
        plain
            .get_mut()
            .write_all(b"220 2.0.0 Ready to start TLS\r\n")
            .await
            .unwrap();

        let mut tls = BufReader::new(acceptor.accept(plain.into_inner()).await.unwrap());
        expect_line(&mut tls, "EHLO mta1.example.com").await;
        tls.get_mut().write_all(ehlo_over_tls).await.unwrap();
        tls.get_mut().flush().await.unwrap();

        expect_line(&mut tls, "QUIT").await;
        tls.get_mut().write_all(b"221 2.0.0 bye\r\n").await.unwrap();
        tls.get_mut().flush().await.unwrap();
    })
}

#[tokio::test]
async fn starttls_replaces_extensions_and_reports_tls() {
    let (acceptor, options) = tls_configs();
    let (client, server) = tokio::io::duplex(64 * 1024);
    let server = serve(
        server,
        acceptor,
        b"250-mx.example.com\r\n250-AUTH PLAIN LOGIN\r\n250 SIZE 1000\r\n",
    );

    let mut session = Session::from_stream(client, SessionConfig::new("mta1.example.com"))
        .await
        .unwrap();
    session.ehlo().await.unwrap();
    assert!(session.extensions().supports_starttls());
    assert!(session.auth_mechanisms().is_empty());
    assert!(!session.is_tls());

    let reply = session.starttls(&options).await.unwrap();
    assert_eq!(reply.code, ReplyCode::OK);
    assert!(session.is_tls());
    assert!(!session.extensions().supports_starttls());
    assert_eq!(session.auth_mechanisms(), ["PLAIN", "LOGIN"]);
    assert_eq!(session.extension("SIZE"), Some("1000"));

    let version = session.tls_version();
    let cipher = session.tls_cipher_suite();
    assert!(version.starts_with("TLSv1"), "{version}");
    assert!(cipher.starts_with("TLS"), "{cipher}");
    assert_ne!(cipher, NO_TLS);

    session.quit().await.unwrap();
    assert!(!session.is_open());
    server.await.unwrap();
}

#[tokio::test]
async fn refused_ehlo_after_handshake_leaves_tls_inactive() {
    let (acceptor, options) = tls_configs();
    let (client, server) = tokio::io::duplex(64 * 1024);
    let server = serve(server, acceptor, b"554 5.7.0 not today\r\n");

    let mut session = Session::from_stream(client, SessionConfig::new("mta1.example.com"))
        .await
        .unwrap();
    session.ehlo().await.unwrap();

    let err = session.starttls(&options).await.unwrap_err();
    assert!(matches!(err, Error::Protocol { code: 554, .. }));
    assert!(!session.is_tls());
    assert!(session.extensions().is_empty());
    assert_eq!(session.tls_version(), NO_TLS);
    assert_eq!(session.tls_cipher_suite(), NO_TLS);

    // The channel itself is encrypted and still usable.
    assert!(session.is_open());
    session.quit().await.unwrap();
    server.await.unwrap();
}
