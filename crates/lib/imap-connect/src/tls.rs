//! TLS client side of the IMAP dial, rustls over the platform trust store.

use std::sync::Arc;

use tokio::net::TcpStream;

/// A TCP stream wrapped in a client TLS session.
pub type TlsStream = tokio_rustls::client::TlsStream<TcpStream>;

/// Failed to build the TLS client configuration.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// The platform trust store yielded no usable certificate.
    #[error("no system root certificates: {0}")]
    RootCerts(#[source] rustls_native_certs::Error),

    /// rustls refused the protocol selection.
    #[error("TLS client config: {0}")]
    Config(#[from] rustls::Error),
}

/// Failed to secure a TCP stream.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// The configured server name is not a valid TLS name.
    #[error("{0:?} is not a valid TLS server name")]
    ServerName(String),

    /// The handshake itself failed, certificate checks included.
    #[error("TLS handshake: {0}")]
    Io(#[source] std::io::Error),
}

/// A TLS client trusting the system root certificates.
#[derive(Clone)]
pub struct Tls {
    /// The rustls connector.
    connector: tokio_rustls::TlsConnector,
}

impl std::fmt::Debug for Tls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tls").finish_non_exhaustive()
    }
}

impl Tls {
    /// Load the system trust store and build the client.
    ///
    /// Unreadable certificates are skipped; only an empty store is an error.
    pub fn native_roots() -> Result<Self, SetupError> {
        let loaded = rustls_native_certs::load_native_certs();
        if loaded.certs.is_empty()
            && let Some(error) = loaded.errors.into_iter().next()
        {
            return Err(SetupError::RootCerts(error));
        }

        let mut roots = rustls::RootCertStore::empty();
        let (added, ignored) = roots.add_parsable_certificates(loaded.certs);
        tracing::trace!(added, ignored, "system root certificates");

        let config = rustls::ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth();

        Ok(Self {
            connector: tokio_rustls::TlsConnector::from(Arc::new(config)),
        })
    }

    /// Run the client handshake on `tcp`, verifying the certificate for `server_name`.
    pub async fn handshake(
        &self,
        server_name: &str,
        tcp: TcpStream,
    ) -> Result<TlsStream, HandshakeError> {
        let name = rustls::pki_types::ServerName::try_from(server_name.to_owned())
            .map_err(|_| HandshakeError::ServerName(server_name.to_owned()))?;
        self.connector
            .connect(name, tcp)
            .await
            .map_err(HandshakeError::Io)
    }
}
