//! Dialing an IMAP server.
//!
//! The result of [`connect`] is a client that has read the server greeting
//! over TLS. With [`TlsMode::StartTls`] the greeting is read in plain text,
//! the connection is upgraded and the client starts over on the TLS stream.

pub mod tls;

pub use config_core::TlsMode;

/// The secured byte stream under every session.
pub type Stream = tls::TlsStream;

/// A client that has not logged in yet.
pub type Client = async_imap::Client<Stream>;

/// Where and how to dial.
#[derive(Debug, Clone, PartialEq)]
pub struct Params<'a> {
    /// Server hostname or address.
    pub host: &'a str,

    /// Server port.
    pub port: u16,

    /// When the TLS handshake happens.
    pub tls_mode: TlsMode,

    /// Name the server certificate must match.
    pub tls_server_name: &'a str,
}

/// Failed to dial, by step.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The TCP connection was not established.
    #[error("TCP connect: {0}")]
    Tcp(#[source] std::io::Error),

    /// The TLS client could not be built.
    #[error("TLS setup: {0}")]
    TlsSetup(#[source] tls::SetupError),

    /// The TLS handshake failed.
    #[error(transparent)]
    Handshake(tls::HandshakeError),

    /// Reading the greeting failed.
    #[error("read greeting: {0}")]
    Greeting(#[source] std::io::Error),

    /// The connection closed before the greeting.
    #[error("connection closed before the server greeting")]
    NoGreeting,

    /// The server refused the STARTTLS command.
    #[error("STARTTLS: {0}")]
    StartTls(#[source] async_imap::error::Error),
}

/// Dial the server and read its greeting over TLS.
pub async fn connect(params: Params<'_>) -> Result<Client, Error> {
    let Params {
        host,
        port,
        tls_mode,
        tls_server_name,
    } = params;

    tracing::debug!(
        imap_host = %host,
        imap_port = port,
        ?tls_mode,
        %tls_server_name,
        "dialing IMAP server"
    );

    let tls = tls::Tls::native_roots().map_err(Error::TlsSetup)?;
    let tcp = tokio::net::TcpStream::connect((host, port))
        .await
        .map_err(Error::Tcp)?;

    let tcp = match tls_mode {
        TlsMode::Implicit => tcp,
        TlsMode::StartTls => {
            let mut plain = async_imap::Client::new(tcp);
            greeting(&mut plain).await?;
            plain
                .run_command_and_check_ok("STARTTLS", None)
                .await
                .map_err(Error::StartTls)?;
            tracing::trace!(imap_host = %host, "upgrading to TLS");
            plain.into_inner()
        }
    };

    let stream = tls
        .handshake(tls_server_name, tcp)
        .await
        .map_err(Error::Handshake)?;
    let mut client = async_imap::Client::new(stream);

    // Implicit TLS greets only after the handshake.
    if tls_mode == TlsMode::Implicit {
        greeting(&mut client).await?;
    }

    Ok(client)
}

/// Wait for the untagged greeting that opens every IMAP connection.
async fn greeting<S>(client: &mut async_imap::Client<S>) -> Result<(), Error>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + std::fmt::Debug,
{
    match client.read_response().await {
        Some(Ok(_greeting)) => Ok(()),
        None => Err(Error::NoGreeting),
        Some(Err(error)) => Err(Error::Greeting(error)),
    }
}
