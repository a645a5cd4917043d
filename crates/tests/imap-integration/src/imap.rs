//! Plain-text IMAP sessions against the container.

use std::time::Duration;

use tokio::net::TcpStream;

/// How long the server gets to start accepting logins.
const READY_DEADLINE: Duration = Duration::from_secs(15);

/// Pause between login attempts while the server starts.
const READY_POLL: Duration = Duration::from_millis(250);

/// Round-trip bound for mailboxes opened by the harness.
const IO_TIMEOUT: Duration = Duration::from_secs(30);

/// A logged-in session without TLS.
pub type PlainSession = async_imap::Session<TcpStream>;

/// Log in once over plain TCP.
async fn login(host: &str, port: u16, user: &str, password: &str) -> std::io::Result<PlainSession> {
    let mut client = async_imap::Client::new(TcpStream::connect((host, port)).await?);

    if client.read_response().await.transpose()?.is_none() {
        return Err(std::io::Error::other("connection closed before the greeting"));
    }

    client
        .login(user, password)
        .await
        .map_err(|(error, _client)| std::io::Error::other(error))
}

/// Log in over plain TCP, polling until the server accepts or the deadline passes.
pub async fn connect_with_retry(
    host: &str,
    port: u16,
    user: &str,
    password: &str,
) -> std::io::Result<PlainSession> {
    let deadline = tokio::time::Instant::now() + READY_DEADLINE;

    loop {
        match login(host, port, user, password).await {
            Ok(session) => return Ok(session),
            Err(error) if tokio::time::Instant::now() >= deadline => return Err(error),
            Err(_not_ready) => tokio::time::sleep(READY_POLL).await,
        }
    }
}

/// Log in and select `folder` as a watched mailbox.
pub async fn open_mailbox(
    host: &str,
    port: u16,
    user: &str,
    password: &str,
    folder: &str,
) -> Result<imap_session::ImapMailbox<TcpStream>, Box<dyn std::error::Error + Send + Sync>> {
    let session = connect_with_retry(host, port, user, password).await?;
    Ok(imap_session::attach(session, folder, IO_TIMEOUT).await?)
}
