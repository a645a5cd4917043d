//! IMAP session manager.
//!
//! [`open`] dials, logs in and selects the watched folder, in that order, and
//! hands out an [`ImapMailbox`]. Every round trip on the session is bounded
//! by the I/O timeout; a timeout is a transport error like any other.
//!
//! [`attach`] does the last step alone for a session that is already logged
//! in over some other [`Transport`].

use std::future::Future;
use std::time::Duration;

mod auth;
mod mailbox;
mod view;

pub use auth::Credentials;
pub use mailbox::{ImapHold, ImapMailbox};

use view::View;

/// A byte stream an IMAP session can run over.
pub trait Transport:
    tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + std::fmt::Debug + Send
{
}

impl<T> Transport for T where
    T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + std::fmt::Debug + Send
{
}

/// The raw async-imap session type.
pub type Session<T = imap_connect::Stream> = async_imap::Session<T>;

/// IMAP session params.
#[derive(Debug, Clone, PartialEq)]
pub struct Params<'a> {
    /// Connect params.
    pub connect: imap_connect::Params<'a>,

    /// Login credentials.
    pub credentials: Credentials<'a>,

    /// Folder to select.
    pub folder: &'a str,

    /// Bound on every round trip, including the dial.
    pub io_timeout: Duration,
}

/// A session-level transport error. Every variant is fatal for the session.
#[derive(Debug, thiserror::Error)]
pub enum OpError {
    /// IMAP protocol or I/O error.
    #[error("IMAP error: {0}")]
    Imap(#[from] async_imap::error::Error),

    /// The server did not answer in time.
    #[error("IMAP operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors returned by the dial step.
#[derive(Debug, thiserror::Error)]
pub enum DialError {
    /// Connect, TLS or greeting failed.
    #[error(transparent)]
    Connect(#[from] imap_connect::Error),

    /// The dial did not finish in time.
    #[error("dial timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors returned while opening a session, tagged by step.
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    /// TCP, TLS or greeting failed.
    #[error("dial: {0}")]
    Dial(#[source] DialError),

    /// Login failed.
    #[error("auth: {0}")]
    Auth(#[source] OpError),

    /// Selecting the folder failed.
    #[error("select {folder}: {source}")]
    Select {
        /// The folder.
        folder: String,

        /// The underlying error.
        #[source]
        source: OpError,
    },

    /// The server does not advertise the IDLE capability.
    #[error("IMAP server does not advertise IDLE capability")]
    IdleNotSupported,
}

/// Connect, log in and select the folder.
pub async fn open(params: Params<'_>) -> Result<ImapMailbox, OpenError> {
    let Params {
        connect,
        credentials,
        folder,
        io_timeout,
    } = params;
    let host = connect.host;

    let client = tokio::time::timeout(io_timeout, imap_connect::connect(connect))
        .await
        .map_err(|_| OpenError::Dial(DialError::Timeout(io_timeout)))?
        .map_err(|err| OpenError::Dial(DialError::Connect(err)))?;

    let session = timed(io_timeout, auth::login(client, credentials))
        .await
        .map_err(OpenError::Auth)?;
    tracing::debug!(imap_host = %host, "logged in");

    attach(session, folder, io_timeout).await
}

/// Check for IDLE support and select the folder on a logged-in session.
pub async fn attach<T: Transport>(
    mut session: Session<T>,
    folder: &str,
    io_timeout: Duration,
) -> Result<ImapMailbox<T>, OpenError> {
    let select = |source| OpenError::Select {
        folder: folder.to_owned(),
        source,
    };

    let capabilities = timed(io_timeout, session.capabilities())
        .await
        .map_err(select)?;
    if !capabilities.has_str("IDLE") {
        return Err(OpenError::IdleNotSupported);
    }

    let selected = timed(io_timeout, session.select(folder))
        .await
        .map_err(select)?;
    tracing::info!(
        imap_folder = %folder,
        exists = selected.exists,
        "session opened"
    );

    // Anything queued before the folder was selected is about no folder.
    while session.unsolicited_responses.try_recv().is_ok() {}

    Ok(ImapMailbox::new(
        session,
        folder.to_owned(),
        View::selected(selected.exists),
        io_timeout,
    ))
}

/// Bound a session round trip by `io_timeout`.
pub(crate) async fn timed<T, E>(
    io_timeout: Duration,
    future: impl Future<Output = Result<T, E>>,
) -> Result<T, OpError>
where
    OpError: From<E>,
{
    match tokio::time::timeout(io_timeout, future).await {
        Ok(result) => result.map_err(OpError::from),
        Err(_elapsed) => Err(OpError::Timeout(io_timeout)),
    }
}
