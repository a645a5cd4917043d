//! Per-message transfer pipeline.
//!
//! One message is handled at a time: read its envelope and declared size,
//! quarantine it if it is too big, otherwise fetch the body and import it with
//! exactly one retry, then file it into the moved or quarantine folder.
//!
//! Filing a message is always COPY, then `\Deleted`, then EXPUNGE. A failure
//! between those steps leaves a duplicate in the destination folder, never a
//! lost message.

use alert_core::Alerter;
use config_core::Pick;
use import_core::{ImportError, Importer};
use mailbox_core::{Mailbox, MessageMeta, MessageRef};

/// Number of import attempts before a message is quarantined.
pub const IMPORT_ATTEMPTS: u32 = 2;

/// Parameters for [`transfer`] and [`drain`].
#[derive(Debug)]
pub struct Params<'a, I, A> {
    /// Destination mail store.
    pub importer: &'a I,

    /// Operator alerts.
    pub alerter: &'a A,

    /// Folder for successfully imported messages.
    pub folder_moved: &'a str,

    /// Folder for messages that could not be imported.
    pub folder_quarantine: &'a str,

    /// Messages with a larger declared size are quarantined without import.
    pub max_message_size: u32,

    /// Which message [`drain`] addresses next.
    pub pick: Pick,
}

/// Why a message was quarantined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuarantineReason {
    /// The declared size is above the limit.
    Oversize,

    /// Every import attempt failed.
    ImportFailed,
}

/// Result of a successful transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Imported and filed into the moved folder.
    Moved,

    /// Filed into the quarantine folder.
    Quarantined(QuarantineReason),
}

/// Failed to file a message into a folder.
#[derive(Debug, thiserror::Error)]
pub enum RouteError<E> {
    /// COPY failed.
    #[error("copy: {0}")]
    Copy(#[source] E),

    /// STORE `+FLAGS (\Deleted)` failed.
    #[error("mark deleted: {0}")]
    MarkDeleted(#[source] E),

    /// EXPUNGE failed.
    #[error("expunge: {0}")]
    Expunge(#[source] E),
}

/// Transfer failure. Every variant is fatal for the session.
#[derive(Debug, thiserror::Error)]
pub enum TransferError<E> {
    /// Reading the message count failed.
    #[error("message count: {0}")]
    Count(#[source] E),

    /// Fetching envelope and size failed.
    #[error("fetch envelope of message {message}: {source}")]
    FetchMeta {
        /// The message.
        message: MessageRef,

        /// The transport error.
        #[source]
        source: E,
    },

    /// The server returned no envelope.
    #[error("no envelope returned for message {message}")]
    MissingMeta {
        /// The message.
        message: MessageRef,
    },

    /// Fetching the body failed.
    #[error("fetch body of message {message}: {source}")]
    FetchBody {
        /// The message.
        message: MessageRef,

        /// The transport error.
        #[source]
        source: E,
    },

    /// The server returned no body.
    #[error("no body returned for message {message}")]
    MissingBody {
        /// The message.
        message: MessageRef,
    },

    /// Filing the message failed.
    #[error("move message {message} to {folder}: {source}")]
    Route {
        /// The message.
        message: MessageRef,

        /// The destination folder.
        folder: String,

        /// The failed step.
        #[source]
        source: RouteError<E>,
    },
}

/// Counts of handled messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    /// Messages imported and moved.
    pub moved: u32,

    /// Messages quarantined.
    pub quarantined: u32,
}

/// Transfer messages until the folder is empty.
///
/// The count is read from the server before every message, so sequence
/// numbers are never reused across expunges.
pub async fn drain<M, I, A>(
    session: &mut M,
    params: &Params<'_, I, A>,
) -> Result<DrainSummary, TransferError<M::Error>>
where
    M: Mailbox,
    I: Importer,
    A: Alerter,
{
    let mut summary = DrainSummary::default();

    loop {
        let count = session
            .message_count()
            .await
            .map_err(TransferError::Count)?;
        if count == 0 {
            break;
        }

        let message = match params.pick {
            Pick::Newest => MessageRef(count),
            Pick::Oldest => MessageRef(1),
        };
        tracing::debug!(%message, count, "next message");

        match transfer(session, message, params).await? {
            Outcome::Moved => summary.moved += 1,
            Outcome::Quarantined(_) => summary.quarantined += 1,
        }
    }

    if summary != DrainSummary::default() {
        tracing::info!(
            moved = summary.moved,
            quarantined = summary.quarantined,
            "folder drained"
        );
    }

    Ok(summary)
}

/// Transfer one message.
///
/// Import failures are handled here and end in quarantine; only transport
/// failures are returned.
pub async fn transfer<M, I, A>(
    session: &mut M,
    message: MessageRef,
    params: &Params<'_, I, A>,
) -> Result<Outcome, TransferError<M::Error>>
where
    M: Mailbox,
    I: Importer,
    A: Alerter,
{
    let meta = session
        .fetch_meta(message)
        .await
        .map_err(|source| TransferError::FetchMeta { message, source })?
        .ok_or(TransferError::MissingMeta { message })?;

    tracing::info!(
        %message,
        size = ?meta.size,
        subject = meta.subject.as_deref().unwrap_or_default(),
        "transferring message"
    );

    if let Some(size) = meta.size
        && size > params.max_message_size
    {
        tracing::warn!(%message, size, max = params.max_message_size, "message too big");
        let body = format!(
            "The message is larger than {} bytes and was moved to {}.\n\n{meta}\n",
            params.max_message_size, params.folder_quarantine,
        );
        params
            .alerter
            .notify("message too big, quarantined", &body)
            .await;
        route(session, message, params.folder_quarantine).await?;
        return Ok(Outcome::Quarantined(QuarantineReason::Oversize));
    }

    let body = session
        .fetch_body(message)
        .await
        .map_err(|source| TransferError::FetchBody { message, source })?
        .ok_or(TransferError::MissingBody { message })?;

    match import(params.importer, &body, message).await {
        Ok(()) => {
            route(session, message, params.folder_moved).await?;
            Ok(Outcome::Moved)
        }
        Err(error) => {
            alert_import_failed(params, &meta, &error).await;
            route(session, message, params.folder_quarantine).await?;
            Ok(Outcome::Quarantined(QuarantineReason::ImportFailed))
        }
    }
}

/// Import with a fixed number of attempts, returning the last error.
async fn import<I: Importer>(
    importer: &I,
    body: &[u8],
    message: MessageRef,
) -> Result<(), ImportError> {
    let mut attempt = 1;
    loop {
        match importer.import(body).await {
            Ok(ack) => {
                tracing::info!(%message, attempt, id = %ack.id, "message imported");
                return Ok(());
            }
            Err(error) => {
                tracing::warn!(
                    %message,
                    attempt,
                    transient = error.is_transient(),
                    %error,
                    "import failed"
                );
                if attempt >= IMPORT_ATTEMPTS {
                    return Err(error);
                }
                attempt += 1;
            }
        }
    }
}

/// Tell the operator a message is being quarantined after failed imports.
async fn alert_import_failed<I, A: Alerter>(
    params: &Params<'_, I, A>,
    meta: &MessageMeta,
    error: &ImportError,
) {
    let body = format!(
        "The message could not be imported after {IMPORT_ATTEMPTS} attempts and was moved to {}.\n\nError: {error}\n\n{meta}\n",
        params.folder_quarantine,
    );
    params
        .alerter
        .notify("import failed, message quarantined", &body)
        .await;
}

/// File a message into `folder`: COPY, `\Deleted`, EXPUNGE.
async fn route<M: Mailbox>(
    session: &mut M,
    message: MessageRef,
    folder: &str,
) -> Result<(), TransferError<M::Error>> {
    let wrap = |source| TransferError::Route {
        message,
        folder: folder.to_owned(),
        source,
    };

    session
        .copy(message, folder)
        .await
        .map_err(|err| wrap(RouteError::Copy(err)))?;
    session
        .mark_deleted(message)
        .await
        .map_err(|err| wrap(RouteError::MarkDeleted(err)))?;
    session
        .expunge()
        .await
        .map_err(|err| wrap(RouteError::Expunge(err)))?;

    tracing::debug!(%message, imap_folder = folder, "message filed");
    Ok(())
}
