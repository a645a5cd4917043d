//! [`mailbox_core::Mailbox`] over an async-imap session.

use std::time::Duration;

use async_imap::extensions::idle::{Handle, IdleResponse};
use async_imap::imap_proto::types::Address;
use futures::TryStreamExt as _;
use mailbox_core::{CancellationToken, IdleEvent, MessageMeta, MessageRef};

use crate::view::View;
use crate::{OpError, Session, Transport, timed};

/// An open session with the watched folder selected.
#[derive(Debug)]
pub struct ImapMailbox<T: Transport = imap_connect::Stream> {
    /// The underlying session.
    session: Session<T>,

    /// The selected folder.
    folder: String,

    /// What the session has been told about the folder.
    view: View,

    /// Bound on every round trip.
    io_timeout: Duration,
}

impl<T: Transport> ImapMailbox<T> {
    /// Wrap a session that has `folder` selected.
    pub(crate) fn new(
        session: Session<T>,
        folder: String,
        view: View,
        io_timeout: Duration,
    ) -> Self {
        Self {
            session,
            folder,
            view,
            io_timeout,
        }
    }

    /// Apply queued unsolicited responses to the view.
    fn absorb_unsolicited(&mut self) {
        while let Ok(response) = self.session.unsolicited_responses.try_recv() {
            self.view.apply(&response);
        }
    }

    /// The selected folder.
    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// Names of all folders on the server.
    pub async fn list_folders(&mut self) -> Result<Vec<String>, OpError> {
        let session = &mut self.session;
        let names: Vec<_> = timed(self.io_timeout, async {
            session
                .list(Some(""), Some("*"))
                .await?
                .try_collect()
                .await
        })
        .await?;
        Ok(names.iter().map(|name| name.name().to_owned()).collect())
    }

    /// Log out and close the connection.
    pub async fn logout(mut self) -> Result<(), OpError> {
        timed(self.io_timeout, self.session.logout()).await
    }
}

impl<T: Transport> mailbox_core::Mailbox for ImapMailbox<T> {
    type Error = OpError;
    type Hold = ImapHold<T>;

    async fn message_count(&mut self) -> Result<u32, OpError> {
        timed(self.io_timeout, self.session.noop()).await?;
        self.absorb_unsolicited();
        Ok(self.view.exists())
    }

    async fn fetch_meta(&mut self, message: MessageRef) -> Result<Option<MessageMeta>, OpError> {
        let session = &mut self.session;
        let fetches: Vec<_> = timed(self.io_timeout, async {
            session
                .fetch(message.to_string(), "(ENVELOPE RFC822.SIZE)")
                .await?
                .try_collect()
                .await
        })
        .await?;

        let Some(fetch) = fetches.first() else {
            return Ok(None);
        };

        let envelope = fetch.envelope();
        Ok(Some(MessageMeta {
            subject: envelope
                .and_then(|envelope| envelope.subject.as_deref())
                .map(decode),
            from: envelope
                .and_then(|envelope| envelope.from.as_ref())
                .and_then(|addresses| addresses.first())
                .map(format_address),
            message_id: envelope
                .and_then(|envelope| envelope.message_id.as_deref())
                .map(decode),
            size: fetch.size,
        }))
    }

    async fn fetch_body(&mut self, message: MessageRef) -> Result<Option<Vec<u8>>, OpError> {
        let session = &mut self.session;
        let fetches: Vec<_> = timed(self.io_timeout, async {
            session
                .fetch(message.to_string(), "BODY.PEEK[]")
                .await?
                .try_collect()
                .await
        })
        .await?;

        Ok(fetches
            .iter()
            .find_map(|fetch| fetch.body())
            .map(<[u8]>::to_vec))
    }

    async fn copy(&mut self, message: MessageRef, folder: &str) -> Result<(), OpError> {
        timed(
            self.io_timeout,
            self.session.copy(message.to_string(), folder),
        )
        .await
    }

    async fn mark_deleted(&mut self, message: MessageRef) -> Result<(), OpError> {
        let session = &mut self.session;
        let _updates: Vec<_> = timed(self.io_timeout, async {
            session
                .store(message.to_string(), "+FLAGS.SILENT (\\Deleted)")
                .await?
                .try_collect()
                .await
        })
        .await?;
        Ok(())
    }

    async fn expunge(&mut self) -> Result<(), OpError> {
        let session = &mut self.session;
        let expunged: Vec<_> = timed(self.io_timeout, async {
            session.expunge().await?.try_collect().await
        })
        .await?;
        self.view.expunged(expunged.len());
        tracing::trace!(
            expunged = expunged.len(),
            exists = self.view.exists(),
            "expunged"
        );
        Ok(())
    }

    async fn idle(mut self) -> Result<ImapHold<T>, OpError> {
        self.absorb_unsolicited();
        let Self {
            session,
            folder,
            view,
            io_timeout,
        } = self;

        let mut handle = session.idle();
        timed(io_timeout, handle.init()).await?;

        Ok(ImapHold {
            handle,
            folder,
            view,
            io_timeout,
        })
    }
}

/// A session parked in IMAP IDLE.
#[derive(Debug)]
pub struct ImapHold<T: Transport = imap_connect::Stream> {
    /// The IDLE handle owning the session.
    handle: Handle<T>,

    /// The selected folder.
    folder: String,

    /// What the session has been told about the folder.
    view: View,

    /// Bound on every round trip.
    io_timeout: Duration,
}

impl<T: Transport> mailbox_core::IdleHold for ImapHold<T> {
    type Mailbox = ImapMailbox<T>;
    type Error = OpError;

    async fn wait(&mut self, stop: CancellationToken) -> Result<IdleEvent, OpError> {
        let io_timeout = self.io_timeout;
        let (idle_wait, interrupt) = self.handle.wait();
        tokio::pin!(idle_wait);

        let response = tokio::select! {
            response = &mut idle_wait => response?,
            () = stop.cancelled() => {
                // Dropping the stop source interrupts the wait; its result is still drained.
                drop(interrupt);
                timed(io_timeout, idle_wait).await?
            }
        };

        Ok(match response {
            IdleResponse::NewData(data) => {
                self.view.apply_idle(data.parsed());
                tracing::debug!(response = ?data.parsed(), "idle notified of new data");
                IdleEvent::Update
            }
            IdleResponse::Timeout | IdleResponse::ManualInterrupt => IdleEvent::Stopped,
        })
    }

    async fn done(self) -> Result<ImapMailbox<T>, OpError> {
        let Self {
            handle,
            folder,
            view,
            io_timeout,
        } = self;
        let session = timed(io_timeout, handle.done()).await?;
        Ok(ImapMailbox::new(session, folder, view, io_timeout))
    }
}

/// Decode a header value as lossy UTF-8.
fn decode(value: &[u8]) -> String {
    String::from_utf8_lossy(value).into_owned()
}

/// Format an envelope address as `mailbox@host`, falling back to the display name.
fn format_address(address: &Address<'_>) -> String {
    match (address.mailbox.as_deref(), address.host.as_deref()) {
        (Some(mailbox), Some(host)) => format!("{}@{}", decode(mailbox), decode(host)),
        _ => address.name.as_deref().map(decode).unwrap_or_default(),
    }
}
