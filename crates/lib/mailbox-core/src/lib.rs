//! Core mailbox session abstraction.
//!
//! A [`Mailbox`] is one authenticated session bound to one selected folder.
//! It is owned by a single task and used by one logical actor at a time: the
//! transfer pipeline borrows it mutably, and the idle wait moves it into an
//! [`IdleHold`] that hands it back on [`IdleHold::done`].

use std::future::Future;

pub use tokio_util::sync::CancellationToken;

/// A position-based address of one message in the selected folder.
///
/// Sequence numbers shift after every expunge, so a reference is only valid
/// until the message it points to has been moved away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageRef(pub u32);

impl MessageRef {
    /// The IMAP sequence number.
    pub const fn seq(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for MessageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Envelope and declared size of one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageMeta {
    /// Subject header.
    pub subject: Option<String>,

    /// First sender address.
    pub from: Option<String>,

    /// Message-ID header.
    pub message_id: Option<String>,

    /// Size declared by the server (`RFC822.SIZE`), in bytes.
    pub size: Option<u32>,
}

impl std::fmt::Display for MessageMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unknown = "(unknown)";
        writeln!(f, "Subject: {}", self.subject.as_deref().unwrap_or(unknown))?;
        writeln!(f, "From: {}", self.from.as_deref().unwrap_or(unknown))?;
        writeln!(
            f,
            "Message-ID: {}",
            self.message_id.as_deref().unwrap_or(unknown)
        )?;
        match self.size {
            Some(size) => write!(f, "Size: {size} bytes"),
            None => write!(f, "Size: {unknown}"),
        }
    }
}

/// What ended an idle wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleEvent {
    /// The server pushed a change to the selected folder.
    Update,

    /// The wait observed the stop signal.
    Stopped,
}

/// One authenticated session with a selected folder.
pub trait Mailbox: Send + Sized {
    /// Transport-level error. Every error is fatal for the session.
    type Error: std::error::Error + Send + Sync + 'static;

    /// The idle hold that owns this session while idling.
    type Hold: IdleHold<Mailbox = Self, Error = Self::Error>;

    /// Current number of messages in the selected folder, read from the server.
    fn message_count(&mut self) -> impl Future<Output = Result<u32, Self::Error>> + Send;

    /// Fetch envelope and declared size. `None` if the server returned nothing.
    fn fetch_meta(
        &mut self,
        message: MessageRef,
    ) -> impl Future<Output = Result<Option<MessageMeta>, Self::Error>> + Send;

    /// Fetch the raw message without setting `\Seen`. `None` if the server returned no body.
    fn fetch_body(
        &mut self,
        message: MessageRef,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send;

    /// Copy the message to another folder.
    fn copy(
        &mut self,
        message: MessageRef,
        folder: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Flag the message as `\Deleted`.
    fn mark_deleted(
        &mut self,
        message: MessageRef,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Permanently remove all messages flagged as `\Deleted`.
    fn expunge(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Enter the idle hold. The session is owned by the hold until it is done.
    fn idle(self) -> impl Future<Output = Result<Self::Hold, Self::Error>> + Send;
}

/// A session parked in an idle hold.
pub trait IdleHold: Send + Sized {
    /// The session type handed back by [`IdleHold::done`].
    type Mailbox;

    /// Transport-level error.
    type Error;

    /// Wait until the server pushes an update or `stop` is cancelled.
    ///
    /// Cancelling `stop` must make the in-flight wait return
    /// [`IdleEvent::Stopped`] rather than abandon it.
    fn wait(
        &mut self,
        stop: CancellationToken,
    ) -> impl Future<Output = Result<IdleEvent, Self::Error>> + Send;

    /// Leave the hold and get the session back.
    fn done(self) -> impl Future<Output = Result<Self::Mailbox, Self::Error>> + Send;
}
