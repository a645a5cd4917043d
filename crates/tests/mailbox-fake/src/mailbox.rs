//! In-memory IMAP server model.
//!
//! A [`Server`] holds folders of messages and an operation log. Sessions opened
//! from it ([`FakeMailbox`]) share that state, so tests can inspect the server
//! after the session has been consumed or dropped.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use mailbox_core::{CancellationToken, IdleEvent, MessageMeta, MessageRef};
use tokio::sync::Notify;

/// One message stored in a fake folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeMessage {
    /// Envelope and declared size returned by `fetch_meta`.
    pub meta: MessageMeta,

    /// Raw body returned by `fetch_body`.
    pub body: Option<Vec<u8>>,

    /// The `\Deleted` flag.
    pub deleted: bool,
}

impl FakeMessage {
    /// A message with the given subject and body; the declared size is the body length.
    pub fn new(subject: &str, body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        let size = u32::try_from(body.len()).unwrap_or(u32::MAX);
        Self {
            meta: MessageMeta {
                subject: Some(subject.to_owned()),
                from: Some("sender@example.com".to_owned()),
                message_id: Some(format!("<{subject}@example.com>")),
                size: Some(size),
            },
            body: Some(body),
            deleted: false,
        }
    }

    /// Override the size the server declares.
    pub fn with_declared_size(mut self, size: u32) -> Self {
        self.meta.size = Some(size);
        self
    }

    /// Make the server return no body for this message.
    pub fn without_body(mut self) -> Self {
        self.body = None;
        self
    }
}

/// Operation kinds, used for fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// Opening a session.
    Open,

    /// Reading the message count.
    Count,

    /// Fetching envelope and size.
    FetchMeta,

    /// Fetching the body.
    FetchBody,

    /// Copying a message.
    Copy,

    /// Setting `\Deleted`.
    MarkDeleted,

    /// Expunging.
    Expunge,

    /// Entering the idle hold.
    IdleInit,

    /// Waiting inside the idle hold.
    IdleWait,

    /// Leaving the idle hold.
    IdleDone,
}

/// A recorded operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// A session was opened.
    Open,

    /// The message count was read.
    Count,

    /// Envelope and size were fetched.
    FetchMeta(u32),

    /// The body was fetched.
    FetchBody(u32),

    /// A message was copied to a folder.
    Copy(u32, String),

    /// A message was flagged `\Deleted`.
    MarkDeleted(u32),

    /// Flagged messages were expunged.
    Expunge,

    /// The idle hold was entered.
    IdleInit,

    /// An idle wait returned.
    IdleWait(IdleEvent),

    /// The idle hold was left.
    IdleDone,
}

/// Errors produced by the fake.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FakeError {
    /// A fault injected by the test.
    #[error("injected failure in {0:?}")]
    Injected(OpKind),

    /// The folder does not exist.
    #[error("no such folder: {0}")]
    NoSuchFolder(String),

    /// The sequence number is out of range.
    #[error("no message with sequence number {0}")]
    NoSuchMessage(u32),

    /// A previous idle hold was never left with `done`.
    #[error("idle hold already active")]
    IdleActive,
}

/// Server state shared by the handle and all sessions.
#[derive(Debug)]
struct State {
    /// Folder contents by name.
    folders: BTreeMap<String, Vec<FakeMessage>>,

    /// The folder sessions select.
    selected: String,

    /// Operations in the order they happened.
    log: Vec<Op>,

    /// One-shot faults, consumed by the next operation of that kind.
    faults: Vec<OpKind>,

    /// Server updates not yet observed by an idle wait.
    pending_updates: usize,

    /// Whether an idle hold is active.
    idling: bool,
}

impl State {
    /// Consume an injected fault for `kind`, if any.
    fn take_fault(&mut self, kind: OpKind) -> Result<(), FakeError> {
        match self.faults.iter().position(|fault| *fault == kind) {
            Some(index) => {
                self.faults.remove(index);
                Err(FakeError::Injected(kind))
            }
            None => Ok(()),
        }
    }

    /// Messages of the selected folder.
    fn selected_mut(&mut self) -> Result<&mut Vec<FakeMessage>, FakeError> {
        let name = self.selected.clone();
        self.folders
            .get_mut(&name)
            .ok_or(FakeError::NoSuchFolder(name))
    }

    /// The message at `message` in the selected folder.
    fn message(&mut self, message: MessageRef) -> Result<&mut FakeMessage, FakeError> {
        let index = usize::try_from(message.seq())
            .ok()
            .and_then(|seq| seq.checked_sub(1))
            .ok_or(FakeError::NoSuchMessage(message.seq()))?;
        self.selected_mut()?
            .get_mut(index)
            .ok_or(FakeError::NoSuchMessage(message.seq()))
    }
}

/// Handle to the in-memory server.
#[derive(Debug, Clone)]
pub struct Server {
    /// Shared state.
    state: Arc<Mutex<State>>,

    /// Wakes idle waits on server updates.
    updates: Arc<Notify>,
}

impl Server {
    /// A server with the given folders; sessions select the first one.
    pub fn new<'a>(folders: impl IntoIterator<Item = &'a str>) -> Self {
        let folders: BTreeMap<String, Vec<FakeMessage>> = folders
            .into_iter()
            .map(|name| (name.to_owned(), Vec::new()))
            .collect();
        Self::with_folders(folders)
    }

    /// A server with the usual `INBOX`, moved and quarantine folders, selecting `INBOX`.
    pub fn standard() -> Self {
        Self::new(["INBOX", "moved", "quarantine"])
    }

    /// Build from prepared folders, selecting `INBOX` when present.
    fn with_folders(folders: BTreeMap<String, Vec<FakeMessage>>) -> Self {
        let selected = if folders.contains_key("INBOX") {
            "INBOX".to_owned()
        } else {
            folders.keys().next().cloned().unwrap_or_default()
        };

        Self {
            state: Arc::new(Mutex::new(State {
                folders,
                selected,
                log: Vec::new(),
                faults: Vec::new(),
                pending_updates: 0,
                idling: false,
            })),
            updates: Arc::new(Notify::new()),
        }
    }

    /// Open a session on the selected folder.
    pub fn open(&self) -> Result<FakeMailbox, FakeError> {
        let mut state = crate::lock(&self.state);
        state.take_fault(OpKind::Open)?;
        if state.idling {
            return Err(FakeError::IdleActive);
        }
        state.log.push(Op::Open);
        Ok(FakeMailbox {
            server: self.clone(),
        })
    }

    /// Store a message in `folder` without notifying.
    pub fn insert(&self, folder: &str, message: FakeMessage) {
        crate::lock(&self.state)
            .folders
            .entry(folder.to_owned())
            .or_default()
            .push(message);
    }

    /// Store a message in the selected folder and push an update to idle waiters.
    pub fn deliver(&self, message: FakeMessage) {
        {
            let mut state = crate::lock(&self.state);
            let selected = state.selected.clone();
            state.folders.entry(selected).or_default().push(message);
        }
        self.push_update();
    }

    /// Push a server update without changing any folder.
    pub fn push_update(&self) {
        crate::lock(&self.state).pending_updates += 1;
        self.updates.notify_one();
    }

    /// Make the next operation of `kind` fail.
    pub fn fail_next(&self, kind: OpKind) {
        crate::lock(&self.state).faults.push(kind);
    }

    /// Number of messages in `folder`.
    pub fn count(&self, folder: &str) -> usize {
        crate::lock(&self.state)
            .folders
            .get(folder)
            .map_or(0, Vec::len)
    }

    /// Contents of `folder`.
    pub fn messages(&self, folder: &str) -> Vec<FakeMessage> {
        crate::lock(&self.state)
            .folders
            .get(folder)
            .cloned()
            .unwrap_or_default()
    }

    /// The operation log.
    pub fn log(&self) -> Vec<Op> {
        crate::lock(&self.state).log.clone()
    }

    /// Clear the operation log.
    pub fn clear_log(&self) {
        crate::lock(&self.state).log.clear();
    }

    /// Whether an idle hold is active.
    pub fn idling(&self) -> bool {
        crate::lock(&self.state).idling
    }

    /// Run `f` on the state, recording `op` unless an injected fault fires first.
    fn apply<T>(
        &self,
        kind: OpKind,
        op: Op,
        f: impl FnOnce(&mut State) -> Result<T, FakeError>,
    ) -> Result<T, FakeError> {
        let mut state = crate::lock(&self.state);
        state.take_fault(kind)?;
        let value = f(&mut state)?;
        state.log.push(op);
        Ok(value)
    }
}

/// A session on the fake server.
#[derive(Debug)]
pub struct FakeMailbox {
    /// The server this session belongs to.
    server: Server,
}

impl FakeMailbox {
    /// The server this session belongs to.
    pub fn server(&self) -> &Server {
        &self.server
    }
}

impl mailbox_core::Mailbox for FakeMailbox {
    type Error = FakeError;
    type Hold = FakeHold;

    async fn message_count(&mut self) -> Result<u32, FakeError> {
        self.server.apply(OpKind::Count, Op::Count, |state| {
            let count = state.selected_mut()?.len();
            Ok(u32::try_from(count).unwrap_or(u32::MAX))
        })
    }

    async fn fetch_meta(&mut self, message: MessageRef) -> Result<Option<MessageMeta>, FakeError> {
        self.server.apply(
            OpKind::FetchMeta,
            Op::FetchMeta(message.seq()),
            |state| Ok(Some(state.message(message)?.meta.clone())),
        )
    }

    async fn fetch_body(&mut self, message: MessageRef) -> Result<Option<Vec<u8>>, FakeError> {
        self.server.apply(
            OpKind::FetchBody,
            Op::FetchBody(message.seq()),
            |state| Ok(state.message(message)?.body.clone()),
        )
    }

    async fn copy(&mut self, message: MessageRef, folder: &str) -> Result<(), FakeError> {
        self.server.apply(
            OpKind::Copy,
            Op::Copy(message.seq(), folder.to_owned()),
            |state| {
                let mut copied = state.message(message)?.clone();
                copied.deleted = false;
                state
                    .folders
                    .get_mut(folder)
                    .ok_or_else(|| FakeError::NoSuchFolder(folder.to_owned()))?
                    .push(copied);
                Ok(())
            },
        )
    }

    async fn mark_deleted(&mut self, message: MessageRef) -> Result<(), FakeError> {
        self.server.apply(
            OpKind::MarkDeleted,
            Op::MarkDeleted(message.seq()),
            |state| {
                state.message(message)?.deleted = true;
                Ok(())
            },
        )
    }

    async fn expunge(&mut self) -> Result<(), FakeError> {
        self.server.apply(OpKind::Expunge, Op::Expunge, |state| {
            state.selected_mut()?.retain(|message| !message.deleted);
            Ok(())
        })
    }

    async fn idle(self) -> Result<FakeHold, FakeError> {
        self.server.apply(OpKind::IdleInit, Op::IdleInit, |state| {
            if state.idling {
                return Err(FakeError::IdleActive);
            }
            state.idling = true;
            Ok(())
        })?;
        Ok(FakeHold {
            server: self.server,
        })
    }
}

/// An idle hold on the fake server.
#[derive(Debug)]
pub struct FakeHold {
    /// The server this hold belongs to.
    server: Server,
}

impl FakeHold {
    /// Take one pending update, or an injected wait fault.
    fn poll_state(&self) -> Result<Option<IdleEvent>, FakeError> {
        let mut state = crate::lock(&self.server.state);
        state.take_fault(OpKind::IdleWait)?;
        if state.pending_updates > 0 {
            state.pending_updates -= 1;
            state.log.push(Op::IdleWait(IdleEvent::Update));
            return Ok(Some(IdleEvent::Update));
        }
        Ok(None)
    }
}

impl mailbox_core::IdleHold for FakeHold {
    type Mailbox = FakeMailbox;
    type Error = FakeError;

    async fn wait(&mut self, stop: CancellationToken) -> Result<IdleEvent, FakeError> {
        loop {
            if let Some(event) = self.poll_state()? {
                return Ok(event);
            }

            tokio::select! {
                () = self.server.updates.notified() => {}
                () = stop.cancelled() => {
                    crate::lock(&self.server.state)
                        .log
                        .push(Op::IdleWait(IdleEvent::Stopped));
                    return Ok(IdleEvent::Stopped);
                }
            }
        }
    }

    async fn done(self) -> Result<FakeMailbox, FakeError> {
        self.server.apply(OpKind::IdleDone, Op::IdleDone, |state| {
            state.idling = false;
            Ok(())
        })?;
        Ok(FakeMailbox {
            server: self.server,
        })
    }
}

#[cfg(test)]
mod tests {
    use mailbox_core::{IdleHold as _, Mailbox as _};

    use super::*;

    #[tokio::test]
    async fn routes_and_expunges() {
        let server = Server::standard();
        server.insert("INBOX", FakeMessage::new("one", "body one"));
        server.insert("INBOX", FakeMessage::new("two", "body two"));

        let mut session = server.open().unwrap();
        session.copy(MessageRef(2), "moved").await.unwrap();
        session.mark_deleted(MessageRef(2)).await.unwrap();
        assert_eq!(session.message_count().await.unwrap(), 2);
        session.expunge().await.unwrap();

        assert_eq!(session.message_count().await.unwrap(), 1);
        assert_eq!(server.messages("moved")[0].meta.subject.as_deref(), Some("two"));
        assert!(!server.messages("moved")[0].deleted);
    }

    #[tokio::test]
    async fn injected_fault_fires_once() {
        let server = Server::standard();
        server.fail_next(OpKind::Count);

        let mut session = server.open().unwrap();
        assert_eq!(
            session.message_count().await,
            Err(FakeError::Injected(OpKind::Count))
        );
        assert_eq!(session.message_count().await, Ok(0));
    }

    #[tokio::test]
    async fn update_pushed_before_wait_is_not_lost() {
        let server = Server::standard();
        let session = server.open().unwrap();
        let mut hold = session.idle().await.unwrap();
        assert!(server.idling());

        server.push_update();
        let event = hold.wait(CancellationToken::new()).await.unwrap();
        assert_eq!(event, IdleEvent::Update);

        let _session = hold.done().await.unwrap();
        assert!(!server.idling());
    }

    #[tokio::test]
    async fn dropped_hold_blocks_new_sessions() {
        let server = Server::standard();
        let hold = server.open().unwrap().idle().await.unwrap();
        drop(hold);

        assert_eq!(server.open().unwrap_err(), FakeError::IdleActive);
    }
}
