//! The session's own view of the selected folder.

use async_imap::imap_proto::types::{MailboxDatum, Response};
use async_imap::types::UnsolicitedResponse;

/// Message count as announced to this session.
///
/// Sequence numbers are only valid against this count. A fresh `STATUS` may
/// already include messages the session has not been told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct View {
    /// Last known `EXISTS`, adjusted for expunges since.
    exists: u32,
}

impl View {
    /// The view right after `SELECT` reported `exists` messages.
    pub(crate) fn selected(exists: u32) -> Self {
        Self { exists }
    }

    /// Messages visible to the session.
    pub(crate) fn exists(self) -> u32 {
        self.exists
    }

    /// `count` messages left the folder.
    pub(crate) fn expunged(&mut self, count: usize) {
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        self.exists = self.exists.saturating_sub(count);
    }

    /// Apply a response queued outside of a command.
    pub(crate) fn apply(&mut self, response: &UnsolicitedResponse) {
        match response {
            UnsolicitedResponse::Exists(exists) => self.exists = *exists,
            UnsolicitedResponse::Expunge(_) => self.expunged(1),
            _ => {}
        }
    }

    /// Apply a response that ended an idle wait.
    pub(crate) fn apply_idle(&mut self, response: &Response<'_>) {
        match response {
            Response::MailboxData(MailboxDatum::Exists(exists)) => self.exists = *exists,
            Response::Expunge(_) => self.expunged(1),
            _ => {}
        }
    }
}
