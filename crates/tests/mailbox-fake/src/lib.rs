//! In-memory test doubles for the mailbox, importer and alerter seams, and
//! a scripted HTTP server for the REST clients.

mod alerter;
mod http;
mod importer;
mod mailbox;

pub use alerter::{Alert, RecordingAlerter};
pub use http::{HttpStub, RecordedRequest, StubResponse};
pub use importer::ScriptedImporter;
pub use mailbox::{FakeError, FakeHold, FakeMailbox, FakeMessage, Op, OpKind, Server};

/// Lock a mutex, ignoring poisoning from a panicked test task.
fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
