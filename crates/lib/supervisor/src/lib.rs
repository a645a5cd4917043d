//! Lightweight async harness that keeps a piece of work running forever.
//!
//! The work is expected to run until it fails. Errors and panics are reported
//! to the notifier, then the work is restarted after a fixed delay.

#![no_std]

extern crate alloc;

use core::convert::Infallible;
use core::future::Future;
use core::time::Duration;
use futures_util::FutureExt;

/// The panic payload type alias.
pub type PanicPayload = alloc::boxed::Box<dyn core::any::Any + Send + 'static>;

/// Event sent to the notifier.
#[derive(Debug)]
pub enum Event<E> {
    /// The work is about to be invoked.
    Started {
        /// One-based attempt counter.
        attempt: u64,
    },

    /// The work returned an error.
    Error {
        /// The error that was returned by the work future.
        error: E,

        /// The time to wait before the next attempt.
        next_retry_in: Duration,
    },

    /// The work panicked.
    Panicked {
        /// The captured panic payload.
        panic_payload: PanicPayload,

        /// The time to wait before the next attempt.
        next_retry_in: Duration,
    },
}

/// Parameters for [`run`].
pub struct Params<Work, Notifier, Sleep> {
    /// Produces the work future for each attempt.
    pub work: Work,

    /// Notifier for events.
    pub notifier: Notifier,

    /// Sleep timer.
    pub sleep: Sleep,

    /// Fixed delay between a failure and the next attempt.
    pub retry_delay: Duration,
}

/// Run the work forever, restarting it after every error or panic.
pub async fn run<Work, WorkFut, Notifier, NotifierFut, Sleep, SleepFut, Error>(
    mut params: Params<Work, Notifier, Sleep>,
) -> Infallible
where
    Work: FnMut() -> WorkFut,
    WorkFut: Future<Output = Result<Infallible, Error>>,
    Notifier: FnMut(Event<Error>) -> NotifierFut,
    NotifierFut: Future<Output = ()>,
    Sleep: FnMut(Duration) -> SleepFut,
    SleepFut: Future<Output = ()>,
{
    let mut attempt: u64 = 0;

    loop {
        attempt = attempt.saturating_add(1);
        (params.notifier)(Event::Started { attempt }).await;

        // Run the work and catch panics coming from the future.
        let work_future = core::panic::AssertUnwindSafe(async { (params.work)().await });
        let next_retry_in = params.retry_delay;

        let event = match work_future.catch_unwind().await {
            Ok(Ok(never)) => match never {},
            Ok(Err(error)) => Event::Error {
                error,
                next_retry_in,
            },
            Err(panic_payload) => Event::Panicked {
                panic_payload,
                next_retry_in,
            },
        };
        (params.notifier)(event).await;

        (params.sleep)(next_retry_in).await;
    }
}

/// Extract a human readable message from a panic payload.
pub fn panic_message(payload: &PanicPayload) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        return message;
    }
    if let Some(message) = payload.downcast_ref::<alloc::string::String>() {
        return message.as_str();
    }
    "non-string panic payload"
}
