//! Idle-wait state machine.
//!
//! A wait enters the idle hold and races the server against a timer:
//!
//! ```text
//! Waiting --update--> NewActivity
//! Waiting --timer---> UserTimeout (stop, then drain the in-flight wait)
//! Waiting --error---> WaitError
//! ```
//!
//! Every exit path leaves the hold with `DONE` before returning.

use std::time::Duration;

use mailbox_core::{CancellationToken, IdleEvent, IdleHold as _, Mailbox};

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The server reported a change.
    NewActivity,

    /// The timer fired first.
    UserTimeout,
}

/// Wait failure.
#[derive(Debug, thiserror::Error)]
pub enum WaitError<M, E> {
    /// Entering the idle hold failed. The session is gone.
    #[error("enter idle: {0}")]
    Enter(#[source] E),

    /// The wait failed.
    #[error("idle wait: {source}")]
    Wait {
        /// The wait error.
        #[source]
        source: E,

        /// The session, if leaving the hold still succeeded.
        session: Option<M>,
    },

    /// Leaving the idle hold failed. The session is gone.
    #[error("leave idle: {0}")]
    Done(#[source] E),
}

impl<M, E> WaitError<M, E> {
    /// Take back the session, if it survived.
    pub fn into_session(self) -> Option<M> {
        match self {
            Self::Wait { session, .. } => session,
            Self::Enter(_) | Self::Done(_) => None,
        }
    }
}

/// Wait for server activity or `timeout`, whichever comes first.
///
/// The session is handed back on success and, when possible, on failure.
pub async fn wait<M: Mailbox>(
    session: M,
    timeout: Duration,
) -> Result<(M, WaitOutcome), WaitError<M, M::Error>> {
    let mut hold = session.idle().await.map_err(WaitError::Enter)?;
    tracing::debug!(?timeout, "idle hold entered");

    let raced = race::<M>(&mut hold, timeout).await;
    let done = hold.done().await;

    match (raced, done) {
        (Ok(outcome), Ok(session)) => {
            tracing::debug!(?outcome, "idle hold left");
            Ok((session, outcome))
        }
        (Ok(_), Err(error)) => Err(WaitError::Done(error)),
        (Err(source), Ok(session)) => Err(WaitError::Wait {
            source,
            session: Some(session),
        }),
        (Err(source), Err(done_error)) => {
            tracing::warn!(error = %done_error, "leaving idle after a failed wait also failed");
            Err(WaitError::Wait {
                source,
                session: None,
            })
        }
    }
}

/// Race the hold against the timer; on timeout, stop and drain the wait.
async fn race<M: Mailbox>(hold: &mut M::Hold, timeout: Duration) -> Result<WaitOutcome, M::Error> {
    let stop = CancellationToken::new();
    let wait = hold.wait(stop.clone());
    tokio::pin!(wait);

    tokio::select! {
        event = &mut wait => Ok(match event? {
            IdleEvent::Update => WaitOutcome::NewActivity,
            IdleEvent::Stopped => WaitOutcome::UserTimeout,
        }),
        () = tokio::time::sleep(timeout) => {
            stop.cancel();
            let drained = wait.await?;
            tracing::debug!(?drained, "idle wait drained after timeout");
            Ok(WaitOutcome::UserTimeout)
        }
    }
}
