//! The mailbox watch service.
//!
//! One [`cycle`] opens a session, drains the watched folder, then alternates
//! between an idle wait and another drain until something fails. [`run`]
//! keeps cycles going forever under the supervisor, turning every failure
//! and panic into a watchdog signal.

use std::convert::Infallible;
use std::future::Future;
use std::time::Duration;

use alert_core::Alerter;
use idle_wait::{WaitError, WaitOutcome};
use import_core::Importer;
use mailbox_core::Mailbox;
use transfer::TransferError;

mod settings;

pub use settings::{io_timeout, session_params, transfer_params};

/// Parameters for [`cycle`].
#[derive(Debug)]
pub struct Params<'a, I, A> {
    /// Per-message pipeline settings.
    pub transfer: transfer::Params<'a, I, A>,

    /// Duration of a single idle hold.
    pub idle_timeout: Duration,

    /// Liveness signals.
    pub watchdog: &'a watchdog::Handle,
}

/// Parameters for [`run`].
#[derive(Debug)]
pub struct RunParams<'a, Open, I, A> {
    /// Opens a fresh session for every cycle.
    pub open: Open,

    /// Cycle settings.
    pub cycle: Params<'a, I, A>,

    /// Fixed delay between a failed cycle and the next one.
    pub retry_delay: Duration,
}

/// A failed cycle. The session is dropped with it.
#[derive(Debug, thiserror::Error)]
pub enum CycleError<M, E, OE> {
    /// Opening the session failed.
    #[error("open session: {0}")]
    Open(#[source] OE),

    /// Transferring messages failed.
    #[error("transfer: {0}")]
    Transfer(#[source] TransferError<E>),

    /// The idle wait failed.
    #[error("{0}")]
    Wait(#[source] WaitError<M, E>),
}

/// The [`CycleError`] of a mailbox type.
pub type Error<M, OE> = CycleError<M, <M as Mailbox>::Error, OE>;

/// Open a session and keep it transferring until it fails.
pub async fn cycle<Open, OpenFut, M, OE, I, A>(
    open: &Open,
    params: &Params<'_, I, A>,
) -> Result<Infallible, Error<M, OE>>
where
    Open: Fn() -> OpenFut,
    OpenFut: Future<Output = Result<M, OE>>,
    M: Mailbox,
    I: Importer,
    A: Alerter,
{
    let mut session = open().await.map_err(CycleError::Open)?;

    transfer::drain(&mut session, &params.transfer)
        .await
        .map_err(CycleError::Transfer)?;

    loop {
        let (mut resumed, outcome) = idle_wait::wait(session, params.idle_timeout)
            .await
            .map_err(CycleError::Wait)?;

        match outcome {
            WaitOutcome::NewActivity => tracing::debug!("new activity in watched folder"),
            WaitOutcome::UserTimeout => tracing::trace!("idle hold expired"),
        }
        params.watchdog.heartbeat().await;

        transfer::drain(&mut resumed, &params.transfer)
            .await
            .map_err(CycleError::Transfer)?;
        session = resumed;
    }
}

/// Run cycles forever, reporting every failure to the watchdog.
pub async fn run<Open, OpenFut, M, OE, I, A>(params: RunParams<'_, Open, I, A>) -> Infallible
where
    Open: Fn() -> OpenFut,
    OpenFut: Future<Output = Result<M, OE>>,
    M: Mailbox,
    Error<M, OE>: std::error::Error,
    I: Importer,
    A: Alerter,
{
    let RunParams {
        open,
        cycle: params,
        retry_delay,
    } = params;
    let watchdog = params.watchdog;

    let notifier = |event: supervisor::Event<Error<M, OE>>| async move {
        match event {
            supervisor::Event::Started { attempt } => {
                tracing::info!(attempt, "starting session");
            }
            supervisor::Event::Error {
                error,
                next_retry_in,
            } => {
                tracing::error!(%error, ?next_retry_in, "session failed");
                watchdog.failure(error.to_string()).await;
            }
            supervisor::Event::Panicked {
                panic_payload,
                next_retry_in,
            } => {
                let message = supervisor::panic_message(&panic_payload);
                tracing::error!(%message, ?next_retry_in, "session panicked");
                watchdog.failure(format!("panic: {message}")).await;
            }
        }
    };

    supervisor::run(supervisor::Params {
        work: || cycle(&open, &params),
        notifier,
        sleep: tokio::time::sleep,
        retry_delay,
    })
    .await
}
