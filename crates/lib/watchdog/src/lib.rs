//! Liveness watchdog.
//!
//! The watchdog task owns the alert state and is fed [`Signal`]s through a
//! bounded channel. The first failure raises one alert; further failures are
//! suppressed until a heartbeat clears the condition, which sends one
//! recovery notice. Silence for longer than the configured period counts as
//! a failure.

use std::time::Duration;

use alert_core::Alerter;
use tokio::sync::mpsc;

mod state;

pub use state::{Notice, State};

/// Capacity of the signal channel.
pub const CHANNEL_CAPACITY: usize = 16;

/// Failure detail synthesized when no signal arrives in time.
pub const SILENCE_DETAIL: &str = "timeout";

/// A liveness signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// A wait cycle completed.
    Heartbeat,

    /// The primary loop failed.
    Failure(String),
}

/// Sending side of the signal channel.
#[derive(Debug, Clone)]
pub struct Handle {
    /// The channel sender.
    tx: mpsc::Sender<Signal>,
}

impl Handle {
    /// Report a completed wait cycle.
    pub async fn heartbeat(&self) {
        self.send(Signal::Heartbeat).await;
    }

    /// Report a failure.
    pub async fn failure(&self, detail: impl Into<String>) {
        self.send(Signal::Failure(detail.into())).await;
    }

    /// Send a signal. A stopped watchdog is logged and otherwise ignored.
    pub async fn send(&self, signal: Signal) {
        if let Err(error) = self.tx.send(signal).await {
            tracing::error!(signal = ?error.0, "watchdog is not running");
        }
    }
}

/// Receiving side of the signal channel, consumed by [`run`].
#[derive(Debug)]
pub struct Signals {
    /// The channel receiver.
    rx: mpsc::Receiver<Signal>,
}

impl Signals {
    /// Receive the next signal, or `None` once every [`Handle`] is gone.
    pub async fn recv(&mut self) -> Option<Signal> {
        self.rx.recv().await
    }
}

/// Create the signal channel.
pub fn channel() -> (Handle, Signals) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    (Handle { tx }, Signals { rx })
}

/// Parameters for [`run`].
#[derive(Debug)]
pub struct Params<A> {
    /// Delivers alert and recovery notices.
    pub alerter: A,

    /// Incoming signals.
    pub signals: Signals,

    /// Maximum silence before a failure is assumed.
    pub silence: Duration,
}

/// Run the watchdog until every [`Handle`] is dropped.
pub async fn run<A: Alerter>(params: Params<A>) {
    let Params {
        alerter,
        mut signals,
        silence,
    } = params;
    let mut state = State::default();

    loop {
        let signal = tokio::select! {
            received = signals.recv() => match received {
                Some(signal) => signal,
                None => break,
            },
            () = tokio::time::sleep(silence) => {
                tracing::warn!(?silence, "no liveness signal received");
                Signal::Failure(SILENCE_DETAIL.to_owned())
            }
        };

        tracing::trace!(?signal, alerted = state.alerted(), "watchdog signal");

        if let Some(notice) = state.apply(signal) {
            deliver(&alerter, notice).await;
        }
    }

    tracing::debug!("watchdog stopped");
}

/// Send a notice through the alerter.
async fn deliver<A: Alerter>(alerter: &A, notice: Notice) {
    match notice {
        Notice::Alert { detail } => {
            tracing::error!(%detail, "raising alert");
            let body = format!(
                "mail-ferry stopped transferring messages.\n\nError: {detail}\n\nFurther errors are not reported until it recovers.\n"
            );
            alerter.notify("not working", &body).await;
        }
        Notice::Recovered => {
            tracing::info!("recovered");
            alerter
                .notify("recovered", "mail-ferry is transferring messages again.\n")
                .await;
        }
    }
}
