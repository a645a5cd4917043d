//! Debounced alert state.

use crate::Signal;

/// A notification the watchdog has to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A failure started.
    Alert {
        /// The failure detail.
        detail: String,
    },

    /// The failure is over.
    Recovered,
}

/// Alert state owned by the watchdog task.
#[derive(Debug, Default)]
pub struct State {
    /// Whether an alert was sent and not yet cleared.
    alerted: bool,
}

impl State {
    /// Whether an alert is outstanding.
    pub fn alerted(&self) -> bool {
        self.alerted
    }

    /// Apply a signal and return the notice to send, if any.
    pub fn apply(&mut self, signal: Signal) -> Option<Notice> {
        match (signal, self.alerted) {
            (Signal::Heartbeat, true) => {
                self.alerted = false;
                Some(Notice::Recovered)
            }
            (Signal::Failure(detail), false) => {
                self.alerted = true;
                Some(Notice::Alert { detail })
            }
            (Signal::Heartbeat, false) | (Signal::Failure(_), true) => None,
        }
    }
}
