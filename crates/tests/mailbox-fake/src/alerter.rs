//! Alerter that records every notification.

use std::sync::{Arc, Mutex};

/// One recorded notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Subject line.
    pub subject: String,

    /// Body text.
    pub body: String,
}

/// Records notifications instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct RecordingAlerter {
    /// Recorded notifications, shared between clones.
    alerts: Arc<Mutex<Vec<Alert>>>,
}

impl RecordingAlerter {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications so far.
    pub fn alerts(&self) -> Vec<Alert> {
        crate::lock(&self.alerts).clone()
    }

    /// Subjects of all notifications so far.
    pub fn subjects(&self) -> Vec<String> {
        crate::lock(&self.alerts)
            .iter()
            .map(|alert| alert.subject.clone())
            .collect()
    }
}

impl alert_core::Alerter for RecordingAlerter {
    async fn notify(&self, subject: &str, body: &str) {
        crate::lock(&self.alerts).push(Alert {
            subject: subject.to_owned(),
            body: body.to_owned(),
        });
    }
}
