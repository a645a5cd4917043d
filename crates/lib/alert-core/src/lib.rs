//! Operator alert interface.
//!
//! Alerts are best effort: implementations log their own delivery failures
//! and never report them back to the caller.

use std::future::Future;

/// Delivers operator notifications.
pub trait Alerter: Send + Sync {
    /// Send a notification.
    fn notify<'a>(&'a self, subject: &'a str, body: &'a str)
    -> impl Future<Output = ()> + Send + 'a;
}

impl<T: Alerter> Alerter for std::sync::Arc<T> {
    fn notify<'a>(
        &'a self,
        subject: &'a str,
        body: &'a str,
    ) -> impl Future<Output = ()> + Send + 'a {
        T::notify(self, subject, body)
    }
}

/// An alerter that only writes alerts to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlerter;

impl Alerter for LogAlerter {
    async fn notify(&self, subject: &str, body: &str) {
        tracing::warn!(%subject, %body, "alert (delivery disabled)");
    }
}
