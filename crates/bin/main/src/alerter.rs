//! Alert delivery selected by config.

use alert_core::{Alerter as _, LogAlerter};
use alert_smtp::SmtpAlerter;

/// The configured alerter.
#[derive(Debug, Clone)]
pub enum Alerter {
    /// Mail alerts through an SMTP relay.
    Smtp(SmtpAlerter),

    /// No relay configured; alerts only reach the log.
    Log(LogAlerter),
}

impl Alerter {
    /// Build the alerter for the resolved alert settings.
    pub fn new(alerts: &config_load::settings::Alerts) -> Result<Self, alert_smtp::BuildError> {
        let Some(smtp) = &alerts.smtp else {
            tracing::warn!("no SMTP relay configured, alerts are only logged");
            return Ok(Self::Log(LogAlerter));
        };

        let alerter = SmtpAlerter::new(alert_smtp::Params {
            host: &smtp.host,
            port: smtp.port,
            security: smtp.security,
            credentials: smtp
                .credentials
                .as_ref()
                .map(|(username, password)| (username.as_str(), password.expose())),
            from: &smtp.from,
            to: &smtp.to,
        })?;
        tracing::info!(
            smtp_host = %smtp.host,
            smtp_port = smtp.port,
            to = %smtp.to,
            "alerts go out by mail"
        );

        Ok(Self::Smtp(alerter))
    }
}

impl alert_core::Alerter for Alerter {
    async fn notify(&self, subject: &str, body: &str) {
        match self {
            Self::Smtp(alerter) => alerter.notify(subject, body).await,
            Self::Log(alerter) => alerter.notify(subject, body).await,
        }
    }
}
