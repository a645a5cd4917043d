//! Operator alerts delivered over SMTP.

use std::time::Duration;

use config_core::SmtpSecurity;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport as _, Message, Tokio1Executor};

/// Prefix of every alert subject.
pub const SUBJECT_PREFIX: &str = "[mail-ferry] ";

/// Bound on one SMTP delivery.
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// SMTP alerter params.
#[derive(Debug, Clone)]
pub struct Params<'a> {
    /// SMTP server hostname.
    pub host: &'a str,

    /// SMTP port.
    pub port: u16,

    /// Connection security.
    pub security: SmtpSecurity,

    /// Username and password, if the relay needs them.
    pub credentials: Option<(&'a str, &'a str)>,

    /// Sender address.
    pub from: &'a str,

    /// Recipient address.
    pub to: &'a str,
}

/// Errors returned while building the alerter.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// An address does not parse.
    #[error("invalid {field} address {value:?}: {source}")]
    Address {
        /// Which address.
        field: &'static str,

        /// The configured value.
        value: String,

        /// The parse error.
        #[source]
        source: lettre::address::AddressError,
    },

    /// TLS parameters could not be built.
    #[error("TLS parameters: {0}")]
    Tls(#[source] lettre::transport::smtp::Error),
}

/// Errors returned while sending one alert.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The message could not be built.
    #[error("build message: {0}")]
    Message(#[from] lettre::error::Error),

    /// SMTP delivery failed.
    #[error("SMTP: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Sends alerts as plain text e-mails.
#[derive(Clone)]
pub struct SmtpAlerter {
    /// The SMTP transport.
    transport: AsyncSmtpTransport<Tokio1Executor>,

    /// Sender.
    from: Mailbox,

    /// Recipient.
    to: Mailbox,
}

impl std::fmt::Debug for SmtpAlerter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpAlerter")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

impl SmtpAlerter {
    /// Build the alerter. Addresses are validated here, not on first use.
    pub fn new(params: Params<'_>) -> Result<Self, BuildError> {
        let Params {
            host,
            port,
            security,
            credentials,
            from,
            to,
        } = params;

        let from = parse_mailbox("from", from)?;
        let to = parse_mailbox("to", to)?;

        let parameters = || TlsParameters::new(host.to_owned()).map_err(BuildError::Tls);
        let tls = match security {
            SmtpSecurity::None => Tls::None,
            SmtpSecurity::Opportunistic => Tls::Opportunistic(parameters()?),
            SmtpSecurity::StartTls => Tls::Required(parameters()?),
            SmtpSecurity::Implicit => Tls::Wrapper(parameters()?),
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .tls(tls)
            .timeout(Some(SEND_TIMEOUT));
        if let Some((username, password)) = credentials {
            builder = builder.credentials(Credentials::new(username.to_owned(), password.to_owned()));
        }

        tracing::debug!(smtp_host = %host, smtp_port = port, ?security, "SMTP alerts enabled");

        Ok(Self {
            transport: builder.build(),
            from,
            to,
        })
    }

    /// Build the alert e-mail.
    pub fn message(&self, subject: &str, body: &str) -> Result<Message, lettre::error::Error> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(format!("{SUBJECT_PREFIX}{subject}"))
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_owned())
    }

    /// Send one alert.
    pub async fn send(&self, subject: &str, body: &str) -> Result<(), SendError> {
        let message = self.message(subject, body)?;
        self.transport.send(message).await?;
        Ok(())
    }
}

impl alert_core::Alerter for SmtpAlerter {
    async fn notify(&self, subject: &str, body: &str) {
        tracing::info!(%subject, "sending alert");
        if let Err(error) = self.send(subject, body).await {
            tracing::error!(%subject, %error, "failed to send alert");
        }
    }
}

/// Parse an address, tagging errors with the field.
fn parse_mailbox(field: &'static str, value: &str) -> Result<Mailbox, BuildError> {
    value.parse().map_err(|source| BuildError::Address {
        field,
        value: value.to_owned(),
        source,
    })
}
