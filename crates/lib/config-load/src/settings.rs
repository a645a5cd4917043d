//! Lift raw config into fully resolved settings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config_core::{Pick, Secret, SmtpSecurity, TlsMode};

/// Default IMAP folder to watch.
pub const DEFAULT_FOLDER: &str = "INBOX";

/// Default folder for imported messages.
pub const DEFAULT_FOLDER_MOVED: &str = "nowingmail";

/// Default folder for messages that could not be imported.
pub const DEFAULT_FOLDER_QUARANTINE: &str = "imap2gmailquarantine";

/// Default size limit (bytes).
pub const DEFAULT_MAX_MESSAGE_SIZE: u32 = 20_000_000;

/// Default IDLE timeout (seconds).
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;

/// Default reconnect delay (seconds).
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 60;

/// Default SMTP port.
pub const DEFAULT_SMTP_PORT: u16 = 25;

/// Default Google client secrets file name.
pub const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";

/// Default token file name.
pub const DEFAULT_TOKEN_FILE: &str = "token.json";

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Watched IMAP server.
    pub imap: Imap,

    /// Destination Gmail account.
    pub gmail: Gmail,

    /// Operator notifications.
    pub alerts: Alerts,

    /// Delay before reconnecting after a failed session.
    pub retry_delay: Duration,
}

/// Resolved IMAP settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Imap {
    /// Hostname or IP address of the IMAP server.
    pub host: String,

    /// IMAP port.
    pub port: u16,

    /// TLS mode.
    pub tls_mode: TlsMode,

    /// TLS server name (SNI).
    pub tls_server_name: String,

    /// Username for IMAP authentication.
    pub username: String,

    /// Password for IMAP authentication.
    pub password: Secret,

    /// Watched folder.
    pub folder: String,

    /// Folder for imported messages.
    pub folder_moved: String,

    /// Folder for messages that could not be imported.
    pub folder_quarantine: String,

    /// Size gate (bytes).
    pub max_message_size: u32,

    /// Duration of a single IDLE hold.
    pub idle_timeout: Duration,

    /// Message selection order.
    pub pick: Pick,
}

/// Resolved Gmail settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Gmail {
    /// OAuth 2 client secrets file.
    pub credentials_file: PathBuf,

    /// Authorized user token file.
    pub token_file: PathBuf,

    /// Calendar processing of imported messages.
    pub process_for_calendar: bool,
}

/// Resolved alert settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Alerts {
    /// SMTP delivery, if configured.
    pub smtp: Option<Smtp>,
}

/// Resolved SMTP settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Smtp {
    /// SMTP server hostname.
    pub host: String,

    /// SMTP port.
    pub port: u16,

    /// Connection security.
    pub security: SmtpSecurity,

    /// Username and password, when the relay needs them.
    pub credentials: Option<(String, Secret)>,

    /// Sender address.
    pub from: String,

    /// Recipient address.
    pub to: String,
}

/// Errors returned while resolving settings.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The IDLE timeout is zero.
    #[error("imap.idle_timeout_secs must be greater than zero")]
    ZeroIdleTimeout,

    /// A folder name is empty.
    #[error("imap.{field} must not be empty")]
    EmptyFolder {
        /// The offending field.
        field: &'static str,
    },

    /// Two folder roles share one folder.
    #[error("imap.{first} and imap.{second} must name different folders, both are \"{name}\"")]
    SameFolder {
        /// The first field.
        first: &'static str,

        /// The second field.
        second: &'static str,

        /// The shared folder name.
        name: String,
    },

    /// SMTP is configured without sender or recipient.
    #[error("alerts.{field} is required when alerts.smtp is set")]
    MissingAlertAddress {
        /// The missing field.
        field: &'static str,
    },
}

/// Resolve the raw config.
///
/// Relative Gmail file paths are taken relative to `base_dir`, normally the
/// directory of the config file.
pub fn resolve(config: &config_core::Config, base_dir: &Path) -> Result<Settings, ResolveError> {
    let imap = imap(&config.imap)?;
    let gmail = gmail(&config.gmail, base_dir);
    let alerts = alerts(&config.alerts)?;

    Ok(Settings {
        imap,
        gmail,
        alerts,
        retry_delay: Duration::from_secs(
            config.retry_delay_secs.unwrap_or(DEFAULT_RETRY_DELAY_SECS),
        ),
    })
}

/// Default IMAP port for the given TLS mode.
fn default_port(mode: TlsMode) -> u16 {
    match mode {
        TlsMode::Implicit => 993,
        TlsMode::StartTls => 143,
    }
}

/// Resolve the IMAP section.
fn imap(imap: &config_core::ImapConfig) -> Result<Imap, ResolveError> {
    let folder = imap.folder.as_deref().unwrap_or(DEFAULT_FOLDER);
    let folder_moved = imap.folder_moved.as_deref().unwrap_or(DEFAULT_FOLDER_MOVED);
    let folder_quarantine = imap
        .folder_quarantine
        .as_deref()
        .unwrap_or(DEFAULT_FOLDER_QUARANTINE);

    let folders = [
        ("folder", folder),
        ("folder_moved", folder_moved),
        ("folder_quarantine", folder_quarantine),
    ];
    for (field, name) in folders {
        if name.trim().is_empty() {
            return Err(ResolveError::EmptyFolder { field });
        }
    }
    for (i, (first, a)) in folders.iter().enumerate() {
        if let Some((second, _)) = folders[i + 1..].iter().find(|(_, b)| a == b) {
            return Err(ResolveError::SameFolder {
                first,
                second,
                name: (*a).to_owned(),
            });
        }
    }

    let idle_timeout_secs = imap.idle_timeout_secs.unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS);
    if idle_timeout_secs == 0 {
        return Err(ResolveError::ZeroIdleTimeout);
    }

    Ok(Imap {
        host: imap.host.clone(),
        port: imap.port.unwrap_or_else(|| default_port(imap.tls.mode)),
        tls_mode: imap.tls.mode,
        tls_server_name: imap
            .tls
            .server_name
            .clone()
            .unwrap_or_else(|| imap.host.clone()),
        username: imap.username.clone(),
        password: imap.password.clone(),
        folder: folder.to_owned(),
        folder_moved: folder_moved.to_owned(),
        folder_quarantine: folder_quarantine.to_owned(),
        max_message_size: imap.max_message_size.unwrap_or(DEFAULT_MAX_MESSAGE_SIZE),
        idle_timeout: Duration::from_secs(idle_timeout_secs),
        pick: imap.pick.unwrap_or_default(),
    })
}

/// Resolve the Gmail section.
fn gmail(gmail: &config_core::GmailConfig, base_dir: &Path) -> Gmail {
    let file = |value: &Option<PathBuf>, default: &str| {
        let path = value.clone().unwrap_or_else(|| PathBuf::from(default));
        if path.is_absolute() {
            path
        } else {
            base_dir.join(path)
        }
    };

    Gmail {
        credentials_file: file(&gmail.credentials_file, DEFAULT_CREDENTIALS_FILE),
        token_file: file(&gmail.token_file, DEFAULT_TOKEN_FILE),
        process_for_calendar: gmail.process_for_calendar.unwrap_or(true),
    }
}

/// Resolve the alerts section.
fn alerts(alerts: &config_core::AlertsConfig) -> Result<Alerts, ResolveError> {
    let Some(smtp) = &alerts.smtp else {
        return Ok(Alerts { smtp: None });
    };

    let from = alerts
        .from
        .clone()
        .ok_or(ResolveError::MissingAlertAddress { field: "from" })?;
    let to = alerts
        .to
        .clone()
        .ok_or(ResolveError::MissingAlertAddress { field: "to" })?;

    let credentials = match (&smtp.username, &smtp.password) {
        (Some(username), Some(password)) => Some((username.clone(), password.clone())),
        (Some(username), None) => Some((username.clone(), config_core::Secret::new(""))),
        (None, _) => None,
    };

    Ok(Alerts {
        smtp: Some(Smtp {
            host: smtp.host.clone(),
            port: smtp.port.unwrap_or(DEFAULT_SMTP_PORT),
            security: smtp.security,
            credentials,
            from,
            to,
        }),
    })
}
