//! Shared configuration types for mail-ferry.
//!
//! These are the raw, as-written configuration values. Optional fields are
//! resolved against their defaults by `config-load`.

mod secret;

pub use secret::Secret;

/// Root configuration.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// The watched IMAP server and its folders.
    pub imap: ImapConfig,

    /// The destination Gmail account.
    pub gmail: GmailConfig,

    /// Operator notifications.
    #[cfg_attr(feature = "serde", serde(default))]
    pub alerts: AlertsConfig,

    /// Delay before reconnecting after a failed session (seconds).
    pub retry_delay_secs: Option<u64>,
}

/// The watched IMAP server.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, PartialEq)]
pub struct ImapConfig {
    /// Hostname or IP address of the IMAP server.
    pub host: String,

    /// Optional port override.
    pub port: Option<u16>,

    /// TLS settings.
    #[cfg_attr(feature = "serde", serde(default))]
    pub tls: TlsConfig,

    /// Username for IMAP authentication.
    pub username: String,

    /// Password for IMAP authentication.
    pub password: Secret,

    /// Folder to watch (e.g. `INBOX`).
    pub folder: Option<String>,

    /// Folder that receives successfully imported messages.
    pub folder_moved: Option<String>,

    /// Folder that receives messages that could not be imported.
    pub folder_quarantine: Option<String>,

    /// Messages declaring a larger size (bytes) are quarantined without import.
    pub max_message_size: Option<u32>,

    /// How long one IDLE hold lasts before it is re-issued (seconds).
    pub idle_timeout_secs: Option<u64>,

    /// Which message of the folder is handled next.
    pub pick: Option<Pick>,
}

/// TLS configuration for the IMAP server.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TlsConfig {
    /// TLS mode.
    #[cfg_attr(feature = "serde", serde(default))]
    pub mode: TlsMode,

    /// Optional override for the TLS server name (SNI).
    pub server_name: Option<String>,
}

/// Supported TLS modes.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum TlsMode {
    /// Implicit TLS (usually port 993).
    #[default]
    Implicit,

    /// STARTTLS upgrade (usually port 143).
    #[cfg_attr(feature = "serde", serde(rename = "starttls", alias = "start_tls"))]
    StartTls,
}

/// Message selection order.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum Pick {
    /// Highest sequence number first.
    #[default]
    Newest,

    /// Lowest sequence number first.
    Oldest,
}

/// Destination Gmail account.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, PartialEq)]
pub struct GmailConfig {
    /// Path to the OAuth 2 client secrets file downloaded from Google.
    pub credentials_file: Option<std::path::PathBuf>,

    /// Path to the file holding the authorized user's tokens.
    pub token_file: Option<std::path::PathBuf>,

    /// Ask Gmail to process imported messages for calendar invites.
    pub process_for_calendar: Option<bool>,
}

/// Operator notification settings.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertsConfig {
    /// Sender address.
    pub from: Option<String>,

    /// Recipient address.
    pub to: Option<String>,

    /// SMTP relay. Alerts are only logged when absent.
    pub smtp: Option<SmtpConfig>,
}

/// SMTP relay settings.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, PartialEq)]
pub struct SmtpConfig {
    /// SMTP server hostname.
    pub host: String,

    /// Optional port override.
    pub port: Option<u16>,

    /// How the SMTP connection is secured.
    #[cfg_attr(feature = "serde", serde(default))]
    pub security: SmtpSecurity,

    /// Optional SMTP username.
    pub username: Option<String>,

    /// Optional SMTP password.
    pub password: Option<Secret>,
}

/// SMTP connection security.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum SmtpSecurity {
    /// Upgrade with STARTTLS when the server offers it.
    #[default]
    Opportunistic,

    /// Require STARTTLS.
    #[cfg_attr(feature = "serde", serde(rename = "starttls", alias = "start_tls"))]
    StartTls,

    /// Implicit TLS (usually port 465).
    Implicit,

    /// Plaintext only, for a relay on localhost.
    None,
}
