//! Starter config written when no config file exists.

use std::path::Path;

/// A commented starter configuration.
pub const TEMPLATE: &str = r#"# mail-ferry configuration.

imap:
  # IMAP server that is watched.
  host: imap.example.com
  # port: 993
  tls:
    mode: implicit # or: starttls
  username: user@example.com
  password: change-me
  # Folder to watch.
  folder: INBOX
  # Folder where imported messages are moved to.
  folder_moved: nowingmail
  # Folder where messages that failed to import are moved to.
  folder_quarantine: imap2gmailquarantine
  # Larger messages (bytes) are quarantined.
  max_message_size: 20000000
  # IDLE timeout (seconds).
  idle_timeout_secs: 300
  # Which message is imported next: newest or oldest.
  pick: newest

gmail:
  # OAuth 2 client secrets file downloaded from Google, relative to this file.
  credentials_file: credentials.json
  # Token file written by gmail-auth, relative to this file.
  token_file: token.json
  # Let Gmail process imported messages for calendar invites.
  process_for_calendar: true

alerts:
  # from: mail-ferry@example.com
  # to: operator@example.com
  # Leave smtp out to only log alerts.
  # smtp:
  #   host: localhost
  #   port: 25
  #   security: opportunistic # or: starttls, implicit, none

# Delay before reconnecting after a failure (seconds).
retry_delay_secs: 60
"#;

/// Write [`TEMPLATE`] to `path`, creating parent directories.
///
/// An existing file is never overwritten.
pub async fn write(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    tokio::io::AsyncWriteExt::write_all(&mut file, TEMPLATE.as_bytes()).await?;
    tokio::io::AsyncWriteExt::flush(&mut file).await
}
