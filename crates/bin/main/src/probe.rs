//! Startup probe of both ends of the ferry.

use color_eyre::eyre::{Context as _, bail};
use config_load::Settings;
use import_gmail::GmailImporter;
use oauth2_session::TokenStorage;

/// Check that the IMAP account and the Gmail account are reachable.
pub async fn run<S>(settings: &Settings, importer: &GmailImporter<S>) -> color_eyre::eyre::Result<()>
where
    S: TokenStorage + std::fmt::Debug + 'static,
{
    let imap = &settings.imap;

    let mut mailbox = imap_session::open(ferry_service::session_params(imap))
        .await
        .wrap_err_with(|| format!("Failed to open IMAP session on {}", imap.host))?;
    let folders = mailbox
        .list_folders()
        .await
        .wrap_err("Failed to list IMAP folders")?;
    tracing::debug!(?folders, "IMAP folders");

    for folder in [&imap.folder_moved, &imap.folder_quarantine] {
        if !folders.contains(folder) {
            bail!("IMAP folder '{folder}' does not exist on {}", imap.host);
        }
    }

    mailbox
        .logout()
        .await
        .wrap_err("Failed to log out of the IMAP probe session")?;
    tracing::info!(imap_host = %imap.host, folders = folders.len(), "IMAP account reachable");

    let labels = importer
        .list_labels()
        .await
        .wrap_err("Failed to list Gmail labels")?;
    tracing::info!(labels = labels.len(), "Gmail account reachable");

    Ok(())
}
