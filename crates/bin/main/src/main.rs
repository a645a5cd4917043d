//! mail-ferry daemon.

use color_eyre::eyre::{Context as _, eyre};
use oauth2_session::FileTokenStorage;
use tracing_subscriber::EnvFilter;

mod alerter;
mod probe;

/// Load config, probe both accounts, then ferry messages forever.
#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Some(config_load::Loaded { settings, path }) = load_config().await? else {
        return Ok(());
    };
    tracing::info!(config = %path.display(), "config loaded");

    let alerter = alerter::Alerter::new(&settings.alerts).wrap_err("Invalid alert settings")?;
    let importer = gmail_importer(&settings.gmail).await?;

    probe::run(&settings, &importer).await?;
    alert_core::Alerter::notify(&alerter, "started", "mail-ferry started.\n").await;

    let (watchdog, signals) = watchdog::channel();
    tokio::spawn(watchdog::run(watchdog::Params {
        alerter: alerter.clone(),
        signals,
        silence: settings.imap.idle_timeout.saturating_mul(2),
    }));

    let session = ferry_service::session_params(&settings.imap);
    let never = ferry_service::run(ferry_service::RunParams {
        open: || imap_session::open(session.clone()),
        cycle: ferry_service::Params {
            transfer: ferry_service::transfer_params(&settings.imap, &importer, &alerter),
            idle_timeout: settings.imap.idle_timeout,
            watchdog: &watchdog,
        },
        retry_delay: settings.retry_delay,
    })
    .await;

    match never {}
}

/// Load the config; when there is none, write a template and return `None`.
async fn load_config() -> color_eyre::eyre::Result<Option<config_load::Loaded>> {
    let tried = match config_load::with_default_env_var().await {
        Ok(loaded) => return Ok(Some(loaded)),
        Err(config_load::WithDefaultEnvVarError::Load(config_load::LoadError::Read(
            config_load::discover::ReadError::NotFound { tried },
        ))) => tried,
        Err(error) => return Err(error.into()),
    };

    let path = tried
        .first()
        .ok_or_else(|| eyre!("No config file location available"))?;
    config_load::template::write(path)
        .await
        .wrap_err_with(|| format!("Failed to write config template to {}", path.display()))?;

    eprintln!(
        "No config found. A template was written to {}; edit it and start mail-ferry again.",
        path.display()
    );

    Ok(None)
}

/// Build the Gmail importer from the client secrets and the token file.
async fn gmail_importer(
    gmail: &config_load::settings::Gmail,
) -> color_eyre::eyre::Result<import_gmail::GmailImporter<FileTokenStorage>> {
    let secrets = oauth2_session::ClientSecrets::read(&gmail.credentials_file).await?;
    let http_client =
        oauth2_session::client::http_client().wrap_err("Failed to build the HTTP client")?;

    let tokens = oauth2_session::Manager::new(oauth2_session::Params {
        oauth2_client: secrets.client()?,
        http_client: http_client.clone(),
        storage: FileTokenStorage::new(&gmail.token_file),
        expiration_tolerance: oauth2_session::DEFAULT_EXPIRATION_TOLERANCE,
    });

    Ok(import_gmail::GmailImporter::new(import_gmail::Params {
        http_client,
        tokens,
        api_base: import_gmail::DEFAULT_API_BASE.to_owned(),
        process_for_calendar: gmail.process_for_calendar,
    }))
}
