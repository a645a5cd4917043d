//! CLI utility for authorizing Gmail access.
//!
//! Prints the consent URL, reads the authorization code (or the whole
//! redirect URL) from stdin and writes the token file named in the config.

use color_eyre::eyre::{Context as _, bail, eyre};
use oauth2::TokenResponse as _;
use oauth2_session::{FileTokenStorage, TokenStorage as _};

/// Run the authorization code flow and store the token.
#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    if std::env::args().len() > 1 {
        bail!("Usage: gmail-auth (config is located like mail-ferry does)");
    }

    let config_load::Loaded { settings, path } = config_load::with_default_env_var().await?;
    let gmail = settings.gmail;

    let secrets = oauth2_session::ClientSecrets::read(&gmail.credentials_file).await?;
    let client = secrets.client()?;
    let http_client =
        oauth2_session::client::http_client().wrap_err("Failed to build the HTTP client")?;

    let (pkce_challenge, pkce_verifier) = oauth2::PkceCodeChallenge::new_random_sha256();
    let (auth_url, csrf_token) = client
        .authorize_url(oauth2::CsrfToken::new_random)
        .add_scopes(
            import_gmail::SCOPES
                .iter()
                .map(|scope| oauth2::Scope::new((*scope).to_owned())),
        )
        .add_extra_param("access_type", "offline")
        .add_extra_param("prompt", "consent")
        .set_pkce_challenge(pkce_challenge)
        .url();

    eprintln!("Using config {}", path.display());
    eprintln!("Open this URL in a browser and grant access:");
    println!("{auth_url}");
    eprintln!("Then paste the authorization code or the full redirect URL here:");

    let input = read_line_from_stdin()?;
    let code = authorization_code(&input, csrf_token.secret())?;

    let response = client
        .exchange_code(oauth2::AuthorizationCode::new(code))
        .set_pkce_verifier(pkce_verifier)
        .request_async(&http_client)
        .await
        .wrap_err("Failed to exchange the authorization code")?;

    if response.refresh_token().is_none() {
        bail!("Google returned no refresh token; revoke the app's access and run gmail-auth again");
    }

    let storage = FileTokenStorage::new(&gmail.token_file);
    oauth2_session::store_exchanged(&storage, &response)
        .await
        .wrap_err("Failed to write the token file")?;

    // Read back what mail-ferry will read.
    storage
        .load()
        .await
        .wrap_err("Failed to read back the token file")?;

    println!("Stored Gmail token in {}", storage.path().display());

    Ok(())
}

/// Read one line from stdin, trimming surrounding whitespace.
fn read_line_from_stdin() -> color_eyre::eyre::Result<String> {
    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .wrap_err("Failed to read the authorization code from stdin")?;

    let input = input.trim().to_owned();
    if input.is_empty() {
        bail!("No authorization code provided on stdin");
    }

    Ok(input)
}

/// Take the code from a pasted redirect URL, or use the input as the code.
fn authorization_code(input: &str, expected_state: &str) -> color_eyre::eyre::Result<String> {
    let Ok(url) = oauth2::url::Url::parse(input) else {
        return Ok(input.to_owned());
    };

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => bail!("Authorization was refused: {value}"),
            _ => {}
        }
    }

    if let Some(state) = state
        && state != expected_state
    {
        bail!("The redirect URL belongs to a different authorization request");
    }

    code.ok_or_else(|| eyre!("The redirect URL carries no authorization code"))
}
