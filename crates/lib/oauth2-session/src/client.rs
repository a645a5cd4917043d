//! OAuth 2 client built from a Google client secrets file.

use std::path::Path;
use std::time::Duration;

/// The configured OAuth 2 client: authorization and token endpoints set.
pub type Client = oauth2::basic::BasicClient<
    oauth2::EndpointSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointSet,
>;

/// Client registration read from a client secrets file.
#[derive(Clone, serde::Deserialize)]
pub struct ClientSecrets {
    /// Client ID.
    pub client_id: String,

    /// Client secret.
    pub client_secret: String,

    /// Authorization endpoint.
    pub auth_uri: String,

    /// Token endpoint.
    pub token_uri: String,

    /// Registered redirect URIs.
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

impl std::fmt::Debug for ClientSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecrets")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***redacted***")
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .field("redirect_uris", &self.redirect_uris)
            .finish()
    }
}

/// The secrets file layout: one of the application kinds.
#[derive(serde::Deserialize)]
struct SecretsFile {
    /// Desktop application.
    installed: Option<ClientSecrets>,

    /// Web application.
    web: Option<ClientSecrets>,
}

/// Errors returned while reading a client secrets file.
#[derive(Debug, thiserror::Error)]
pub enum ReadSecretsError {
    /// The file could not be read.
    #[error("read {path}: {source}")]
    Io {
        /// The file path.
        path: std::path::PathBuf,

        /// The I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid.
    #[error("parse {path}: {source}")]
    Parse {
        /// The file path.
        path: std::path::PathBuf,

        /// The parse error.
        #[source]
        source: ParseSecretsError,
    },
}

/// Errors returned while parsing client secrets.
#[derive(Debug, thiserror::Error)]
pub enum ParseSecretsError {
    /// Invalid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Neither `installed` nor `web` is present.
    #[error("no \"installed\" or \"web\" client in secrets file")]
    NoClient,
}

/// Errors returned while building the client.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// An endpoint URL is invalid.
    #[error("invalid {field} URL: {source}")]
    Url {
        /// Which URL.
        field: &'static str,

        /// The parse error.
        #[source]
        source: oauth2::url::ParseError,
    },
}

impl ClientSecrets {
    /// Parse the contents of a client secrets file.
    pub fn parse(json: &str) -> Result<Self, ParseSecretsError> {
        let SecretsFile { installed, web } = serde_json::from_str(json)?;
        installed.or(web).ok_or(ParseSecretsError::NoClient)
    }

    /// Read and parse a client secrets file.
    pub async fn read(path: &Path) -> Result<Self, ReadSecretsError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ReadSecretsError::Io {
                path: path.to_owned(),
                source,
            })?;
        Self::parse(&json).map_err(|source| ReadSecretsError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Build the OAuth 2 client. The first registered redirect URI is used, if any.
    pub fn client(&self) -> Result<Client, BuildError> {
        let url_error = |field| move |source| BuildError::Url { field, source };

        let client = oauth2::basic::BasicClient::new(oauth2::ClientId::new(self.client_id.clone()))
            .set_client_secret(oauth2::ClientSecret::new(self.client_secret.clone()))
            .set_auth_uri(oauth2::AuthUrl::new(self.auth_uri.clone()).map_err(url_error("auth"))?)
            .set_token_uri(
                oauth2::TokenUrl::new(self.token_uri.clone()).map_err(url_error("token"))?,
            );

        let client = match self.redirect_uris.first() {
            Some(redirect_uri) => client.set_redirect_uri(
                oauth2::RedirectUrl::new(redirect_uri.clone()).map_err(url_error("redirect"))?,
            ),
            None => client,
        };

        Ok(client)
    }
}

/// Bound on establishing a connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Bound on a whole request, from connect to the last body byte.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Time limits of an HTTP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Connection establishment.
    pub connect: Duration,

    /// Whole request.
    pub request: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: CONNECT_TIMEOUT,
            request: REQUEST_TIMEOUT,
        }
    }
}

/// HTTP client for token and API requests, with the default [`Timeouts`].
pub fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    http_client_with(Timeouts::default())
}

/// HTTP client with the given time limits. Redirects are not followed.
pub fn http_client_with(timeouts: Timeouts) -> Result<reqwest::Client, reqwest::Error> {
    let Timeouts { connect, request } = timeouts;

    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .connect_timeout(connect)
        .timeout(request)
        .build()
}
