//! OAuth 2 session manager crate.
//!
//! The [`Manager`] hands out access tokens, refreshing them shortly before
//! they expire and writing the refreshed token back to storage.

use std::time::{Duration, SystemTime};

use oauth2::TokenResponse as _;

pub mod client;
pub mod storage;

pub use client::{Client, ClientSecrets};
pub use storage::{Data, FileTokenStorage, LoadError, TokenStorage};

/// Default refresh margin before the access token expires.
pub const DEFAULT_EXPIRATION_TOLERANCE: Duration = Duration::from_secs(60);

/// The error type of a token request.
pub type RequestTokenError = oauth2::RequestTokenError<
    oauth2::HttpClientError<reqwest::Error>,
    oauth2::StandardErrorResponse<oauth2::basic::BasicErrorResponseType>,
>;

/// OAuth 2 session manager.
#[derive(Debug)]
pub struct Manager<S> {
    /// The OAuth 2 client for refreshing the token.
    oauth2_client: Client,

    /// The HTTP client for refreshing the token.
    http_client: reqwest::Client,

    /// OAuth 2 token storage.
    storage: S,

    /// If the token expires in less than this duration, refresh it.
    expiration_tolerance: Duration,

    /// The last loaded or refreshed token.
    current: tokio::sync::Mutex<Option<Data>>,
}

/// An error that can occur while getting a token.
#[derive(Debug, thiserror::Error)]
pub enum GetTokenError<S: TokenStorage> {
    /// Loading the token from storage failed.
    #[error("unable to load token from storage: {0}")]
    StorageLoad(#[source] LoadError<S::LoadError>),

    /// Exchanging the refresh token failed.
    #[error("unable to exchange refresh token: {0}")]
    ExchangeRefreshToken(#[source] RequestTokenError),

    /// Storing the refreshed token failed.
    #[error("unable to store refreshed token: {0}")]
    StorageStore(#[source] S::StoreError),
}

/// Parameters for [`Manager::new`].
#[derive(Debug)]
pub struct Params<S> {
    /// The OAuth 2 client.
    pub oauth2_client: Client,

    /// The HTTP client for token requests.
    pub http_client: reqwest::Client,

    /// Token storage.
    pub storage: S,

    /// Refresh margin before expiry.
    pub expiration_tolerance: Duration,
}

impl<S: TokenStorage> Manager<S> {
    /// Create a manager. Nothing is loaded until the first token request.
    pub fn new(params: Params<S>) -> Self {
        let Params {
            oauth2_client,
            http_client,
            storage,
            expiration_tolerance,
        } = params;

        Self {
            oauth2_client,
            http_client,
            storage,
            expiration_tolerance,
            current: tokio::sync::Mutex::new(None),
        }
    }

    /// Get an up-to-date access token.
    pub async fn access_token(&self) -> Result<String, GetTokenError<S>> {
        let mut current = self.current.lock().await;

        let data = match current.take() {
            Some(data) => data,
            None => self
                .storage
                .load()
                .await
                .map_err(GetTokenError::StorageLoad)?,
        };

        let data = if self.expires_soon(&data) {
            self.refresh(data).await?
        } else {
            data
        };

        let access_token = data.access_token.clone();
        *current = Some(data);
        Ok(access_token)
    }

    /// Force a refresh on the next [`Manager::access_token`] call.
    pub async fn invalidate(&self) {
        if let Some(data) = self.current.lock().await.as_mut() {
            data.expires_at = Some(SystemTime::UNIX_EPOCH);
        }
    }

    /// Whether the token is about to expire.
    fn expires_soon(&self, data: &Data) -> bool {
        data.expires_at
            .is_some_and(|expires_at| SystemTime::now() + self.expiration_tolerance > expires_at)
    }

    /// Exchange the refresh token and store the result.
    async fn refresh(&self, data: Data) -> Result<Data, GetTokenError<S>> {
        tracing::debug!("refreshing access token");

        let response = self
            .oauth2_client
            .exchange_refresh_token(&oauth2::RefreshToken::new(data.refresh_token.clone()))
            .request_async(&self.http_client)
            .await
            .map_err(GetTokenError::ExchangeRefreshToken)?;

        // Providers may omit the refresh token; the old one stays valid then.
        let refresh_token = response
            .refresh_token()
            .map_or(data.refresh_token, |token| token.secret().clone());

        let data = Data {
            access_token: response.access_token().secret().clone(),
            expires_at: response
                .expires_in()
                .map(|expires_in| SystemTime::now() + expires_in),
            refresh_token,
        };

        self.storage
            .store(&data)
            .await
            .map_err(GetTokenError::StorageStore)?;

        tracing::info!("access token refreshed");
        Ok(data)
    }
}

/// Store the token obtained from an authorization code exchange.
pub async fn store_exchanged<S, R>(storage: &S, response: &R) -> Result<Data, S::StoreError>
where
    S: TokenStorage,
    R: oauth2::TokenResponse,
{
    let data = Data {
        access_token: response.access_token().secret().clone(),
        expires_at: response
            .expires_in()
            .map(|expires_in| SystemTime::now() + expires_in),
        refresh_token: response
            .refresh_token()
            .map(|token| token.secret().clone())
            .unwrap_or_default(),
    };
    storage.store(&data).await?;
    Ok(data)
}
