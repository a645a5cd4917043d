//! Gmail importer over the Gmail REST API.
//!
//! A message is imported with a media upload, then labelled `INBOX` and
//! `UNREAD` so it shows up like delivered mail.

use import_core::{ImportAck, ImportError};
use oauth2_session::{GetTokenError, Manager, TokenStorage};

/// OAuth 2 scopes the importer needs.
pub const SCOPES: [&str; 3] = [
    "https://www.googleapis.com/auth/gmail.labels",
    "https://www.googleapis.com/auth/gmail.modify",
    "https://www.googleapis.com/auth/gmail.insert",
];

/// The Gmail API base URL.
pub const DEFAULT_API_BASE: &str = "https://gmail.googleapis.com";

/// Labels added to every imported message.
const LABELS: [&str; 2] = ["INBOX", "UNREAD"];

/// Parameters for [`GmailImporter::new`].
#[derive(Debug)]
pub struct Params<S> {
    /// HTTP client for API requests.
    pub http_client: reqwest::Client,

    /// Access token source.
    pub tokens: Manager<S>,

    /// API base URL, without a trailing slash.
    pub api_base: String,

    /// Let Gmail process calendar invites in imported messages.
    pub process_for_calendar: bool,
}

/// Imports messages into a Gmail mailbox.
#[derive(Debug)]
pub struct GmailImporter<S> {
    /// HTTP client for API requests.
    http_client: reqwest::Client,

    /// Access token source.
    tokens: Manager<S>,

    /// API base URL.
    api_base: String,

    /// Let Gmail process calendar invites.
    process_for_calendar: bool,
}

/// A failed API request.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// No access token could be obtained.
    #[error("access token: {source}")]
    Token {
        /// Whether the token source failed on the network.
        transient: bool,

        /// The token error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The request did not complete.
    #[error("{operation}: request failed: {source}")]
    Http {
        /// The API operation.
        operation: &'static str,

        /// The transport error.
        #[source]
        source: reqwest::Error,
    },

    /// A success response carried a body that is not the expected JSON.
    #[error("{operation}: malformed response: {source}")]
    Decode {
        /// The API operation.
        operation: &'static str,

        /// The decoding error.
        #[source]
        source: serde_json::Error,
    },

    /// The API answered with an error status.
    #[error("{operation}: HTTP {status}: {body}")]
    Status {
        /// The API operation.
        operation: &'static str,

        /// The response status.
        status: reqwest::StatusCode,

        /// The response body.
        body: String,
    },
}

impl RequestError {
    /// Whether retrying later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Token { transient, .. } => *transient,
            Self::Http { .. } => true,
            Self::Decode { .. } => false,
            Self::Status { status, .. } => is_transient_status(*status),
        }
    }
}

impl From<RequestError> for ImportError {
    fn from(error: RequestError) -> Self {
        if error.is_transient() {
            Self::Transient(Box::new(error))
        } else {
            Self::Permanent(Box::new(error))
        }
    }
}

/// Throttling, server faults and expired credentials are worth retrying.
pub fn is_transient_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::UNAUTHORIZED
        || status.is_server_error()
}

/// The message resource returned by import.
#[derive(Debug, serde::Deserialize)]
struct Message {
    /// Message ID.
    id: String,
}

/// The label list response.
#[derive(Debug, serde::Deserialize)]
struct LabelList {
    /// Labels, absent when there are none.
    #[serde(default)]
    labels: Vec<Label>,
}

/// One label.
#[derive(Debug, serde::Deserialize)]
struct Label {
    /// Display name.
    name: String,
}

impl<S: TokenStorage + std::fmt::Debug + 'static> GmailImporter<S> {
    /// Create an importer.
    pub fn new(params: Params<S>) -> Self {
        let Params {
            http_client,
            tokens,
            api_base,
            process_for_calendar,
        } = params;

        Self {
            http_client,
            tokens,
            api_base,
            process_for_calendar,
        }
    }

    /// Names of all labels in the mailbox.
    pub async fn list_labels(&self) -> Result<Vec<String>, RequestError> {
        let operation = "list labels";
        let url = format!("{}/gmail/v1/users/me/labels", self.api_base);
        let request = self.http_client.get(url);
        let list: LabelList = self.send(operation, request).await?;
        Ok(list.labels.into_iter().map(|label| label.name).collect())
    }

    /// Import a raw message and label it.
    async fn import_and_label(&self, raw: &[u8]) -> Result<ImportAck, RequestError> {
        let url = format!(
            "{}/upload/gmail/v1/users/me/messages/import",
            self.api_base
        );
        let request = self
            .http_client
            .post(url)
            .query(&[
                ("uploadType", "media"),
                (
                    "processForCalendar",
                    if self.process_for_calendar {
                        "true"
                    } else {
                        "false"
                    },
                ),
            ])
            .header(reqwest::header::CONTENT_TYPE, "message/rfc822")
            .body(raw.to_vec());
        let message: Message = self.send("import", request).await?;
        tracing::debug!(gmail_id = %message.id, size = raw.len(), "message uploaded");

        let url = format!(
            "{}/gmail/v1/users/me/messages/{}/modify",
            self.api_base, message.id
        );
        let request = self
            .http_client
            .post(url)
            .json(&serde_json::json!({ "addLabelIds": LABELS }));
        let _labelled: Message = self.send("modify labels", request).await?;

        Ok(ImportAck { id: message.id })
    }

    /// Authorize and send a request, decoding a JSON response.
    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, RequestError> {
        let access_token = self
            .tokens
            .access_token()
            .await
            .map_err(token_error::<S>)?;

        let http = |source| RequestError::Http { operation, source };

        let response = request
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::UNAUTHORIZED {
                self.tokens.invalidate().await;
            }
            return Err(RequestError::Status {
                operation,
                status,
                body,
            });
        }

        let body = response.bytes().await.map_err(http)?;
        serde_json::from_slice(&body).map_err(|source| RequestError::Decode { operation, source })
    }
}

/// Classify a token error: storage problems need the operator, the rest may pass.
fn token_error<S>(error: GetTokenError<S>) -> RequestError
where
    S: TokenStorage + std::fmt::Debug + 'static,
{
    let transient = match &error {
        GetTokenError::StorageLoad(_) | GetTokenError::StorageStore(_) => false,
        GetTokenError::ExchangeRefreshToken(error) => {
            !matches!(error, oauth2::RequestTokenError::ServerResponse(_))
        }
    };
    RequestError::Token {
        transient,
        source: Box::new(error),
    }
}

impl<S: TokenStorage + std::fmt::Debug + 'static> import_core::Importer for GmailImporter<S> {
    async fn import(&self, raw: &[u8]) -> Result<ImportAck, ImportError> {
        self.import_and_label(raw).await.map_err(ImportError::from)
    }
}
