//! OAuth 2 token storage.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// The owned token storage data item.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Data {
    /// The access token.
    pub access_token: String,

    /// When the access token expires.
    pub expires_at: Option<SystemTime>,

    /// The refresh token.
    pub refresh_token: String,
}

/// The load error that can communicate the absence of data.
#[derive(Debug, thiserror::Error)]
pub enum LoadError<Error> {
    /// There is no data available to load.
    #[error("no data: {0}")]
    NoData(#[source] Error),

    /// Internal error has occurred.
    #[error(transparent)]
    Internal(Error),
}

/// Abstract token storage interface.
pub trait TokenStorage: Send + Sync {
    /// The error type for the store operation.
    type StoreError: std::error::Error + Send + Sync + 'static;

    /// The error type for the load operation.
    type LoadError: std::error::Error + Send + Sync + 'static;

    /// Store the data.
    fn store<'a>(
        &'a self,
        data: &'a Data,
    ) -> impl std::future::Future<Output = Result<(), Self::StoreError>> + Send + 'a;

    /// Load stored data.
    fn load(
        &self,
    ) -> impl std::future::Future<Output = Result<Data, LoadError<Self::LoadError>>> + Send + '_;
}

/// Errors from file storage operations.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// File I/O failed.
    #[error("token file {path}: {source}")]
    Io {
        /// The file path.
        path: PathBuf,

        /// The I/O error.
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failed.
    #[error("token file {path}: invalid JSON: {source}")]
    Json {
        /// The file path.
        path: PathBuf,

        /// The JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Token storage in a JSON file, readable only by the owner.
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    /// The token file.
    path: PathBuf,
}

impl FileTokenStorage {
    /// Storage at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The token file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wrap an I/O error with the path.
    fn io(&self, source: std::io::Error) -> FileError {
        FileError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl TokenStorage for FileTokenStorage {
    type StoreError = FileError;
    type LoadError = FileError;

    async fn store<'a>(&'a self, data: &'a Data) -> Result<(), FileError> {
        let json = serde_json::to_vec_pretty(data).map_err(|source| FileError::Json {
            path: self.path.clone(),
            source,
        })?;

        let mut tmp_path = self.path.clone().into_os_string();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&tmp_path).await.map_err(|err| self.io(err))?;
        tokio::io::AsyncWriteExt::write_all(&mut file, &json)
            .await
            .map_err(|err| self.io(err))?;
        file.sync_all().await.map_err(|err| self.io(err))?;
        drop(file);

        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|err| self.io(err))?;

        tracing::debug!(path = %self.path.display(), "token stored");
        Ok(())
    }

    async fn load(&self) -> Result<Data, LoadError<FileError>> {
        let json = tokio::fs::read(&self.path).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                LoadError::NoData(self.io(err))
            } else {
                LoadError::Internal(self.io(err))
            }
        })?;

        serde_json::from_slice(&json).map_err(|source| {
            LoadError::Internal(FileError::Json {
                path: self.path.clone(),
                source,
            })
        })
    }
}
