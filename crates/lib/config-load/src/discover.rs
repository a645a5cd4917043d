//! Where the config file lives.
//!
//! An explicit path from [`ENV_VAR`] is the only candidate when set.
//! Otherwise the per-user locations come first, then the system-wide one.

use std::path::{Path, PathBuf};

/// The env var that points at an explicit config file.
pub const ENV_VAR: &str = "MAIL_FERRY_CONFIG";

/// Default config locations, most specific first.
pub fn default_locations() -> Vec<PathBuf> {
    let mut locations = Vec::with_capacity(4);
    if let Some(config_dir) = dirs::config_dir() {
        locations.push(config_dir.join("mail-ferry").join("config.yaml"));
        locations.push(config_dir.join("mail-ferry.yaml"));
    }
    if let Some(home_dir) = dirs::home_dir() {
        locations.push(home_dir.join(".mail-ferry.yaml"));
    }
    locations.push(PathBuf::from("/etc/mail-ferry/config.yaml"));
    locations
}

/// The locations to try: the override alone, or the defaults.
pub fn candidates(env_override: Option<PathBuf>) -> Vec<PathBuf> {
    env_override.map_or_else(default_locations, |path| vec![path])
}

/// A config file that was found and read.
#[derive(Debug)]
pub struct Found {
    /// The file.
    pub path: PathBuf,

    /// Its contents.
    pub contents: String,
}

/// No config file could be read.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// None of the candidates exists.
    #[error("no config file at any of {tried:?}")]
    NotFound {
        /// Every candidate, in the order tried.
        tried: Vec<PathBuf>,
    },

    /// A candidate exists but could not be read.
    #[error("read config file {path}: {source}")]
    Read {
        /// The unreadable file.
        path: PathBuf,

        /// The I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Read the first candidate that exists.
///
/// Missing files are skipped; any other I/O error ends the search.
pub async fn read_first(candidates: &[impl AsRef<Path>]) -> Result<Found, ReadError> {
    for candidate in candidates {
        let path = candidate.as_ref();
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => {
                return Ok(Found {
                    path: path.to_owned(),
                    contents,
                });
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(ReadError::Read {
                    path: path.to_owned(),
                    source,
                });
            }
        }
    }

    Err(ReadError::NotFound {
        tried: candidates
            .iter()
            .map(|candidate| candidate.as_ref().to_owned())
            .collect(),
    })
}
