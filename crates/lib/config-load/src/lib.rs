//! Configuration loading for mail-ferry.
//!
//! The config file is located (env override or default paths), parsed from
//! YAML and resolved into [`Settings`] with all defaults applied.

use std::path::{Path, PathBuf};

pub mod discover;
pub mod settings;
pub mod template;

pub use settings::{ResolveError, Settings};

/// A convenience type-alias for the YAML parser error type.
pub type YamlError = serde_yaml_bw::Error;

/// Errors returned while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Failed to locate or read the config file.
    #[error(transparent)]
    Read(discover::ReadError),

    /// Failed to parse the YAML contents.
    #[error("failed to parse YAML config {path}: {source}")]
    Parse {
        /// Path to the configuration file.
        path: PathBuf,

        /// Underlying YAML parse error.
        #[source]
        source: YamlError,
    },

    /// The parsed config is not usable.
    #[error("invalid config {path}: {source}")]
    Resolve {
        /// Path to the configuration file.
        path: PathBuf,

        /// Underlying validation error.
        #[source]
        source: ResolveError,
    },
}

/// Loaded settings with the file they came from.
#[derive(Debug)]
pub struct Loaded {
    /// The resolved settings.
    pub settings: Settings,

    /// The config file path.
    pub path: PathBuf,
}

/// Parse configuration directly from a YAML string.
pub fn parse_str(contents: &str) -> Result<config_core::Config, YamlError> {
    serde_yaml_bw::from_str(contents)
}

/// Load from the first existing path among `env_path` or the defaults.
pub async fn with(env_path: Option<PathBuf>) -> Result<Loaded, LoadError> {
    let candidates = discover::candidates(env_path);
    let found = discover::read_first(&candidates)
        .await
        .map_err(LoadError::Read)?;
    from_found(found)
}

/// Load from exactly one path.
pub async fn from_path(path: impl AsRef<Path>) -> Result<Loaded, LoadError> {
    let found = discover::read_first(&[path.as_ref()])
        .await
        .map_err(LoadError::Read)?;
    from_found(found)
}

/// Parse and resolve a found config file.
fn from_found(found: discover::Found) -> Result<Loaded, LoadError> {
    let discover::Found { path, contents } = found;

    let config = parse_str(&contents).map_err(|source| LoadError::Parse {
        path: path.clone(),
        source,
    })?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let settings = settings::resolve(&config, base_dir).map_err(|source| LoadError::Resolve {
        path: path.clone(),
        source,
    })?;

    Ok(Loaded { settings, path })
}

/// Load configuration honoring the `MAIL_FERRY_CONFIG` env var.
#[cfg(feature = "env")]
pub async fn with_default_env_var() -> Result<Loaded, WithDefaultEnvVarError> {
    let env_path = envfury::maybe(discover::ENV_VAR).map_err(WithDefaultEnvVarError::Env)?;
    with(env_path).await.map_err(WithDefaultEnvVarError::Load)
}

/// Errors that can occur while loading with the env var override.
#[cfg(feature = "env")]
#[derive(Debug, thiserror::Error)]
pub enum WithDefaultEnvVarError {
    /// Env variable reading error.
    #[error("config path env var read: {0}")]
    Env(#[source] envfury::Error<envfury::ValueError<<PathBuf as std::str::FromStr>::Err>>),

    /// Loading error.
    #[error(transparent)]
    Load(#[from] LoadError),
}
