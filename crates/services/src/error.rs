//! Shared error types for the services crate.

use std::path::PathBuf;

use thiserror::Error;

use quml_core::model::ConfigError;
use quml_core::progress::ProgressError;
use quml_core::scoring::ScoringError;
use storage::repository::StorageError;

use crate::sessions::LoadFailure;

/// Errors emitted by session services.
///
/// Rejected navigation is not an error; see `NavOutcome::Rejected`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("question load failed: {0}")]
    QuestionLoad(LoadFailure),
}

/// Errors emitted while reading a session configuration file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigLoadError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}
