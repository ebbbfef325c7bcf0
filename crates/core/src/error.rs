use thiserror::Error;

use crate::model::{ConfigError, MediaError, ParseIdError, QuestionError};
use crate::progress::ProgressError;
use crate::scoring::ScoringError;

/// Any domain error raised by this crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    ParseId(#[from] ParseIdError),
}
