use thiserror::Error;

use crate::error::ConfigError;
use crate::job::JobError;
use crate::playback::PlaybackError;
use crate::session::StoreError;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Job(#[from] JobError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("coordinator is no longer running")]
    Closed,
}

pub type CoordinatorResult<T> = std::result::Result<T, CoordinatorError>;
