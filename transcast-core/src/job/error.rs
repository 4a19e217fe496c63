use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Please enter a valid media URL")]
    EmptySource,
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("unsupported URL scheme {scheme} in {url}")]
    UnsupportedScheme { url: String, scheme: String },
    #[error("unsupported media URL {0} (supported: direct media links, YouTube, etc.)")]
    UnsupportedUrl(String),
    #[error("media file {0} not found")]
    FileNotFound(PathBuf),
    #[error("unsupported media type for {path}")]
    UnsupportedMediaType { path: PathBuf },
    #[error("media file {path} is {size} bytes, limit is {limit}")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },
    #[error("io error at {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("io error at {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("cannot build a URL for {0}")]
    InvalidPath(PathBuf),
}

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("upload failed: {0}")]
    Upload(#[from] UploadError),
    #[error("dispatch failed: {0}")]
    DispatchFailed(String),
    #[error("invalid job id: {0:?}")]
    InvalidJobId(String),
}

pub type JobResult<T> = std::result::Result<T, JobError>;
