use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::config::ValidationSection;

use super::error::{UploadError, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "source", rename_all = "snake_case")]
pub enum MediaSource {
    Url(String),
    File(PathBuf),
}

impl MediaSource {
    pub fn kind(&self) -> &'static str {
        match self {
            MediaSource::Url(_) => "url",
            MediaSource::File(_) => "file",
        }
    }

    pub fn file_name(&self) -> Option<String> {
        match self {
            MediaSource::Url(_) => None,
            MediaSource::File(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().to_string()),
        }
    }
}

impl fmt::Display for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaSource::Url(url) => write!(f, "{url}"),
            MediaSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

pub trait SourceValidator: Send + Sync {
    fn validate(&self, source: &MediaSource) -> Result<(), ValidationError>;
}

#[derive(Debug, Clone)]
pub struct MediaSourceValidator {
    config: ValidationSection,
}

impl MediaSourceValidator {
    pub fn new(config: ValidationSection) -> Self {
        Self { config }
    }

    fn validate_url(&self, raw: &str) -> Result<(), ValidationError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ValidationError::EmptySource);
        }
        let url = Url::parse(raw).map_err(|err| ValidationError::InvalidUrl {
            url: raw.to_string(),
            reason: err.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ValidationError::UnsupportedScheme {
                url: raw.to_string(),
                scheme: url.scheme().to_string(),
            });
        }

        let path = url.path().to_ascii_lowercase();
        if self
            .config
            .media_extensions
            .iter()
            .any(|ext| path.ends_with(&ext.to_ascii_lowercase()))
        {
            return Ok(());
        }

        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let supported = self.config.supported_platforms.iter().any(|platform| {
            let platform = platform.to_ascii_lowercase();
            host == platform || host.ends_with(&format!(".{platform}"))
        });
        if supported {
            Ok(())
        } else {
            Err(ValidationError::UnsupportedUrl(raw.to_string()))
        }
    }

    fn validate_file(&self, path: &Path) -> Result<(), ValidationError> {
        let metadata = std::fs::metadata(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ValidationError::FileNotFound(path.to_path_buf())
            } else {
                ValidationError::Io {
                    source,
                    path: path.to_path_buf(),
                }
            }
        })?;
        if !metadata.is_file() {
            return Err(ValidationError::FileNotFound(path.to_path_buf()));
        }

        let known = media_type_for_path(path)
            .map(|media_type| self.config.media_types.iter().any(|t| t == media_type))
            .unwrap_or(false);
        if !known {
            return Err(ValidationError::UnsupportedMediaType {
                path: path.to_path_buf(),
            });
        }
        if metadata.len() > self.config.max_upload_bytes {
            return Err(ValidationError::FileTooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                limit: self.config.max_upload_bytes,
            });
        }
        Ok(())
    }
}

impl SourceValidator for MediaSourceValidator {
    fn validate(&self, source: &MediaSource) -> Result<(), ValidationError> {
        match source {
            MediaSource::Url(url) => self.validate_url(url),
            MediaSource::File(path) => self.validate_file(path),
        }
    }
}

/// Media type guessed from the file extension.
pub fn media_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let media_type = match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "flv" => "video/x-flv",
        "3gp" => "video/3gpp",
        "mkv" => "video/x-matroska",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        _ => return None,
    };
    Some(media_type)
}

#[async_trait]
pub trait Uploader: Send + Sync {
    /// Makes a local file reachable by the transcoder and returns its URL.
    async fn upload(&self, path: &Path) -> Result<String, UploadError>;
}

/// Copies uploads into a staging directory and hands out `file://` URLs.
#[derive(Debug, Clone)]
pub struct StagingUploader {
    staging_dir: PathBuf,
}

impl StagingUploader {
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
        }
    }
}

#[async_trait]
impl Uploader for StagingUploader {
    async fn upload(&self, path: &Path) -> Result<String, UploadError> {
        let file_name = path
            .file_name()
            .ok_or_else(|| UploadError::InvalidPath(path.to_path_buf()))?;
        tokio::fs::create_dir_all(&self.staging_dir)
            .await
            .map_err(|source| UploadError::Io {
                source,
                path: self.staging_dir.clone(),
            })?;
        let staged = self.staging_dir.join(format!(
            "{}_{}",
            Utc::now().timestamp_millis(),
            file_name.to_string_lossy()
        ));
        tokio::fs::copy(path, &staged)
            .await
            .map_err(|source| UploadError::Io {
                source,
                path: path.to_path_buf(),
            })?;
        let absolute = tokio::fs::canonicalize(&staged)
            .await
            .map_err(|source| UploadError::Io {
                source,
                path: staged.clone(),
            })?;
        let url = Url::from_file_path(&absolute)
            .map_err(|_| UploadError::InvalidPath(absolute.clone()))?;
        debug!(source = %path.display(), staged = %absolute.display(), "media file staged");
        Ok(url.to_string())
    }
}
