use std::fs;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use transcast_core::{
    select_transport, JobStatus, MediaSource, MediaSourceValidator, PlaybackTransport,
    SourceValidator, StatusDocument, ValidationSection,
};

use crate::{DisplayFallback, Result};

/// Shows which transport a stream URL would be played with.
#[derive(Args, Debug, Clone)]
pub struct TransportArgs {
    /// Stream URL (query string and fragment are ignored)
    pub url: String,
}

/// Checks a media URL or file against the upload rules.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// URL or path of the media to check
    pub source: String,
    /// Treat the source as a local file even if it does not exist
    #[arg(long)]
    pub file: bool,
}

/// Parses a status document the way the poller does.
#[derive(Args, Debug, Clone)]
pub struct ParseStatusArgs {
    /// Path to a `status.txt` file
    pub path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct TransportReport {
    pub url: String,
    pub transport: PlaybackTransport,
    pub mime_type: &'static str,
}

impl DisplayFallback for TransportReport {
    fn display(&self) -> String {
        format!("{} -> {} ({})", self.url, self.transport, self.mime_type)
    }
}

#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub source: MediaSource,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DisplayFallback for ValidationReport {
    fn display(&self) -> String {
        match &self.error {
            None => format!("{}: ok", self.source),
            Some(error) => format!("{}: {error}", self.source),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub document: StatusDocument,
    pub status: JobStatus,
}

impl DisplayFallback for StatusReport {
    fn display(&self) -> String {
        let mut lines = vec![format!(
            "status: {}",
            self.document.status.as_deref().unwrap_or("<missing>")
        )];
        lines.push(format!("progress: {}%", self.document.progress));
        if let Some(url) = &self.document.output_url {
            lines.push(format!("output_url: {url}"));
        }
        if let Some(error) = &self.document.error {
            lines.push(format!("error: {error}"));
        }
        lines.push(format!("interpreted as: {:?}", self.status));
        lines.join("\n")
    }
}

pub fn transport(args: &TransportArgs) -> TransportReport {
    let transport = select_transport(&args.url);
    TransportReport {
        url: args.url.clone(),
        transport,
        mime_type: transport.mime_type(),
    }
}

pub fn media_source(raw: &str, force_file: bool) -> MediaSource {
    let path = PathBuf::from(raw);
    if force_file || (!raw.contains("://") && path.exists()) {
        MediaSource::File(path)
    } else {
        MediaSource::Url(raw.to_string())
    }
}

pub fn validate(args: &ValidateArgs, rules: &ValidationSection) -> ValidationReport {
    let source = media_source(&args.source, args.file);
    let result = MediaSourceValidator::new(rules.clone()).validate(&source);
    ValidationReport {
        valid: result.is_ok(),
        error: result.err().map(|err| err.to_string()),
        source,
    }
}

pub fn parse_status(args: &ParseStatusArgs) -> Result<StatusReport> {
    let text = fs::read_to_string(&args.path)?;
    let document = StatusDocument::parse(&text);
    let status = document.to_status();
    Ok(StatusReport { document, status })
}
