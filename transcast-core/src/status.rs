use std::fmt;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{error, info, warn};

const STATUS_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl StatusLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusLevel::Info => "info",
            StatusLevel::Success => "success",
            StatusLevel::Warning => "warning",
            StatusLevel::Error => "error",
        }
    }
}

impl fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line of user-facing feedback. `progress` is set while a job is
/// transcoding so a UI can draw a progress bar next to the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

impl StatusMessage {
    pub fn new(level: StatusLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.text)
    }
}

/// The single channel every user-visible message goes through.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    sender: broadcast::Sender<StatusMessage>,
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusReporter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusMessage> {
        self.sender.subscribe()
    }

    pub fn stream(&self) -> BroadcastStream<StatusMessage> {
        BroadcastStream::new(self.subscribe())
    }

    pub fn publish(&self, message: StatusMessage) {
        match message.level {
            StatusLevel::Error => error!(text = %message.text, "status"),
            StatusLevel::Warning => warn!(text = %message.text, "status"),
            StatusLevel::Info | StatusLevel::Success => {
                info!(level = %message.level, text = %message.text, progress = ?message.progress, "status")
            }
        }
        // no subscribers is fine
        let _ = self.sender.send(message);
    }

    pub fn info(&self, text: impl Into<String>) {
        self.publish(StatusMessage::new(StatusLevel::Info, text));
    }

    pub fn success(&self, text: impl Into<String>) {
        self.publish(StatusMessage::new(StatusLevel::Success, text));
    }

    pub fn warning(&self, text: impl Into<String>) {
        self.publish(StatusMessage::new(StatusLevel::Warning, text));
    }

    pub fn error(&self, text: impl Into<String>) {
        self.publish(StatusMessage::new(StatusLevel::Error, text));
    }

    pub fn progress(&self, progress: u8) {
        self.publish(
            StatusMessage::new(
                StatusLevel::Info,
                format!("Transcoding in progress... {progress}%"),
            )
            .with_progress(progress),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_messages_in_order() {
        let reporter = StatusReporter::new();
        let mut rx = reporter.subscribe();
        reporter.info("uploading");
        reporter.progress(40);
        reporter.error("boom");

        assert_eq!(rx.recv().await.unwrap().text, "uploading");
        let progress = rx.recv().await.unwrap();
        assert_eq!(progress.progress, Some(40));
        assert_eq!(progress.text, "Transcoding in progress... 40%");
        assert_eq!(rx.recv().await.unwrap().level, StatusLevel::Error);
    }

    #[test]
    fn publishing_without_subscribers_does_not_fail() {
        StatusReporter::new().warning("nobody listening");
    }
}
