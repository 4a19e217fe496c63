use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("failed to create player on {mount_point}: {reason}")]
    Create { mount_point: String, reason: String },
    #[error("failed to launch player {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
}

pub type PlaybackResult<T> = std::result::Result<T, PlaybackError>;
