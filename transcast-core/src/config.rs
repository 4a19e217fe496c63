use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

pub const DEFAULT_FALLBACK_OUTPUT_URL: &str =
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/BigBuckBunny.mp4";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct TranscastConfig {
    pub monitor: MonitorSection,
    pub playback: PlaybackSection,
    pub player: PlayerSection,
    pub session: SessionSection,
    pub status_source: StatusSourceSection,
    pub trigger: TriggerSection,
    pub upload: UploadSection,
    pub validation: ValidationSection,
    pub cleanup: CleanupSection,
}

impl TranscastConfig {
    /// Rejects combinations the coordinator cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.monitor.poll_interval_seconds == 0 {
            return Err(ConfigError::Invalid {
                field: "monitor.poll_interval_seconds",
                reason: "must be greater than zero".into(),
            });
        }
        if self.monitor.max_transport_failures == 0 {
            return Err(ConfigError::Invalid {
                field: "monitor.max_transport_failures",
                reason: "must be at least 1".into(),
            });
        }
        if self.monitor.not_found_progress > 100 {
            return Err(ConfigError::Invalid {
                field: "monitor.not_found_progress",
                reason: format!("{} exceeds 100", self.monitor.not_found_progress),
            });
        }
        if self.monitor.fallback == FallbackPolicy::Complete
            && self.monitor.fallback_output_url.trim().is_empty()
        {
            return Err(ConfigError::Invalid {
                field: "monitor.fallback_output_url",
                reason: "required when fallback = \"complete\"".into(),
            });
        }
        if self.playback.idle_timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                field: "playback.idle_timeout_seconds",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    pub fn resolve_path<P: AsRef<Path>>(&self, base_dir: &Path, candidate: P) -> PathBuf {
        let path = candidate.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }
}

/// Terminal outcome synthesized once the status source has been unreachable
/// for `max_transport_failures` consecutive polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    #[default]
    Fail,
    Complete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSection {
    pub poll_interval_seconds: u64,
    pub max_transport_failures: u32,
    pub not_found_progress: u8,
    pub fallback: FallbackPolicy,
    pub fallback_output_url: String,
}

impl MonitorSection {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 5,
            max_transport_failures: 5,
            not_found_progress: 10,
            fallback: FallbackPolicy::Fail,
            fallback_output_url: DEFAULT_FALLBACK_OUTPUT_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSection {
    pub mount_point: String,
    pub idle_timeout_seconds: u64,
    pub ended_grace_seconds: u64,
    /// Pause between disposing the old player and creating the next one.
    pub dispose_settle_ms: u64,
}

impl PlaybackSection {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }

    pub fn ended_grace(&self) -> Duration {
        Duration::from_secs(self.ended_grace_seconds)
    }

    pub fn dispose_settle(&self) -> Duration {
        Duration::from_millis(self.dispose_settle_ms)
    }
}

impl Default for PlaybackSection {
    fn default() -> Self {
        Self {
            mount_point: "videoPlayer".to_string(),
            idle_timeout_seconds: 300,
            ended_grace_seconds: 5,
            dispose_settle_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSection {
    pub command: String,
    pub args: Vec<String>,
    pub controls: bool,
    pub fluid: bool,
    pub playback_rates: Vec<f32>,
    pub volume_step: f32,
    pub seek_step_seconds: u32,
}

impl Default for PlayerSection {
    fn default() -> Self {
        Self {
            command: "ffplay".to_string(),
            args: vec!["-autoexit".to_string(), "-loglevel".to_string(), "error".to_string()],
            controls: true,
            fluid: true,
            playback_rates: vec![0.5, 1.0, 1.25, 1.5, 2.0],
            volume_step: 0.1,
            seek_step_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Whether a job id left in the state store is polled again on start-up.
    pub resume_persisted_job: bool,
    pub state_db: String,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            resume_persisted_job: false,
            state_db: "data/session.sqlite".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusSourceSection {
    pub base_url: String,
    pub request_timeout_seconds: u64,
}

impl Default for StatusSourceSection {
    fn default() -> Self {
        Self {
            base_url: "https://sukhdeepmaan628-svg.github.io/media-transcoder/output".to_string(),
            request_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerSection {
    pub event_type: String,
    pub simulated_delay_ms: u64,
}

impl Default for TriggerSection {
    fn default() -> Self {
        Self {
            event_type: "transcode_media".to_string(),
            simulated_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSection {
    pub staging_dir: String,
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            staging_dir: "data/uploads".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSection {
    pub media_extensions: Vec<String>,
    pub supported_platforms: Vec<String>,
    pub media_types: Vec<String>,
    pub max_upload_bytes: u64,
}

impl Default for ValidationSection {
    fn default() -> Self {
        let to_vec = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            media_extensions: to_vec(&[
                ".mp4", ".avi", ".mov", ".mkv", ".webm", ".flv", ".m4v", ".3gp", ".mp3", ".m4a",
                ".wav", ".flac",
            ]),
            supported_platforms: to_vec(&["youtube.com", "youtu.be", "vimeo.com", "twitch.tv"]),
            media_types: to_vec(&[
                "video/mp4",
                "video/avi",
                "video/quicktime",
                "video/x-msvideo",
                "video/webm",
                "video/x-flv",
                "video/3gpp",
                "video/x-matroska",
                "audio/mpeg",
                "audio/mp4",
                "audio/wav",
                "audio/flac",
            ]),
            max_upload_bytes: 500 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupSection {
    /// Remote endpoint notified on cleanup; nothing is sent when unset.
    pub endpoint: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for CleanupSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_seconds: 5,
        }
    }
}

pub fn load_transcast_config<P: AsRef<Path>>(path: P) -> Result<TranscastConfig> {
    let config: TranscastConfig = load_toml(path)?;
    config.validate()?;
    Ok(config)
}

fn load_toml<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_fixture_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../configs/transcast.toml");
        let config = load_transcast_config(path).expect("config should parse");
        assert_eq!(config.monitor.poll_interval_seconds, 5);
        assert_eq!(config.monitor.fallback, FallbackPolicy::Fail);
        assert_eq!(config.playback.idle_timeout(), Duration::from_secs(300));
        assert!(!config.session.resume_persisted_job);
        assert!(config.validation.media_extensions.contains(&".m4v".to_string()));
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let config: TranscastConfig = toml::from_str(
            "[monitor]\nfallback = \"complete\"\nmax_transport_failures = 3\n",
        )
        .unwrap();
        assert_eq!(config.monitor.fallback, FallbackPolicy::Complete);
        assert_eq!(config.monitor.max_transport_failures, 3);
        assert_eq!(config.monitor.poll_interval_seconds, 5);
        assert_eq!(config.monitor.fallback_output_url, DEFAULT_FALLBACK_OUTPUT_URL);
        assert_eq!(config.playback.ended_grace_seconds, 5);
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_zero_interval_and_missing_fallback_url() {
        let mut config = TranscastConfig::default();
        config.monitor.poll_interval_seconds = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "monitor.poll_interval_seconds",
                ..
            })
        ));

        let mut config = TranscastConfig::default();
        config.monitor.fallback = FallbackPolicy::Complete;
        config.monitor.fallback_output_url = "  ".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "monitor.fallback_output_url",
                ..
            })
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_transcast_config("/nonexistent/transcast.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/transcast.toml"));
    }
}
