use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::JobError;

const SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Builds `job_<unix millis>_<9 base36 chars>`.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        Self(format!("job_{}_{}", now.timestamp_millis(), suffix))
    }

    /// Accepts an externally supplied id (persisted state, CLI argument).
    /// The id ends up in a URL path, so separators and whitespace are refused.
    pub fn parse(value: &str) -> Result<Self, JobError> {
        let trimmed = value.trim();
        if trimmed.is_empty()
            || trimmed
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '\\'))
        {
            return Err(JobError::InvalidJobId(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hands out ids, regenerating when a draw repeats the previous id.
#[derive(Debug, Default)]
pub struct JobIdGenerator {
    last: Option<JobId>,
}

impl JobIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> JobId {
        self.next_with(|| JobId::generate(Utc::now()))
    }

    fn next_with(&mut self, mut draw: impl FnMut() -> JobId) -> JobId {
        let id = loop {
            let candidate = draw();
            if self.last.as_ref() != Some(&candidate) {
                break candidate;
            }
        };
        self.last = Some(id.clone());
        id
    }

    pub fn last_issued(&self) -> Option<&JobId> {
        self.last.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Submitted,
    Processing,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Submitted => "submitted",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub state: JobState,
    pub progress: u8,
    pub output_url: Option<String>,
    pub error: Option<String>,
    /// Consecutive status fetches that failed at the transport level.
    pub attempt_count: u32,
    pub submitted_at: DateTime<Utc>,
}

impl Job {
    pub fn new(id: JobId) -> Self {
        Self {
            id,
            state: JobState::Submitted,
            progress: 0,
            output_url: None,
            error: None,
            attempt_count: 0,
            submitted_at: Utc::now(),
        }
    }
}

/// Status as reported for one poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Processing { progress: u8 },
    Completed { output_url: Option<String> },
    Failed { error: Option<String> },
    Unknown { raw: String },
}

/// Flat `KEY=VALUE` document published next to the transcoding output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusDocument {
    pub status: Option<String>,
    pub progress: u8,
    pub output_url: Option<String>,
    pub error: Option<String>,
}

impl StatusDocument {
    pub fn parse(text: &str) -> Self {
        let mut document = StatusDocument::default();
        for line in text.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() || value.is_empty() {
                continue;
            }
            match key {
                "STATUS" => document.status = Some(value.to_string()),
                "PROGRESS" => document.progress = parse_progress(value),
                "OUTPUT_URL" => document.output_url = Some(value.to_string()),
                "ERROR" => document.error = Some(value.to_string()),
                _ => {}
            }
        }
        document
    }

    pub fn to_status(&self) -> JobStatus {
        let raw = self.status.as_deref().unwrap_or("unknown");
        match raw.to_ascii_lowercase().as_str() {
            "processing" => JobStatus::Processing {
                progress: self.progress,
            },
            "completed" => JobStatus::Completed {
                output_url: self.output_url.clone(),
            },
            "failed" => JobStatus::Failed {
                error: self.error.clone(),
            },
            _ => JobStatus::Unknown {
                raw: raw.to_string(),
            },
        }
    }
}

fn parse_progress(value: &str) -> u8 {
    let digits: String = value
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return 0;
    }
    // an overflowing run is still a huge number
    digits
        .parse::<u64>()
        .map(|p| p.min(100) as u8)
        .unwrap_or(100)
}
