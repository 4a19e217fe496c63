use tracing::{debug, warn};

use crate::config::{FallbackPolicy, MonitorSection};

use super::models::{Job, JobId, JobState, JobStatus};
use super::status_source::StatusFetch;

/// What the coordinator has to do after a status was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorAction {
    /// Still transcoding; keep the poll timer running.
    Progress(u8),
    /// Stop polling and hand the stream to playback.
    Completed { output_url: String },
    /// Stop polling and surface the error.
    Failed { error: String },
    /// Unrecognized status value; warn and keep polling.
    Unknown { raw: String },
    /// No job is being monitored.
    Ignored,
}

/// Transition logic for the one job being polled. Holds no timers; the
/// coordinator feeds it fetch results and executes the returned actions.
#[derive(Debug, Clone)]
pub struct JobMonitor {
    config: MonitorSection,
    active: Option<Job>,
    finished: Option<Job>,
}

impl JobMonitor {
    pub fn new(config: MonitorSection) -> Self {
        Self {
            config,
            active: None,
            finished: None,
        }
    }

    pub fn config(&self) -> &MonitorSection {
        &self.config
    }

    /// Starts tracking `job_id`, replacing whatever was tracked before.
    pub fn begin(&mut self, job_id: JobId) -> &Job {
        if let Some(previous) = self.active.take() {
            debug!(job_id = %previous.id, "job superseded by new submission");
        }
        self.finished = None;
        self.active.insert(Job::new(job_id))
    }

    /// Resets the consecutive failure counter ahead of a fresh poll loop.
    pub fn start_polling(&mut self, job_id: &JobId) {
        if let Some(job) = self.active.as_mut().filter(|job| &job.id == job_id) {
            job.attempt_count = 0;
        }
    }

    pub fn active(&self) -> Option<&Job> {
        self.active.as_ref()
    }

    /// The active job, or the last one that reached a terminal state.
    pub fn snapshot(&self) -> Option<Job> {
        self.active.clone().or_else(|| self.finished.clone())
    }

    pub fn is_monitoring(&self, job_id: &JobId) -> bool {
        self.active.as_ref().map(|job| &job.id == job_id).unwrap_or(false)
    }

    /// Forgets both the active and the finished job, returning the id that
    /// was being tracked.
    pub fn clear(&mut self) -> Option<JobId> {
        let active = self.active.take().map(|job| job.id);
        let finished = self.finished.take().map(|job| job.id);
        active.or(finished)
    }

    /// Turns one fetch into a status, applying the transport retry bound.
    /// Returns `None` when `job_id` is not the job being monitored.
    pub fn record_fetch(&mut self, job_id: &JobId, fetch: StatusFetch) -> Option<JobStatus> {
        let max_failures = self.config.max_transport_failures;
        let not_found_progress = self.config.not_found_progress;
        let fallback = self.fallback_status();
        let job = self.active.as_mut().filter(|job| &job.id == job_id)?;

        let status = match fetch {
            StatusFetch::Document(document) => {
                job.attempt_count = 0;
                document.to_status()
            }
            StatusFetch::NotFound => {
                job.attempt_count = 0;
                JobStatus::Processing {
                    progress: not_found_progress,
                }
            }
            StatusFetch::TransportError(error) => {
                job.attempt_count += 1;
                warn!(
                    job_id = %job.id,
                    attempt = job.attempt_count,
                    max = max_failures,
                    %error,
                    "status fetch failed"
                );
                if job.attempt_count >= max_failures {
                    fallback
                } else {
                    JobStatus::Processing {
                        progress: job.progress,
                    }
                }
            }
        };
        Some(status)
    }

    fn fallback_status(&self) -> JobStatus {
        match self.config.fallback {
            FallbackPolicy::Complete => JobStatus::Completed {
                output_url: Some(self.config.fallback_output_url.clone()),
            },
            FallbackPolicy::Fail => JobStatus::Failed {
                error: Some(format!(
                    "status source unreachable after {} attempts",
                    self.config.max_transport_failures
                )),
            },
        }
    }

    pub fn on_status(&mut self, status: JobStatus) -> MonitorAction {
        let Some(job) = self.active.as_mut() else {
            return MonitorAction::Ignored;
        };

        match status {
            JobStatus::Processing { progress } => {
                job.state = JobState::Processing;
                job.progress = job.progress.max(progress.min(100));
                MonitorAction::Progress(job.progress)
            }
            JobStatus::Completed {
                output_url: Some(url),
            } => {
                job.state = JobState::Completed;
                job.progress = 100;
                job.attempt_count = 0;
                job.output_url = Some(url.clone());
                self.finished = self.active.take();
                MonitorAction::Completed { output_url: url }
            }
            JobStatus::Completed { output_url: None } => {
                self.fail("transcoding completed without an output URL".to_string())
            }
            JobStatus::Failed { error } => {
                self.fail(error.unwrap_or_else(|| "Unknown error".to_string()))
            }
            JobStatus::Unknown { raw } => MonitorAction::Unknown { raw },
        }
    }

    fn fail(&mut self, error: String) -> MonitorAction {
        if let Some(mut job) = self.active.take() {
            job.state = JobState::Failed;
            job.attempt_count = 0;
            job.error = Some(error.clone());
            self.finished = Some(job);
        }
        MonitorAction::Failed { error }
    }
}
