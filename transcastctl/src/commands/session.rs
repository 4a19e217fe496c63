use clap::Args;
use serde::Serialize;
use tokio_stream::StreamExt;
use transcast_core::{
    Collaborators, Coordinator, CoordinatorHandle, JobId, JobState, JobStateStore, PlaybackState,
    SessionSnapshot, StatusMessage, TranscastConfig,
};
use tracing::{debug, warn};

use crate::{AppContext, AppError, DisplayFallback, OutputFormat, Result};

use super::inspect::media_source;

/// Submits media for transcoding and follows the job until the session ends.
#[derive(Args, Debug, Clone)]
pub struct SubmitArgs {
    /// Media URL or local file path
    pub source: String,
    /// Treat the source as a local file
    #[arg(long)]
    pub file: bool,
    /// Release the player and exit as soon as transcoding completes
    #[arg(long)]
    pub exit_on_complete: bool,
}

/// Resumes polling of the persisted job.
#[derive(Args, Debug, Clone)]
pub struct ResumeArgs {
    /// Release the player and exit as soon as transcoding completes
    #[arg(long)]
    pub exit_on_complete: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionOutcome {
    pub job_id: Option<JobId>,
    pub job_state: Option<JobState>,
    pub output_url: Option<String>,
    pub error: Option<String>,
    pub playback: PlaybackState,
}

impl SessionOutcome {
    fn from_snapshot(job_id: Option<JobId>, snapshot: SessionSnapshot) -> Self {
        let job = snapshot.job;
        Self {
            job_id: job.as_ref().map(|job| job.id.clone()).or(job_id),
            job_state: job.as_ref().map(|job| job.state),
            output_url: job.as_ref().and_then(|job| job.output_url.clone()),
            error: job.and_then(|job| job.error),
            playback: snapshot.playback,
        }
    }
}

impl DisplayFallback for SessionOutcome {
    fn display(&self) -> String {
        let job = self
            .job_id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        let state = self
            .job_state
            .map(|state| state.to_string())
            .unwrap_or_else(|| "-".to_string());
        let mut line = format!("job={job} state={state} playback={}", self.playback);
        if let Some(url) = &self.output_url {
            line.push_str(&format!(" output={url}"));
        }
        if let Some(error) = &self.error {
            line.push_str(&format!(" error={error}"));
        }
        line
    }
}

enum Follow {
    Continue,
    Done,
}

pub async fn submit(
    context: &AppContext,
    args: &SubmitArgs,
    format: OutputFormat,
) -> Result<SessionOutcome> {
    let source = media_source(&args.source, args.file);
    let session = start(context.config.clone(), context)?;
    let job_id = match session.handle.submit_job(source.clone()).await {
        Ok(job_id) => job_id,
        Err(err) => {
            session.shutdown().await;
            return Err(err.into());
        }
    };
    debug!(%job_id, %source, "job submitted");
    follow(session, Some(job_id), args.exit_on_complete, format).await
}

pub async fn resume(
    context: &AppContext,
    args: &ResumeArgs,
    format: OutputFormat,
) -> Result<SessionOutcome> {
    let persisted = context.store()?.load()?;
    let Some(job_id) = persisted else {
        return Err(AppError::MissingResource("no persisted job to resume".into()));
    };
    let mut config = context.config.clone();
    config.session.resume_persisted_job = true;
    let session = start(config, context)?;
    follow(session, Some(job_id), args.exit_on_complete, format).await
}

struct RunningSession {
    handle: CoordinatorHandle,
    task: tokio::task::JoinHandle<()>,
    messages: tokio_stream::wrappers::BroadcastStream<StatusMessage>,
}

impl RunningSession {
    async fn shutdown(self) {
        if let Err(err) = self.handle.shutdown().await {
            debug!(error = %err, "coordinator already stopped");
        }
        if let Err(err) = self.task.await {
            warn!(error = %err, "coordinator task failed");
        }
    }
}

fn start(config: TranscastConfig, context: &AppContext) -> Result<RunningSession> {
    let collaborators = Collaborators::from_config(&config, &context.base_dir)?;
    let (coordinator, handle) = Coordinator::new(config, collaborators)?;
    let messages = handle.status_stream();
    let task = coordinator.spawn();
    Ok(RunningSession {
        handle,
        task,
        messages,
    })
}

async fn follow(
    mut session: RunningSession,
    job_id: Option<JobId>,
    exit_on_complete: bool,
    format: OutputFormat,
) -> Result<SessionOutcome> {
    loop {
        tokio::select! {
            message = session.messages.next() => {
                match message {
                    Some(Ok(message)) => print_message(&message, format)?,
                    Some(Err(err)) => warn!(error = %err, "status messages skipped"),
                    None => break,
                }
                let snapshot = session.handle.snapshot().await?;
                if let Follow::Done = assess(&snapshot, exit_on_complete) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted, cleaning up");
                session.handle.cleanup().await?;
                break;
            }
        }
    }

    let snapshot = session.handle.snapshot().await?;
    let failed = snapshot
        .job
        .as_ref()
        .map(|job| job.state == JobState::Failed)
        .unwrap_or(false);
    if exit_on_complete && !failed {
        session.handle.cleanup().await?;
    }
    session.shutdown().await;
    let outcome = SessionOutcome::from_snapshot(job_id, snapshot);
    if failed {
        return Err(AppError::JobFailed(
            outcome
                .error
                .clone()
                .unwrap_or_else(|| "unknown error".to_string()),
        ));
    }
    Ok(outcome)
}

fn assess(snapshot: &SessionSnapshot, exit_on_complete: bool) -> Follow {
    match &snapshot.job {
        Some(job) if job.state == JobState::Failed => Follow::Done,
        Some(job) if exit_on_complete && job.state == JobState::Completed => Follow::Done,
        None if snapshot.playback == PlaybackState::Cleaned => Follow::Done,
        _ => Follow::Continue,
    }
}

fn print_message(message: &StatusMessage, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{message}"),
        OutputFormat::Json => println!("{}", serde_json::to_string(message)?),
    }
    Ok(())
}
