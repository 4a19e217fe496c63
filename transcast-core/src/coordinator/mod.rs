mod collaborators;
mod error;

use std::ops::ControlFlow;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, sleep_until, Instant, MissedTickBehavior};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

use crate::config::TranscastConfig;
use crate::job::{
    DispatchOutcome, Job, JobError, JobId, MediaSource, MonitorAction, StatusFetch,
    TranscodeRequest,
};
use crate::playback::{
    PlaybackAction, PlaybackState, PlaybackTransport, PlayerEventSink, PlayerOptions,
    TaggedPlayerEvent, WatchdogDecision,
};
use crate::session::{ResetReport, SessionContext};
use crate::status::{StatusMessage, StatusReporter};

pub use collaborators::Collaborators;
pub use error::{CoordinatorError, CoordinatorResult};

const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Point-in-time view of both state machines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub job: Option<Job>,
    pub playback: PlaybackState,
    pub stream_url: Option<String>,
    pub transport: Option<PlaybackTransport>,
    pub live_timers: usize,
    pub player_live: bool,
}

enum Command {
    Submit {
        source: MediaSource,
        reply: oneshot::Sender<CoordinatorResult<JobId>>,
    },
    Load {
        url: String,
        reply: oneshot::Sender<CoordinatorResult<PlaybackTransport>>,
    },
    JobState {
        reply: oneshot::Sender<Option<Job>>,
    },
    PlaybackState {
        reply: oneshot::Sender<PlaybackState>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    UserActivity,
    Cleanup {
        reply: oneshot::Sender<ResetReport>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

#[derive(Debug)]
enum TimerEvent {
    Polled {
        job_id: JobId,
        generation: u64,
        fetch: StatusFetch,
    },
    IdleDeadline {
        generation: u64,
    },
    EndedGrace {
        generation: u64,
    },
}

/// Cloneable front door to a running coordinator.
#[derive(Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::Sender<Command>,
    status: StatusReporter,
}

impl CoordinatorHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> CoordinatorResult<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| CoordinatorError::Closed)?;
        response.await.map_err(|_| CoordinatorError::Closed)
    }

    pub async fn submit_job(&self, source: MediaSource) -> CoordinatorResult<JobId> {
        self.request(|reply| Command::Submit { source, reply })
            .await?
    }

    pub async fn load_stream(&self, url: impl Into<String>) -> CoordinatorResult<PlaybackTransport> {
        let url = url.into();
        self.request(|reply| Command::Load { url, reply }).await?
    }

    pub async fn job_state(&self) -> CoordinatorResult<Option<Job>> {
        self.request(|reply| Command::JobState { reply }).await
    }

    pub async fn playback_state(&self) -> CoordinatorResult<PlaybackState> {
        self.request(|reply| Command::PlaybackState { reply }).await
    }

    pub async fn snapshot(&self) -> CoordinatorResult<SessionSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Pointer move, key press or click in the UI.
    pub async fn user_activity(&self) -> CoordinatorResult<()> {
        self.commands
            .send(Command::UserActivity)
            .await
            .map_err(|_| CoordinatorError::Closed)
    }

    pub async fn cleanup(&self) -> CoordinatorResult<ResetReport> {
        self.request(|reply| Command::Cleanup { reply }).await
    }

    pub async fn shutdown(&self) -> CoordinatorResult<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusMessage> {
        self.status.subscribe()
    }

    pub fn status_stream(&self) -> BroadcastStream<StatusMessage> {
        self.status.stream()
    }
}

/// Single task owning the job monitor, the playback session and every timer.
pub struct Coordinator {
    config: TranscastConfig,
    collaborators: Collaborators,
    ctx: SessionContext,
    status: StatusReporter,
    commands: mpsc::Receiver<Command>,
    timer_tx: mpsc::UnboundedSender<TimerEvent>,
    timer_rx: mpsc::UnboundedReceiver<TimerEvent>,
    player_tx: mpsc::UnboundedSender<TaggedPlayerEvent>,
    player_rx: mpsc::UnboundedReceiver<TaggedPlayerEvent>,
}

impl Coordinator {
    /// Fails when the configuration would leave a timer unable to run.
    pub fn new(
        config: TranscastConfig,
        collaborators: Collaborators,
    ) -> CoordinatorResult<(Self, CoordinatorHandle)> {
        config.validate()?;
        let (command_tx, commands) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let (player_tx, player_rx) = mpsc::unbounded_channel();
        let status = StatusReporter::new();
        let handle = CoordinatorHandle {
            commands: command_tx,
            status: status.clone(),
        };
        let coordinator = Self {
            ctx: SessionContext::create(&config),
            config,
            collaborators,
            status,
            commands,
            timer_tx,
            timer_rx,
            player_tx,
            player_rx,
        };
        Ok((coordinator, handle))
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs until `shutdown` is requested or every handle is dropped.
    pub async fn run(mut self) {
        self.restore_persisted_job();
        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        debug!("all coordinator handles dropped");
                        break;
                    };
                    if self.handle_command(command).await.is_break() {
                        break;
                    }
                }
                Some(event) = self.timer_rx.recv() => self.on_timer(event).await,
                Some(event) = self.player_rx.recv() => self.on_player_event(event).await,
            }
        }
        let report = self.ctx.reset().await;
        debug!(?report, "coordinator stopped");
    }

    async fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Submit { source, reply } => {
                let _ = reply.send(self.submit(source).await);
            }
            Command::Load { url, reply } => {
                let _ = reply.send(self.load(&url).await);
            }
            Command::JobState { reply } => {
                let _ = reply.send(self.ctx.monitor.snapshot());
            }
            Command::PlaybackState { reply } => {
                let _ = reply.send(self.ctx.playback.state());
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::UserActivity => self.reset_idle_watchdog(),
            Command::Cleanup { reply } => {
                let _ = reply.send(self.cleanup().await);
            }
            Command::Shutdown { reply } => {
                // the persisted job stays so a later run can resume it
                let report = self.ctx.reset().await;
                info!(job_id = ?report.job_id, "coordinator shutting down");
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            job: self.ctx.monitor.snapshot(),
            playback: self.ctx.playback.state(),
            stream_url: self.ctx.playback.stream_url().map(str::to_string),
            transport: self.ctx.playback.transport(),
            live_timers: self.ctx.live_timers(),
            player_live: self.ctx.player.is_some(),
        }
    }

    fn restore_persisted_job(&mut self) {
        let persisted = match self.collaborators.store.load() {
            Ok(persisted) => persisted,
            Err(err) => {
                warn!(error = %err, "failed to read persisted job");
                None
            }
        };
        let Some(job_id) = persisted else {
            return;
        };
        if self.config.session.resume_persisted_job {
            info!(%job_id, "resuming persisted job");
            self.status.info("Resuming monitoring of existing job...");
            self.ctx.monitor.begin(job_id.clone());
            self.start_polling(job_id);
        } else {
            info!(%job_id, "discarding persisted job");
            self.clear_persisted_job();
        }
    }

    async fn submit(&mut self, source: MediaSource) -> CoordinatorResult<JobId> {
        self.status.info("Starting transcoding process...");
        if let Err(err) = self.collaborators.validator.validate(&source) {
            self.status.error(err.to_string());
            return Err(JobError::from(err).into());
        }

        let source_url = match &source {
            MediaSource::Url(url) => url.clone(),
            MediaSource::File(path) => {
                self.status.info("Uploading file...");
                match self.collaborators.uploader.upload(path).await {
                    Ok(url) => url,
                    Err(err) => {
                        self.status.error(format!("Error uploading file: {err}"));
                        return Err(JobError::from(err).into());
                    }
                }
            }
        };

        let job_id = self.ctx.next_job_id();
        let request = TranscodeRequest {
            job_id: job_id.clone(),
            source: source_url,
            kind: source.kind().to_string(),
            filename: source.file_name(),
            requested_at: Utc::now(),
        };
        let rejection = match self.collaborators.trigger.dispatch(&request).await {
            Ok(DispatchOutcome::Accepted) => None,
            Ok(DispatchOutcome::Rejected { reason }) => Some(reason),
            Err(err) => Some(err.to_string()),
        };
        if let Some(reason) = rejection {
            warn!(%job_id, %reason, "transcode dispatch failed");
            self.status
                .error(format!("Error starting transcoding: {reason}"));
            return Err(JobError::DispatchFailed(reason).into());
        }

        if let Err(err) = self.collaborators.store.save(&job_id) {
            warn!(%job_id, error = %err, "failed to persist job id");
        }
        self.ctx.playback.reset();
        self.ctx.monitor.begin(job_id.clone());
        info!(%job_id, kind = source.kind(), "transcode job accepted");
        self.status
            .info("Transcoding job started. Monitoring progress...");
        self.start_polling(job_id.clone());
        Ok(job_id)
    }

    fn start_polling(&mut self, job_id: JobId) {
        self.ctx.monitor.start_polling(&job_id);
        let period = self.config.monitor.poll_interval();
        let source = Arc::clone(&self.collaborators.status_source);
        let events = self.timer_tx.clone();
        self.ctx.poll_timer.arm(move |generation| async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let fetch = source.fetch_status(&job_id).await;
                let event = TimerEvent::Polled {
                    job_id: job_id.clone(),
                    generation,
                    fetch,
                };
                if events.send(event).is_err() {
                    break;
                }
            }
        });
    }

    async fn on_timer(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::Polled {
                job_id,
                generation,
                fetch,
            } => self.on_polled(job_id, generation, fetch).await,
            TimerEvent::IdleDeadline { generation } => {
                if !self.ctx.idle_timer.fire(generation) {
                    debug!(generation, "stale idle deadline dropped");
                    return;
                }
                let playing = self.ctx.is_playing();
                match self.ctx.watchdog.on_deadline(Instant::now(), playing) {
                    WatchdogDecision::Expire => {
                        self.ctx.playback.idle_timed_out();
                        self.status
                            .info("Session idle. Cleaning up resources to save costs...");
                        self.cleanup().await;
                    }
                    WatchdogDecision::Reschedule(deadline) => self.arm_idle_timer(deadline),
                    WatchdogDecision::Stale => {}
                }
            }
            TimerEvent::EndedGrace { generation } => {
                if self.ctx.grace_timer.fire(generation) {
                    self.cleanup().await;
                }
            }
        }
    }

    async fn on_polled(&mut self, job_id: JobId, generation: u64, fetch: StatusFetch) {
        if !self.ctx.poll_timer.is_current(generation) {
            debug!(%job_id, generation, "stale poll result dropped");
            return;
        }
        let Some(status) = self.ctx.monitor.record_fetch(&job_id, fetch) else {
            debug!(%job_id, "poll result for superseded job dropped");
            return;
        };

        match self.ctx.monitor.on_status(status) {
            MonitorAction::Progress(progress) => self.status.progress(progress),
            MonitorAction::Completed { output_url } => {
                self.ctx.poll_timer.cancel();
                info!(%job_id, %output_url, "transcoding completed");
                self.status.success("Transcoding completed successfully!");
                // load failures are already on the status channel
                let _ = self.load(&output_url).await;
            }
            MonitorAction::Failed { error } => {
                self.ctx.poll_timer.cancel();
                self.clear_persisted_job();
                warn!(%job_id, %error, "transcoding failed");
                self.status.error(format!("Transcoding failed: {error}"));
            }
            MonitorAction::Unknown { raw } => {
                warn!(%job_id, status = %raw, "unknown job status");
                self.status
                    .warning(format!("Unknown job status \"{raw}\", still monitoring..."));
            }
            MonitorAction::Ignored => {}
        }
    }

    async fn load(&mut self, url: &str) -> CoordinatorResult<PlaybackTransport> {
        self.ctx.grace_timer.cancel();
        self.ctx.idle_timer.cancel();
        self.ctx.watchdog.cancel();
        if self.ctx.dispose_player().await {
            let settle = self.config.playback.dispose_settle();
            if !settle.is_zero() {
                sleep(settle).await;
            }
        }

        let plan = self.ctx.playback.begin_load(url);
        let sink = PlayerEventSink::new(plan.generation, self.player_tx.clone());
        let options = PlayerOptions::from(&self.config.player);
        let created = self.collaborators.player_factory.create(
            &self.config.playback.mount_point,
            &options,
            sink,
        );
        let mut player = match created {
            Ok(player) => player,
            Err(err) => {
                self.ctx.playback.load_failed(plan.generation);
                self.status.error(format!("Playback error: {err}"));
                return Err(err.into());
            }
        };
        if let Err(err) = player.set_source(url, plan.transport.mime_type()).await {
            player.dispose().await;
            self.ctx.playback.load_failed(plan.generation);
            self.status.error(format!("Playback error: {err}"));
            return Err(err.into());
        }

        self.ctx.player = Some(player);
        self.ctx.playback.loaded(plan.generation);
        info!(%url, transport = %plan.transport, generation = plan.generation, "stream loaded");
        self.reset_idle_watchdog();
        Ok(plan.transport)
    }

    async fn on_player_event(&mut self, tagged: TaggedPlayerEvent) {
        let action = self
            .ctx
            .playback
            .on_player_event(tagged.generation, &tagged.event);
        match action {
            PlaybackAction::Ignore => {
                debug!(generation = tagged.generation, event = ?tagged.event, "player event dropped");
            }
            PlaybackAction::ResetIdle => self.reset_idle_watchdog(),
            PlaybackAction::ScheduleCleanup => {
                self.ctx.idle_timer.cancel();
                self.ctx.watchdog.cancel();
                self.status
                    .info("Video playback completed. Cleaning up resources...");
                let grace = self.config.playback.ended_grace();
                let events = self.timer_tx.clone();
                self.ctx.grace_timer.arm(move |generation| async move {
                    sleep(grace).await;
                    let _ = events.send(TimerEvent::EndedGrace { generation });
                });
            }
            PlaybackAction::ReportError(message) => {
                warn!(%message, "player error");
                self.status.error(format!("Playback error: {message}"));
            }
        }
    }

    fn reset_idle_watchdog(&mut self) {
        if self.ctx.player.is_none() || !self.ctx.playback.is_active() {
            return;
        }
        if self.ctx.grace_timer.is_live() {
            return;
        }
        let deadline = self.ctx.watchdog.reset(Instant::now());
        self.arm_idle_timer(deadline);
    }

    fn arm_idle_timer(&mut self, deadline: Instant) {
        let events = self.timer_tx.clone();
        self.ctx.idle_timer.arm(move |generation| async move {
            sleep_until(deadline).await;
            let _ = events.send(TimerEvent::IdleDeadline { generation });
        });
    }

    async fn cleanup(&mut self) -> ResetReport {
        let report = self.ctx.reset().await;
        self.clear_persisted_job();
        if let Some(job_id) = &report.job_id {
            self.collaborators.notifier.notify(job_id).await;
        }
        if report.is_empty() {
            debug!("cleanup found nothing to release");
        } else {
            info!(
                job_id = ?report.job_id,
                timers = report.timers_cancelled,
                player = report.player_disposed,
                "session resources released"
            );
            self.status.success("Resources cleaned up successfully");
        }
        report
    }

    fn clear_persisted_job(&self) {
        if let Err(err) = self.collaborators.store.clear() {
            warn!(error = %err, "failed to clear persisted job");
        }
    }
}
