use crate::config::TranscastConfig;
use crate::job::{JobId, JobIdGenerator, JobMonitor};
use crate::playback::{IdleWatchdog, PlaybackSession, PlayerHandle};

use super::timer::TimerSlot;

/// What a reset tore down.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetReport {
    pub job_id: Option<JobId>,
    pub timers_cancelled: usize,
    pub player_disposed: bool,
    pub stream_cleared: bool,
}

impl ResetReport {
    pub fn is_empty(&self) -> bool {
        self.job_id.is_none()
            && self.timers_cancelled == 0
            && !self.player_disposed
            && !self.stream_cleared
    }
}

/// Everything one coordinator owns between `create` and `reset`: both state
/// machines, the three timer slots and the live player handle.
pub struct SessionContext {
    pub monitor: JobMonitor,
    pub playback: PlaybackSession,
    pub watchdog: IdleWatchdog,
    pub poll_timer: TimerSlot,
    pub idle_timer: TimerSlot,
    pub grace_timer: TimerSlot,
    pub player: Option<Box<dyn PlayerHandle>>,
    ids: JobIdGenerator,
}

impl SessionContext {
    pub fn create(config: &TranscastConfig) -> Self {
        Self {
            monitor: JobMonitor::new(config.monitor.clone()),
            playback: PlaybackSession::new(),
            watchdog: IdleWatchdog::new(config.playback.idle_timeout()),
            poll_timer: TimerSlot::new("poll"),
            idle_timer: TimerSlot::new("idle"),
            grace_timer: TimerSlot::new("ended_grace"),
            player: None,
            ids: JobIdGenerator::new(),
        }
    }

    pub fn next_job_id(&mut self) -> JobId {
        self.ids.next_id()
    }

    pub fn current_job(&self) -> Option<&JobId> {
        self.monitor.active().map(|job| &job.id)
    }

    pub fn live_timers(&self) -> usize {
        [&self.poll_timer, &self.idle_timer, &self.grace_timer]
            .iter()
            .filter(|slot| slot.is_live())
            .count()
    }

    pub fn is_playing(&self) -> bool {
        self.player
            .as_ref()
            .map(|player| player.is_playing())
            .unwrap_or(false)
    }

    /// Disposes the live handle, waiting for it to finish.
    pub async fn dispose_player(&mut self) -> bool {
        match self.player.take() {
            Some(mut player) => {
                player.dispose().await;
                true
            }
            None => false,
        }
    }

    /// Cancels every timer, disposes the player and forgets the job. The id
    /// generator survives so ids stay unique across resets.
    pub async fn reset(&mut self) -> ResetReport {
        let timers_cancelled = [
            self.poll_timer.cancel(),
            self.idle_timer.cancel(),
            self.grace_timer.cancel(),
        ]
        .into_iter()
        .filter(|cancelled| *cancelled)
        .count();
        self.watchdog.cancel();
        let player_disposed = self.dispose_player().await;
        let stream_cleared = self.playback.cleanup();
        let job_id = self.monitor.clear();
        ResetReport {
            job_id,
            timers_cancelled,
            player_disposed,
            stream_cleared,
        }
    }
}
