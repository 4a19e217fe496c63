use std::fmt;

use serde::Serialize;
use tracing::debug;

use super::player::PlayerEvent;
use super::transport::{select_transport, PlaybackTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Ended,
    IdleTimeout,
    Cleaned,
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading => "loading",
            PlaybackState::Ready => "ready",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Ended => "ended",
            PlaybackState::IdleTimeout => "idle_timeout",
            PlaybackState::Cleaned => "cleaned",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the coordinator must do after a player event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackAction {
    /// Stale or irrelevant event.
    Ignore,
    /// Restart the idle watchdog.
    ResetIdle,
    /// Arm the ended-grace timer.
    ScheduleCleanup,
    ReportError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadPlan {
    pub generation: u64,
    pub transport: PlaybackTransport,
}

/// Player lifecycle bookkeeping. The handle itself lives in the session
/// context; this only tracks which generation is current.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    state: PlaybackState,
    stream_url: Option<String>,
    transport: Option<PlaybackTransport>,
    generation: u64,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Idle,
            stream_url: None,
            transport: None,
            generation: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn stream_url(&self) -> Option<&str> {
        self.stream_url.as_deref()
    }

    pub fn transport(&self) -> Option<PlaybackTransport> {
        self.transport
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Starts a new load. Every load bumps the generation so that events
    /// raised by the previous handle are ignored from here on.
    pub fn begin_load(&mut self, stream_url: &str) -> LoadPlan {
        self.generation += 1;
        let transport = select_transport(stream_url);
        self.state = PlaybackState::Loading;
        self.stream_url = Some(stream_url.to_string());
        self.transport = Some(transport);
        debug!(generation = self.generation, %transport, "playback load started");
        LoadPlan {
            generation: self.generation,
            transport,
        }
    }

    pub fn loaded(&mut self, generation: u64) {
        if generation == self.generation && self.state == PlaybackState::Loading {
            self.state = PlaybackState::Ready;
        }
    }

    pub fn load_failed(&mut self, generation: u64) {
        if generation == self.generation {
            self.state = PlaybackState::Idle;
            self.stream_url = None;
            self.transport = None;
        }
    }

    pub fn on_player_event(&mut self, generation: u64, event: &PlayerEvent) -> PlaybackAction {
        if generation != self.generation || !self.is_active() {
            return PlaybackAction::Ignore;
        }
        match event {
            PlayerEvent::Play => {
                self.state = PlaybackState::Playing;
                PlaybackAction::ResetIdle
            }
            PlayerEvent::Pause => {
                self.state = PlaybackState::Paused;
                PlaybackAction::ResetIdle
            }
            PlayerEvent::Ended => {
                self.state = PlaybackState::Ended;
                PlaybackAction::ScheduleCleanup
            }
            PlayerEvent::Error(message) => PlaybackAction::ReportError(message.clone()),
        }
    }

    pub fn idle_timed_out(&mut self) {
        if self.is_active() {
            self.state = PlaybackState::IdleTimeout;
        }
    }

    /// Marks the session cleaned. Returns whether anything was loaded.
    pub fn cleanup(&mut self) -> bool {
        let had_stream = self.stream_url.take().is_some();
        self.transport = None;
        if had_stream || self.state != PlaybackState::Idle {
            self.state = PlaybackState::Cleaned;
        }
        // bump so a handle event that raced the teardown is dropped
        self.generation += 1;
        had_stream
    }

    /// Back to `Idle` after a cleanup.
    pub fn reset(&mut self) {
        if self.state == PlaybackState::Cleaned {
            self.state = PlaybackState::Idle;
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            PlaybackState::Loading
                | PlaybackState::Ready
                | PlaybackState::Playing
                | PlaybackState::Paused
                | PlaybackState::Ended
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_walks_through_ready_and_playing() {
        let mut session = PlaybackSession::new();
        let plan = session.begin_load("https://cdn.example.com/out/playlist.m3u8");
        assert_eq!(plan.transport, PlaybackTransport::Hls);
        assert_eq!(session.state(), PlaybackState::Loading);

        session.loaded(plan.generation);
        assert_eq!(session.state(), PlaybackState::Ready);

        assert_eq!(
            session.on_player_event(plan.generation, &PlayerEvent::Play),
            PlaybackAction::ResetIdle
        );
        assert_eq!(session.state(), PlaybackState::Playing);
        assert_eq!(
            session.on_player_event(plan.generation, &PlayerEvent::Pause),
            PlaybackAction::ResetIdle
        );
        assert_eq!(session.state(), PlaybackState::Paused);
    }

    #[test]
    fn ended_schedules_cleanup() {
        let mut session = PlaybackSession::new();
        let plan = session.begin_load("https://cdn.example.com/video.mp4");
        session.loaded(plan.generation);
        assert_eq!(
            session.on_player_event(plan.generation, &PlayerEvent::Ended),
            PlaybackAction::ScheduleCleanup
        );
        assert_eq!(session.state(), PlaybackState::Ended);
    }

    #[test]
    fn events_from_previous_generation_are_ignored() {
        let mut session = PlaybackSession::new();
        let first = session.begin_load("https://cdn.example.com/a.mp4");
        let second = session.begin_load("https://cdn.example.com/b.mpd");
        assert_ne!(first.generation, second.generation);
        assert_eq!(
            session.on_player_event(first.generation, &PlayerEvent::Ended),
            PlaybackAction::Ignore
        );
        assert_eq!(session.state(), PlaybackState::Loading);
        assert_eq!(session.transport(), Some(PlaybackTransport::Dash));
    }

    #[test]
    fn errors_are_reported_without_state_change() {
        let mut session = PlaybackSession::new();
        let plan = session.begin_load("https://cdn.example.com/a.mp4");
        session.loaded(plan.generation);
        assert_eq!(
            session.on_player_event(plan.generation, &PlayerEvent::Error("decode".into())),
            PlaybackAction::ReportError("decode".into())
        );
        assert_eq!(session.state(), PlaybackState::Ready);
    }

    #[test]
    fn cleanup_then_reset_returns_to_idle() {
        let mut session = PlaybackSession::new();
        let plan = session.begin_load("https://cdn.example.com/a.mp4");
        session.loaded(plan.generation);
        session.idle_timed_out();
        assert_eq!(session.state(), PlaybackState::IdleTimeout);

        assert!(session.cleanup());
        assert_eq!(session.state(), PlaybackState::Cleaned);
        assert!(!session.cleanup());
        assert_eq!(
            session.on_player_event(plan.generation, &PlayerEvent::Play),
            PlaybackAction::Ignore
        );

        session.reset();
        assert_eq!(session.state(), PlaybackState::Idle);
        assert!(session.stream_url().is_none());
    }

    #[test]
    fn failed_load_falls_back_to_idle() {
        let mut session = PlaybackSession::new();
        let plan = session.begin_load("https://cdn.example.com/a.mp4");
        session.load_failed(plan.generation);
        assert_eq!(session.state(), PlaybackState::Idle);
        assert!(!session.is_active());
    }
}
