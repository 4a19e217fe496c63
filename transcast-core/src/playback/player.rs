use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::PlayerSection;

use super::error::{PlaybackError, PlaybackResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    Play,
    Pause,
    Ended,
    Error(String),
}

/// Player event stamped with the session generation of the handle that
/// raised it, so events from a disposed handle can be told apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedPlayerEvent {
    pub generation: u64,
    pub event: PlayerEvent,
}

#[derive(Debug, Clone)]
pub struct PlayerEventSink {
    generation: u64,
    sender: mpsc::UnboundedSender<TaggedPlayerEvent>,
}

impl PlayerEventSink {
    pub fn new(generation: u64, sender: mpsc::UnboundedSender<TaggedPlayerEvent>) -> Self {
        Self { generation, sender }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns false once the receiving side is gone.
    pub fn emit(&self, event: PlayerEvent) -> bool {
        self.sender
            .send(TaggedPlayerEvent {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HotkeyOptions {
    pub volume_step: f32,
    pub seek_step_seconds: u32,
    pub enable_modifiers_for_numbers: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerOptions {
    pub controls: bool,
    pub fluid: bool,
    pub responsive: bool,
    pub playback_rates: Vec<f32>,
    pub hotkeys: HotkeyOptions,
}

impl From<&PlayerSection> for PlayerOptions {
    fn from(section: &PlayerSection) -> Self {
        Self {
            controls: section.controls,
            fluid: section.fluid,
            responsive: section.fluid,
            playback_rates: section.playback_rates.clone(),
            hotkeys: HotkeyOptions {
                volume_step: section.volume_step,
                seek_step_seconds: section.seek_step_seconds,
                enable_modifiers_for_numbers: false,
            },
        }
    }
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self::from(&PlayerSection::default())
    }
}

#[async_trait]
pub trait PlayerHandle: Send {
    async fn set_source(&mut self, url: &str, mime_type: &str) -> PlaybackResult<()>;

    fn is_playing(&self) -> bool;

    /// Releases the player. Returns only once nothing of it is left running;
    /// calling it again is a no-op.
    async fn dispose(&mut self);
}

pub trait PlayerFactory: Send + Sync {
    fn create(
        &self,
        mount_point: &str,
        options: &PlayerOptions,
        events: PlayerEventSink,
    ) -> PlaybackResult<Box<dyn PlayerHandle>>;
}

/// Plays streams through an external player binary (ffplay, mpv, ...).
#[derive(Debug, Clone)]
pub struct ProcessPlayerFactory {
    command: String,
    args: Vec<String>,
}

impl ProcessPlayerFactory {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    pub fn from_config(section: &PlayerSection) -> Self {
        Self::new(section.command.clone(), section.args.clone())
    }
}

impl PlayerFactory for ProcessPlayerFactory {
    fn create(
        &self,
        mount_point: &str,
        options: &PlayerOptions,
        events: PlayerEventSink,
    ) -> PlaybackResult<Box<dyn PlayerHandle>> {
        if self.command.trim().is_empty() {
            return Err(PlaybackError::Create {
                mount_point: mount_point.to_string(),
                reason: "player command is empty".into(),
            });
        }
        debug!(mount_point, command = %self.command, controls = options.controls, "creating player");
        Ok(Box::new(ProcessPlayerHandle {
            command: self.command.clone(),
            args: self.args.clone(),
            events,
            playing: Arc::new(AtomicBool::new(false)),
            running: None,
        }))
    }
}

struct RunningPlayer {
    stop: oneshot::Sender<()>,
    waiter: JoinHandle<()>,
}

pub struct ProcessPlayerHandle {
    command: String,
    args: Vec<String>,
    events: PlayerEventSink,
    playing: Arc<AtomicBool>,
    running: Option<RunningPlayer>,
}

impl ProcessPlayerHandle {
    async fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.stop.send(());
            if let Err(err) = running.waiter.await {
                warn!(error = %err, "player waiter task failed");
            }
        }
        self.playing.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl PlayerHandle for ProcessPlayerHandle {
    async fn set_source(&mut self, url: &str, mime_type: &str) -> PlaybackResult<()> {
        self.stop().await;

        let mut command = Command::new(&self.command);
        command
            .args(&self.args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        let mut child = command.spawn().map_err(|source| PlaybackError::Spawn {
            command: self.command.clone(),
            source,
        })?;
        info!(command = %self.command, %url, mime_type, pid = ?child.id(), "player started");

        self.playing.store(true, Ordering::SeqCst);
        self.events.emit(PlayerEvent::Play);

        let (stop_tx, stop_rx) = oneshot::channel();
        let playing = Arc::clone(&self.playing);
        let events = self.events.clone();
        let waiter = tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    playing.store(false, Ordering::SeqCst);
                    match status {
                        Ok(status) if status.success() => {
                            events.emit(PlayerEvent::Ended);
                        }
                        Ok(status) => {
                            events.emit(PlayerEvent::Error(format!("player exited with {status}")));
                        }
                        Err(err) => {
                            events.emit(PlayerEvent::Error(err.to_string()));
                        }
                    }
                }
                _ = stop_rx => {
                    if let Err(err) = child.kill().await {
                        debug!(error = %err, "player already exited");
                    }
                    playing.store(false, Ordering::SeqCst);
                }
            }
        });
        self.running = Some(RunningPlayer {
            stop: stop_tx,
            waiter,
        });
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    async fn dispose(&mut self) {
        self.stop().await;
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sink() -> (PlayerEventSink, mpsc::UnboundedReceiver<TaggedPlayerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (PlayerEventSink::new(7, tx), rx)
    }

    #[tokio::test]
    async fn finished_process_reports_ended() {
        let (events, mut rx) = sink();
        let factory = ProcessPlayerFactory::new("true", Vec::new());
        let mut handle = factory
            .create("videoPlayer", &PlayerOptions::default(), events)
            .unwrap();
        handle.set_source("clip.mp4", "video/mp4").await.unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            TaggedPlayerEvent {
                generation: 7,
                event: PlayerEvent::Play
            }
        );
        assert_eq!(rx.recv().await.unwrap().event, PlayerEvent::Ended);
        assert!(!handle.is_playing());
        handle.dispose().await;
    }

    #[tokio::test]
    async fn dispose_kills_running_process_without_ended_event() {
        let (events, mut rx) = sink();
        let factory = ProcessPlayerFactory::new("sleep", Vec::new());
        let mut handle = factory
            .create("videoPlayer", &PlayerOptions::default(), events)
            .unwrap();
        handle.set_source("30", "video/mp4").await.unwrap();
        assert!(handle.is_playing());

        handle.dispose().await;
        assert!(!handle.is_playing());
        handle.dispose().await;

        assert_eq!(rx.recv().await.unwrap().event, PlayerEvent::Play);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let (events, _rx) = sink();
        let factory = ProcessPlayerFactory::new("/nonexistent/player-binary", Vec::new());
        let mut handle = factory
            .create("videoPlayer", &PlayerOptions::default(), events)
            .unwrap();
        let err = handle.set_source("a.mp4", "video/mp4").await.unwrap_err();
        assert!(matches!(err, PlaybackError::Spawn { .. }));
        assert!(!handle.is_playing());
    }

    #[test]
    fn empty_command_cannot_create_player() {
        let (events, _rx) = sink();
        let factory = ProcessPlayerFactory::new(" ", Vec::new());
        assert!(factory
            .create("videoPlayer", &PlayerOptions::default(), events)
            .is_err());
    }

    #[test]
    fn options_follow_config() {
        let options = PlayerOptions::default();
        assert!(options.controls);
        assert_eq!(options.playback_rates, vec![0.5, 1.0, 1.25, 1.5, 2.0]);
        assert_eq!(options.hotkeys.seek_step_seconds, 5);
    }
}
