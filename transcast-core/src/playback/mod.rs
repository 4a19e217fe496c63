pub mod error;
pub mod player;
pub mod session;
pub mod transport;
pub mod watchdog;

pub use error::{PlaybackError, PlaybackResult};
pub use player::{
    HotkeyOptions, PlayerEvent, PlayerEventSink, PlayerFactory, PlayerHandle, PlayerOptions,
    ProcessPlayerFactory, ProcessPlayerHandle, TaggedPlayerEvent,
};
pub use session::{LoadPlan, PlaybackAction, PlaybackSession, PlaybackState};
pub use transport::{select_transport, PlaybackTransport};
pub use watchdog::{IdleWatchdog, WatchdogDecision};
