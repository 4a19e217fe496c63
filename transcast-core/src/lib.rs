pub mod config;
pub mod coordinator;
pub mod error;
pub mod job;
pub mod playback;
pub mod session;
pub mod sqlite;
pub mod status;

pub use config::{
    load_transcast_config, CleanupSection, FallbackPolicy, MonitorSection, PlaybackSection,
    PlayerSection, SessionSection, StatusSourceSection, TranscastConfig, TriggerSection,
    UploadSection, ValidationSection, DEFAULT_FALLBACK_OUTPUT_URL,
};
pub use coordinator::{
    Collaborators, Coordinator, CoordinatorError, CoordinatorHandle, CoordinatorResult,
    SessionSnapshot,
};
pub use error::{ConfigError, Result};
pub use job::{
    DispatchOutcome, HttpStatusSource, Job, JobError, JobId, JobIdGenerator, JobMonitor,
    JobResult, JobState, JobStatus, JobTrigger, MediaSource, MediaSourceValidator, MonitorAction,
    SimulatedTrigger, SourceValidator, StagingUploader, StatusDocument, StatusFetch, StatusSource,
    TranscodeRequest, TriggerError, UploadError, Uploader, ValidationError,
};
pub use playback::{
    select_transport, IdleWatchdog, PlaybackAction, PlaybackError, PlaybackResult,
    PlaybackSession, PlaybackState, PlaybackTransport, PlayerEvent, PlayerEventSink,
    PlayerFactory, PlayerHandle, PlayerOptions, ProcessPlayerFactory, TaggedPlayerEvent,
    WatchdogDecision,
};
pub use session::{
    CleanupNotifier, HttpCleanupNotifier, JobStateStore, MemoryJobStore, NoopCleanupNotifier,
    ResetReport, SessionContext, SqliteJobStore, StoreError, TimerSlot,
};
pub use status::{StatusLevel, StatusMessage, StatusReporter};
