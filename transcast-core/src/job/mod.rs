pub mod error;
pub mod models;
pub mod monitor;
pub mod source;
pub mod status_source;
pub mod trigger;

pub use error::{JobError, JobResult, TriggerError, UploadError, ValidationError};
pub use models::{Job, JobId, JobIdGenerator, JobState, JobStatus, StatusDocument};
pub use monitor::{JobMonitor, MonitorAction};
pub use source::{
    media_type_for_path, MediaSource, MediaSourceValidator, SourceValidator, StagingUploader,
    Uploader,
};
pub use status_source::{HttpStatusSource, StatusFetch, StatusSource};
pub use trigger::{DispatchOutcome, JobTrigger, SimulatedTrigger, TranscodeRequest};
