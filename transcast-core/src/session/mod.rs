pub mod cleanup;
pub mod context;
pub mod store;
pub mod timer;

pub use cleanup::{CleanupNotifier, CleanupRequest, HttpCleanupNotifier, NoopCleanupNotifier};
pub use context::{ResetReport, SessionContext};
pub use store::{
    JobStateStore, MemoryJobStore, SqliteJobStore, SqliteJobStoreBuilder, StoreError, StoreResult,
};
pub use timer::TimerSlot;
