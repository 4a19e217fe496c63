use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::TranscastConfig;
use crate::job::{
    HttpStatusSource, JobTrigger, MediaSourceValidator, SimulatedTrigger, SourceValidator,
    StagingUploader, StatusSource, Uploader,
};
use crate::playback::{PlayerFactory, ProcessPlayerFactory};
use crate::session::{
    CleanupNotifier, HttpCleanupNotifier, JobStateStore, NoopCleanupNotifier, SqliteJobStore,
};

use super::error::CoordinatorResult;

/// The external services a coordinator talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub validator: Arc<dyn SourceValidator>,
    pub uploader: Arc<dyn Uploader>,
    pub trigger: Arc<dyn JobTrigger>,
    pub status_source: Arc<dyn StatusSource>,
    pub player_factory: Arc<dyn PlayerFactory>,
    pub store: Arc<dyn JobStateStore>,
    pub notifier: Arc<dyn CleanupNotifier>,
}

impl Collaborators {
    /// Builds the default implementations. Relative paths resolve against
    /// `base_dir`, normally the directory holding the config file.
    pub fn from_config(config: &TranscastConfig, base_dir: &Path) -> CoordinatorResult<Self> {
        let status_source = HttpStatusSource::new(
            config.status_source.base_url.clone(),
            Duration::from_secs(config.status_source.request_timeout_seconds),
        )?;
        let store = SqliteJobStore::new(config.resolve_path(base_dir, &config.session.state_db))?;
        let notifier: Arc<dyn CleanupNotifier> = match &config.cleanup.endpoint {
            Some(endpoint) => Arc::new(HttpCleanupNotifier::new(
                endpoint.clone(),
                Duration::from_secs(config.cleanup.timeout_seconds),
            )?),
            None => Arc::new(NoopCleanupNotifier),
        };

        Ok(Self {
            validator: Arc::new(MediaSourceValidator::new(config.validation.clone())),
            uploader: Arc::new(StagingUploader::new(
                config.resolve_path(base_dir, &config.upload.staging_dir),
            )),
            trigger: Arc::new(SimulatedTrigger::new(
                config.trigger.event_type.clone(),
                Duration::from_millis(config.trigger.simulated_delay_ms),
            )),
            status_source: Arc::new(status_source),
            player_factory: Arc::new(ProcessPlayerFactory::from_config(&config.player)),
            store: Arc::new(store),
            notifier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_resolve_state_under_base_dir() {
        let dir = tempdir().unwrap();
        let config = TranscastConfig::default();
        let collaborators = Collaborators::from_config(&config, dir.path()).unwrap();
        assert!(collaborators.store.load().unwrap().is_none());
        assert!(dir.path().join(&config.session.state_db).exists());
    }
}
