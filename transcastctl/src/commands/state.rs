use clap::Subcommand;
use serde::Serialize;
use transcast_core::{JobId, JobStateStore};

use crate::{DisplayFallback, Result};

#[derive(Subcommand, Debug, Clone)]
pub enum StateCommands {
    /// Shows the persisted job id
    Show,
    /// Forgets the persisted job id
    Clear,
}

#[derive(Debug, Serialize)]
pub struct StateReport {
    pub job_id: Option<JobId>,
    pub cleared: bool,
}

impl DisplayFallback for StateReport {
    fn display(&self) -> String {
        match (&self.job_id, self.cleared) {
            (Some(id), true) => format!("cleared persisted job {id}"),
            (Some(id), false) => format!("persisted job: {id}"),
            (None, _) => "no persisted job".to_string(),
        }
    }
}

pub fn run(command: &StateCommands, store: &dyn JobStateStore) -> Result<StateReport> {
    let job_id = store.load()?;
    match command {
        StateCommands::Show => Ok(StateReport {
            job_id,
            cleared: false,
        }),
        StateCommands::Clear => {
            store.clear()?;
            Ok(StateReport {
                cleared: job_id.is_some(),
                job_id,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transcast_core::MemoryJobStore;

    #[test]
    fn clear_reports_forgotten_job() {
        let id = JobId::parse("job_1_abcdefghi").unwrap();
        let store = MemoryJobStore::with_job(id.clone());

        let shown = run(&StateCommands::Show, &store).unwrap();
        assert_eq!(shown.job_id, Some(id.clone()));

        let cleared = run(&StateCommands::Clear, &store).unwrap();
        assert!(cleared.cleared);
        assert_eq!(cleared.display(), format!("cleared persisted job {id}"));

        let again = run(&StateCommands::Clear, &store).unwrap();
        assert!(!again.cleared);
        assert_eq!(again.display(), "no persisted job");
    }
}
