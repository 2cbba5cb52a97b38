// Crash recovery logic (ADR-002)
use crate::application::constants::INTERRUPTED_JOB_DETAILS;
use crate::domain::{JobState, Report};
use crate::port::{JobRepository, ResultStore, TimeProvider};
use std::sync::Arc;
use tracing::{error, info, warn};

/// States a job can only be in while an orchestrator owns it
const INTERRUPTIBLE_STATES: [JobState; 4] = [
    JobState::Created,
    JobState::Extracting,
    JobState::Uploading,
    JobState::Comparing,
];

/// Crash recovery service
///
/// On daemon startup no orchestrator is running yet, so every non-terminal
/// job was interrupted by the previous process exit. Jobs are never resumed.
pub struct RecoveryService {
    job_repo: Arc<dyn JobRepository>,
    results: Arc<dyn ResultStore>,
    time_provider: Arc<dyn TimeProvider>,
}

impl RecoveryService {
    pub fn new(
        job_repo: Arc<dyn JobRepository>,
        results: Arc<dyn ResultStore>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            job_repo,
            results,
            time_provider,
        }
    }

    /// Move interrupted jobs to CRITICAL_FAILURE and write their terminal Report.
    ///
    /// # Returns
    /// Number of jobs recovered
    pub async fn recover_interrupted_jobs(&self) -> crate::error::Result<usize> {
        info!("Starting interrupted job recovery");
        let mut recovered_count = 0;

        for state in INTERRUPTIBLE_STATES {
            for mut job in self.job_repo.find_by_state(state).await? {
                warn!(job_id = %job.id, state = %state, "Recovering interrupted job");

                if let Err(e) = self
                    .results
                    .write(&job.id, &Report::critical(INTERRUPTED_JOB_DETAILS))
                    .await
                {
                    error!(job_id = %job.id, error = %e, "Failed to write failure report");
                }

                job.fail_critically(self.time_provider.now_millis(), INTERRUPTED_JOB_DETAILS)?;
                match self.job_repo.update(&job).await {
                    Ok(()) => recovered_count += 1,
                    Err(e) => error!(job_id = %job.id, error = %e, "Failed to mark job as failed"),
                }
            }
        }

        if recovered_count > 0 {
            info!(recovered_count = recovered_count, "Interrupted jobs recovered");
        } else {
            info!("No interrupted jobs found");
        }

        Ok(recovered_count)
    }
}
