// Job Repository Port (Interface)

use crate::domain::{Job, JobId, JobState};
use crate::error::Result;
use async_trait::async_trait;

/// Repository interface for the job registry
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert a new job
    async fn insert(&self, job: &Job) -> Result<()>;

    /// Find job by ID
    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>>;

    /// Update job lifecycle fields
    async fn update(&self, job: &Job) -> Result<()>;

    /// Find all jobs by state (for crash recovery)
    async fn find_by_state(&self, state: JobState) -> Result<Vec<Job>>;

    /// Count jobs by state
    async fn count_by_state(&self, state: JobState) -> Result<i64>;
}

pub mod mocks {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// In-memory JobRepository for testing
    #[derive(Default)]
    pub struct InMemoryJobRepository {
        jobs: Mutex<BTreeMap<JobId, Job>>,
        updates: Mutex<Vec<JobState>>,
    }

    impl InMemoryJobRepository {
        pub fn new() -> Self {
            Self::default()
        }

        /// States passed to `update`, in call order
        pub fn state_history(&self) -> Vec<JobState> {
            self.updates.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JobRepository for InMemoryJobRepository {
        async fn insert(&self, job: &Job) -> Result<()> {
            self.jobs.lock().unwrap().insert(job.id.clone(), job.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>> {
            Ok(self.jobs.lock().unwrap().get(id).cloned())
        }

        async fn update(&self, job: &Job) -> Result<()> {
            self.updates.lock().unwrap().push(job.state);
            self.jobs.lock().unwrap().insert(job.id.clone(), job.clone());
            Ok(())
        }

        async fn find_by_state(&self, state: JobState) -> Result<Vec<Job>> {
            Ok(self
                .jobs
                .lock()
                .unwrap()
                .values()
                .filter(|j| j.state == state)
                .cloned()
                .collect())
        }

        async fn count_by_state(&self, state: JobState) -> Result<i64> {
            Ok(self.find_by_state(state).await?.len() as i64)
        }
    }
}
