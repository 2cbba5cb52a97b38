// Result Store Port (live progress channel)

use crate::domain::{JobId, Report};
use crate::error::Result;
use async_trait::async_trait;

/// Durable per-job Report storage.
///
/// Implementations must make `write` atomic with respect to `read`: a reader
/// observes either the previous Report or the new one, never a partial document.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Replace the job's Report
    async fn write(&self, job_id: &JobId, report: &Report) -> Result<()>;

    /// Current Report, or None if nothing was written yet
    async fn read(&self, job_id: &JobId) -> Result<Option<Report>>;
}

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory ResultStore that keeps every written snapshot
    #[derive(Default)]
    pub struct InMemoryResultStore {
        history: Mutex<HashMap<JobId, Vec<Report>>>,
    }

    impl InMemoryResultStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// All snapshots written for a job, oldest first
        pub fn history(&self, job_id: &str) -> Vec<Report> {
            self.history
                .lock()
                .unwrap()
                .get(job_id)
                .cloned()
                .unwrap_or_default()
        }

        pub fn write_count(&self, job_id: &str) -> usize {
            self.history(job_id).len()
        }
    }

    #[async_trait]
    impl ResultStore for InMemoryResultStore {
        async fn write(&self, job_id: &JobId, report: &Report) -> Result<()> {
            self.history
                .lock()
                .unwrap()
                .entry(job_id.clone())
                .or_default()
                .push(report.clone());
            Ok(())
        }

        async fn read(&self, job_id: &JobId) -> Result<Option<Report>> {
            Ok(self
                .history
                .lock()
                .unwrap()
                .get(job_id)
                .and_then(|h| h.last().cloned()))
        }
    }
}
