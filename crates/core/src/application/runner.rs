// Background job runner with panic isolation (ADR-002)
//
// Each job runs in its own task. A panic inside the orchestrator is caught at
// the task boundary and recorded as a critical failure of that job only.

use crate::application::orchestrator::JobOrchestrator;
use crate::domain::Job;
use crate::error::AppError;
use futures::future::join_all;
use std::any::Any;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub struct JobRunner {
    orchestrator: Arc<JobOrchestrator>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl JobRunner {
    pub fn new(orchestrator: Arc<JobOrchestrator>) -> Self {
        Self {
            orchestrator,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Start `job` in the background. Returns immediately.
    pub fn spawn(&self, job: Job) {
        let orchestrator = self.orchestrator.clone();
        let job_id = job.id.clone();

        let task = tokio::spawn(async move {
            let run = {
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move { orchestrator.run(job).await })
            };

            match run.await {
                Ok(state) => debug!(job_id = %job_id, state = %state, "Job task exited"),
                Err(join_err) if join_err.is_panic() => {
                    let panic_msg = panic_message(join_err.into_panic());
                    error!(job_id = %job_id, panic_msg = %panic_msg, "Job task panicked");
                    orchestrator
                        .fail_job(&job_id, AppError::CriticalOrchestrator(panic_msg))
                        .await;
                }
                Err(_) => warn!(job_id = %job_id, "Job task cancelled"),
            }
        });

        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
    }

    /// Number of job tasks still running
    pub fn running(&self) -> usize {
        let tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.iter().filter(|t| !t.is_finished()).count()
    }

    /// Wait up to `timeout` for running jobs. Returns false on timeout.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let tasks: Vec<JoinHandle<()>> = {
            let mut guard = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *guard)
        };
        if tasks.is_empty() {
            return true;
        }

        info!(jobs = tasks.len(), "Draining running jobs");
        match tokio::time::timeout(timeout, join_all(tasks)).await {
            Ok(_) => true,
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "Jobs still running at shutdown");
                false
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
