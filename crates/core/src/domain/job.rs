// Job Domain Model

use crate::domain::document::DocumentRef;
use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Job ID (UUID v4, simple hex form)
pub type JobId = String;

/// Job lifecycle state
///
/// `Created -> Extracting -> Uploading -> Comparing -> Done`, with an escape
/// from any non-terminal state to `CriticalFailure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Created,
    Extracting,
    Uploading,
    Comparing,
    Done,
    CriticalFailure,
}

impl JobState {
    pub const ALL: [JobState; 6] = [
        JobState::Created,
        JobState::Extracting,
        JobState::Uploading,
        JobState::Comparing,
        JobState::Done,
        JobState::CriticalFailure,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::CriticalFailure)
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.to_string() == s)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Created => write!(f, "CREATED"),
            JobState::Extracting => write!(f, "EXTRACTING"),
            JobState::Uploading => write!(f, "UPLOADING"),
            JobState::Comparing => write!(f, "COMPARING"),
            JobState::Done => write!(f, "DONE"),
            JobState::CriticalFailure => write!(f, "CRITICAL_FAILURE"),
        }
    }
}

/// Job Entity
///
/// Owned by exactly one orchestrator run. The comparison document list is
/// fixed at creation and determines the number of cells per Report row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub primary_document: DocumentRef,
    pub comparison_documents: Vec<DocumentRef>,
    pub state: JobState,

    pub created_at: i64, // epoch ms
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,

    pub error: Option<String>,
}

impl Job {
    /// Create a new Job
    ///
    /// # Arguments
    ///
    /// * `id` - Unique job ID (injected, not generated)
    /// * `created_at` - Creation timestamp in epoch ms (injected, not system time)
    /// * `primary_document` - Document whose articles form the Report rows
    /// * `comparison_documents` - Documents compared against, in column order
    pub fn new(
        id: impl Into<String>,
        created_at: i64,
        primary_document: DocumentRef,
        comparison_documents: Vec<DocumentRef>,
    ) -> Self {
        Self {
            id: id.into(),
            primary_document,
            comparison_documents,
            state: JobState::Created,
            created_at,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    /// Create a test job with deterministic ID and timestamp.
    ///
    /// Uses a simple counter for deterministic test IDs (test-1, test-2, ...).
    ///
    /// **Note**: This method should only be used in tests. For production code,
    /// always inject ID and time via providers.
    pub fn new_test(primary: &str, comparisons: &[&str]) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static TEST_COUNTER: AtomicU64 = AtomicU64::new(1);

        let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        Self::new(
            format!("test-{}", counter),
            (counter * 1000) as i64,
            DocumentRef::new(primary),
            comparisons.iter().map(|p| DocumentRef::new(*p)).collect(),
        )
    }

    fn transition(&mut self, expected: JobState, next: JobState) -> Result<()> {
        if self.state != expected {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        Ok(())
    }

    /// Transition to Extracting with explicit timestamp
    pub fn begin_extraction(&mut self, now_millis: i64) -> Result<()> {
        self.transition(JobState::Created, JobState::Extracting)?;
        self.started_at = Some(now_millis);
        Ok(())
    }

    pub fn begin_upload(&mut self) -> Result<()> {
        self.transition(JobState::Extracting, JobState::Uploading)
    }

    pub fn begin_comparison(&mut self) -> Result<()> {
        self.transition(JobState::Uploading, JobState::Comparing)
    }

    /// Transition to Done with explicit timestamp
    pub fn complete(&mut self, now_millis: i64) -> Result<()> {
        self.transition(JobState::Comparing, JobState::Done)?;
        self.finished_at = Some(now_millis);
        Ok(())
    }

    /// Escape transition into CriticalFailure (from any non-terminal state)
    pub fn fail_critically(&mut self, now_millis: i64, details: impl Into<String>) -> Result<()> {
        if self.state.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: JobState::CriticalFailure.to_string(),
            });
        }
        self.state = JobState::CriticalFailure;
        self.finished_at = Some(now_millis);
        self.error = Some(details.into());
        Ok(())
    }
}
