// Application Layer - Use Cases and Business Logic

pub mod cleanup;
pub mod comparison;
pub mod constants;
pub mod extraction;
pub mod orchestrator;
pub mod output;
pub mod prompts;
pub mod recovery;
pub mod retry;
pub mod runner;
pub mod status;
pub mod submission;
pub mod upload;

// Re-exports
pub use orchestrator::JobOrchestrator;
pub use recovery::RecoveryService;
pub use retry::{CallFailure, RetryConfig, RetryDecision, RetryableCallExecutor};
pub use runner::JobRunner;
pub use status::{JobProgress, RowContext, StatusService};
pub use submission::SubmissionService;
