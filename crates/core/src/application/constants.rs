// Orchestration constants (ADR: No magic values)
use std::time::Duration;

/// Attempts per external call, first try included
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Linear backoff base: delay before attempt n+1 is `base * n` (5s, 10s, ...)
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(5);

/// Failure label returned when every attempt hit a transient error
pub const MAX_RETRIES_REACHED: &str = "Max retries reached";

/// Failure label for a non-transient provider error
pub const UNEXPECTED_PROVIDER_ERROR: &str = "Unexpected error during generation call";

/// MIME type used when registering extraction artifacts
pub const ARTIFACT_MIME_TYPE: &str = "text/plain";

/// Response MIME type requested from comparison calls
pub const JSON_MIME_TYPE: &str = "application/json";

/// Error details recorded for jobs found mid-flight at daemon start
pub const INTERRUPTED_JOB_DETAILS: &str = "interrupted by daemon restart";

/// How long the daemon waits for running jobs on shutdown (5 seconds)
pub const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
