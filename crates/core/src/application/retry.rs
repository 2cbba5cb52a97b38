// Retryable external calls (ADR-002: bounded retries, linear backoff)
use crate::application::constants::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY, MAX_RETRIES_REACHED,
    UNEXPECTED_PROVIDER_ERROR,
};
use crate::application::output;
use crate::error::AppError;
use crate::port::{GenerationRequest, GenerationService, ProviderError, Sleeper};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Retry decision result
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the given backoff delay
    Retry(Duration),
    /// Do not retry, the call has failed permanently
    Failed,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_RETRY_BASE_DELAY,
        }
    }
}

/// Structured failure of one external call, returned as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFailure {
    pub error: String,
    pub details: String,
}

impl CallFailure {
    pub fn exhausted(details: impl Into<String>) -> Self {
        Self {
            error: MAX_RETRIES_REACHED.to_string(),
            details: details.into(),
        }
    }

    pub fn fatal(details: impl Into<String>) -> Self {
        Self {
            error: UNEXPECTED_PROVIDER_ERROR.to_string(),
            details: details.into(),
        }
    }
}

impl std::fmt::Display for CallFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.details)
    }
}

impl From<AppError> for CallFailure {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Parse { message, .. } => Self {
                error: "ParseError".to_string(),
                details: message,
            },
            other => Self::fatal(other.to_string()),
        }
    }
}

/// Wraps external generation calls with error classification and bounded retries.
///
/// - Transient errors: retried up to `max_attempts`, sleeping `base * attempt`
///   between attempts (5s, 10s with the defaults)
/// - Fatal errors: no retry
/// - Both end as `CallFailure` values, never as panics or propagated faults
pub struct RetryableCallExecutor {
    config: RetryConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryableCallExecutor {
    pub fn new(config: RetryConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { config, sleeper }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Decide what to do after `attempt` (1-based) failed with `err`
    pub fn decide(&self, attempt: u32, err: &ProviderError) -> RetryDecision {
        if !err.is_transient() || attempt >= self.config.max_attempts {
            return RetryDecision::Failed;
        }
        RetryDecision::Retry(self.config.base_delay * attempt)
    }

    /// Execute `call` until it succeeds, fails fatally, or attempts run out.
    ///
    /// `call` receives the 1-based attempt number.
    pub async fn execute<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, CallFailure>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 1;
        loop {
            let err = match call(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            match self.decide(attempt, &err) {
                RetryDecision::Retry(delay) => {
                    warn!(
                        operation = %operation,
                        attempt = attempt,
                        max_attempts = self.config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient provider error, retrying"
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                RetryDecision::Failed if err.is_transient() => {
                    error!(
                        operation = %operation,
                        attempts = attempt,
                        error = %err,
                        "Max retries reached"
                    );
                    return Err(CallFailure::exhausted(err.to_string()));
                }
                RetryDecision::Failed => {
                    error!(operation = %operation, error = %err, "Fatal provider error");
                    return Err(CallFailure::fatal(err.to_string()));
                }
            }
        }
    }

    /// Generate with retries, then parse the text into a list of `T` records.
    ///
    /// Parse failures are not retried.
    pub async fn generate_records<T: DeserializeOwned>(
        &self,
        operation: &str,
        service: &dyn GenerationService,
        request: &GenerationRequest,
    ) -> Result<Vec<T>, CallFailure> {
        let text = self
            .execute(operation, |_| service.generate(request))
            .await?;

        output::parse_records(&text).map_err(|err| {
            if let AppError::Parse { message, raw } = &err {
                warn!(
                    operation = %operation,
                    reason = %message,
                    raw_response = %raw,
                    "Model output is not a list of records"
                );
            }
            CallFailure::from(err)
        })
    }
}
