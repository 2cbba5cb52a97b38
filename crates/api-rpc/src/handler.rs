//! RPC Method Handlers
//!
//! Thin adapters from JSON-RPC parameters to the application services.

use crate::error::{throttled, to_rpc_error};
use crate::rate_limiter::RateLimiter;
use crate::types::{
    ResultsRequest, ResultsResponse, RowRequest, RowResponse, StatsResponse, SubmitDemoRequest,
    SubmitRequest, SubmitResponse, STATUS_PROCESSING,
};
use jsonrpsee::types::ErrorObjectOwned;
use lexcompare_core::application::{JobProgress, JobRunner, StatusService, SubmissionService};
use lexcompare_core::domain::{JobId, JobState};
use lexcompare_core::error::AppError;
use lexcompare_core::port::id_provider::is_job_id;
use lexcompare_core::port::JobRepository;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Default submission budget: burst of 20, 2 per second
pub const DEFAULT_RATE_LIMIT_BURST: u32 = 20;
pub const DEFAULT_RATE_LIMIT_RATE: u32 = 2;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    submission: Arc<SubmissionService>,
    status: Arc<StatusService>,
    job_repo: Arc<dyn JobRepository>,
    runner: Arc<JobRunner>,
    rate_limiter: RateLimiter,
    start_time: Instant,
}

impl RpcHandler {
    pub fn new(
        submission: Arc<SubmissionService>,
        status: Arc<StatusService>,
        job_repo: Arc<dyn JobRepository>,
        runner: Arc<JobRunner>,
        rate_limiter: RateLimiter,
    ) -> Self {
        Self {
            submission,
            status,
            job_repo,
            runner,
            rate_limiter,
            start_time: Instant::now(),
        }
    }

    /// comparison.submit.v1
    pub async fn submit(&self, params: SubmitRequest) -> Result<SubmitResponse, ErrorObjectOwned> {
        if !self.rate_limiter.check() {
            return Err(throttled());
        }

        let comparisons: Vec<PathBuf> = params.comparison_paths.iter().map(PathBuf::from).collect();
        let job_id = self
            .submission
            .submit(&PathBuf::from(&params.primary_path), &comparisons)
            .await
            .map_err(to_rpc_error)?;

        Ok(processing(job_id))
    }

    /// comparison.submit_demo.v1
    pub async fn submit_demo(
        &self,
        params: SubmitDemoRequest,
    ) -> Result<SubmitResponse, ErrorObjectOwned> {
        if !self.rate_limiter.check() {
            return Err(throttled());
        }

        let job_id = self
            .submission
            .submit_demo(&params.primary_file, &params.comparison_files)
            .await
            .map_err(to_rpc_error)?;

        Ok(processing(job_id))
    }

    /// comparison.results.v1
    pub async fn results(
        &self,
        params: ResultsRequest,
    ) -> Result<ResultsResponse, ErrorObjectOwned> {
        check_job_id(&params.job_id)?;
        let progress = self
            .status
            .results(&params.job_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(results_response(params.job_id, progress))
    }

    /// comparison.row.v1
    pub async fn row(&self, params: RowRequest) -> Result<RowResponse, ErrorObjectOwned> {
        check_job_id(&params.job_id)?;
        let context = self
            .status
            .row(&params.job_id, params.article_index)
            .await
            .map_err(to_rpc_error)?;

        Ok(RowResponse {
            base_article: context.base_article,
            similar_articles: context.similar_articles,
        })
    }

    /// admin.stats.v1
    pub async fn stats(&self) -> Result<StatsResponse, ErrorObjectOwned> {
        let mut jobs_by_state = BTreeMap::new();
        let mut total_jobs = 0;
        for state in JobState::ALL {
            let count = self
                .job_repo
                .count_by_state(state)
                .await
                .map_err(to_rpc_error)?;
            total_jobs += count;
            jobs_by_state.insert(state.to_string(), count);
        }

        Ok(StatsResponse {
            total_jobs,
            jobs_by_state,
            running_jobs: self.runner.running(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        })
    }
}

/// Ids arrive from clients and name files on disk
fn check_job_id(job_id: &str) -> Result<(), ErrorObjectOwned> {
    if is_job_id(job_id) {
        Ok(())
    } else {
        Err(to_rpc_error(AppError::Validation(format!(
            "Malformed job id: {:?}",
            job_id
        ))))
    }
}

fn processing(job_id: JobId) -> SubmitResponse {
    SubmitResponse {
        job_id,
        status: STATUS_PROCESSING.to_string(),
    }
}

fn results_response(job_id: JobId, progress: JobProgress) -> ResultsResponse {
    match progress {
        JobProgress::Extracting => ResultsResponse {
            job_id,
            status: "extracting".to_string(),
            message: Some("Extracting articles from the primary document".to_string()),
            data: None,
        },
        JobProgress::Initializing(scaffold) => ResultsResponse {
            job_id,
            status: "initializing".to_string(),
            message: Some("Preparing the comparison".to_string()),
            data: Some(scaffold),
        },
        JobProgress::Live { state, report } => ResultsResponse {
            job_id,
            status: state
                .map(|s| s.to_string().to_lowercase())
                .unwrap_or_else(|| STATUS_PROCESSING.to_string()),
            message: None,
            data: Some(report),
        },
        JobProgress::Failed(failure) => ResultsResponse {
            job_id,
            status: "failed".to_string(),
            message: Some(failure.error_message.clone()),
            data: Some(lexcompare_core::domain::Report::Failed(failure)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexcompare_core::domain::{ArticleRecord, Report};

    #[test]
    fn test_live_status_is_lowercase_state() {
        let report = Report::scaffold(&[ArticleRecord::new("1", None, "a")], &["egypt".to_string()]);
        let response = results_response(
            "abc".into(),
            JobProgress::Live {
                state: Some(JobState::Comparing),
                report: report.clone(),
            },
        );
        assert_eq!(response.status, "comparing");
        assert_eq!(response.data, Some(report));
    }

    #[test]
    fn test_failed_status_carries_terminal_object() {
        let failure = match Report::critical("Extraction failed for p.pdf") {
            Report::Failed(f) => f,
            Report::Rows(_) => unreachable!(),
        };
        let response = results_response("abc".into(), JobProgress::Failed(failure));
        assert_eq!(response.status, "failed");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["data"]["status"], "failed");
        assert_eq!(json["data"]["error_details"], "Extraction failed for p.pdf");
    }

    #[test]
    fn test_malformed_job_ids_are_validation_errors() {
        assert!(check_job_id("0123456789abcdef0123456789abcdef").is_ok());
        for bad in ["", "../../etc/passwd", "results_x", "0123456789ABCDEF0123456789ABCDEF"] {
            let err = check_job_id(bad).unwrap_err();
            assert_eq!(err.code(), crate::error::code::VALIDATION_ERROR, "{}", bad);
        }
    }

    #[test]
    fn test_extracting_has_no_data() {
        let json = serde_json::to_value(results_response("abc".into(), JobProgress::Extracting))
            .unwrap();
        assert_eq!(json["status"], "extracting");
        assert!(json.get("data").is_none());
    }
}
