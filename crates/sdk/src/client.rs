//! LexCompare Client Implementation

use crate::error::{Result, SdkError};
use crate::types::{
    ResultsRequest, ResultsResponse, RowRequest, RowResponse, StatsResponse, SubmitDemoRequest,
    SubmitRequest, SubmitResponse,
};
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use std::time::Duration;

/// LexCompare daemon client
///
/// # Example
///
/// ```no_run
/// use lexcompare_sdk::LexCompareClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = LexCompareClient::connect("http://127.0.0.1:9617").await?;
/// let stats = client.stats().await?;
/// println!("{} jobs", stats.total_jobs);
/// # Ok(())
/// # }
/// ```
pub struct LexCompareClient {
    client: HttpClient,
}

impl LexCompareClient {
    /// Connect to the daemon
    ///
    /// # Arguments
    ///
    /// * `url` - RPC endpoint URL (e.g., `http://127.0.0.1:9617`)
    pub async fn connect(url: impl AsRef<str>) -> Result<Self> {
        let url = url.as_ref();

        let client = HttpClientBuilder::default()
            .request_timeout(Duration::from_secs(30))
            .build(url)
            .map_err(|e| SdkError::Connection(format!("Failed to create client: {}", e)))?;

        Ok(Self { client })
    }

    /// Submit a comparison job over paths on the daemon's filesystem
    pub async fn submit(
        &self,
        primary_path: impl Into<String>,
        comparison_paths: &[String],
    ) -> Result<SubmitResponse> {
        let request = SubmitRequest {
            primary_path: primary_path.into(),
            comparison_paths: comparison_paths.to_vec(),
        };
        let params = rpc_params![request];
        let response: SubmitResponse = self.client.request("comparison.submit.v1", params).await?;

        Ok(response)
    }

    /// Submit a comparison job over file names in the daemon's demo directory
    pub async fn submit_demo(
        &self,
        primary_file: impl Into<String>,
        comparison_files: &[String],
    ) -> Result<SubmitResponse> {
        let request = SubmitDemoRequest {
            primary_file: primary_file.into(),
            comparison_files: comparison_files.to_vec(),
        };
        let params = rpc_params![request];
        let response: SubmitResponse = self
            .client
            .request("comparison.submit_demo.v1", params)
            .await?;

        Ok(response)
    }

    /// Poll live results
    ///
    /// Returns the partially filled report while the job is running.
    pub async fn results(&self, job_id: impl Into<String>) -> Result<ResultsResponse> {
        let request = ResultsRequest {
            job_id: job_id.into(),
        };
        let params = rpc_params![request];
        let response: ResultsResponse =
            self.client.request("comparison.results.v1", params).await?;

        Ok(response)
    }

    /// Fetch one base article together with every article matched against it
    pub async fn row(&self, job_id: impl Into<String>, article_index: usize) -> Result<RowResponse> {
        let request = RowRequest {
            job_id: job_id.into(),
            article_index,
        };
        let params = rpc_params![request];
        let response: RowResponse = self.client.request("comparison.row.v1", params).await?;

        Ok(response)
    }

    pub async fn stats(&self) -> Result<StatsResponse> {
        let response: StatsResponse = self.client.request("admin.stats.v1", rpc_params![]).await?;

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_invalid_url() {
        let result = LexCompareClient::connect("not a url").await;
        assert!(matches!(result, Err(SdkError::Connection(_))));
    }

    #[tokio::test]
    async fn test_unreachable_daemon_is_transport_error() {
        // Port 9 (discard) is never served on localhost in test environments
        let client = LexCompareClient::connect("http://127.0.0.1:9").await.unwrap();
        let err = client.stats().await.unwrap_err();
        assert!(err.code().is_none());
    }
}
