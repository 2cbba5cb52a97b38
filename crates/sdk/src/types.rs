//! SDK Request/Response Types
//!
//! Mirrors the JSON-RPC types from the api-rpc crate.

use lexcompare_core::domain::{ArticleRecord, Report, SimilarArticle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Compare documents that already exist on the daemon's disk
#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest {
    pub primary_path: String,
    pub comparison_paths: Vec<String>,
}

/// Compare documents from the daemon's demo directory
#[derive(Debug, Clone, Serialize)]
pub struct SubmitDemoRequest {
    pub primary_file: String,
    pub comparison_files: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    pub job_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultsRequest {
    pub job_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultsResponse {
    pub job_id: String,
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Report>,
}

impl ResultsResponse {
    /// True once polling can stop
    pub fn is_finished(&self) -> bool {
        matches!(self.status.as_str(), "done" | "failed")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RowRequest {
    pub job_id: String,
    pub article_index: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RowResponse {
    pub base_article: ArticleRecord,
    pub similar_articles: Vec<SimilarArticle>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsResponse {
    pub total_jobs: i64,
    pub jobs_by_state: BTreeMap<String, i64>,
    pub running_jobs: usize,
    pub uptime_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_response_with_failure_payload() {
        let json = r#"{
            "job_id": "abc",
            "status": "failed",
            "message": "A critical error occurred during the process.",
            "data": {
                "status": "failed",
                "error_message": "A critical error occurred during the process.",
                "error_details": "Extraction failed for p.pdf"
            }
        }"#;
        let response: ResultsResponse = serde_json::from_str(json).unwrap();
        assert!(response.is_finished());
        assert!(response.data.unwrap().is_failed());
    }

    #[test]
    fn test_results_response_without_data() {
        let response: ResultsResponse =
            serde_json::from_str(r#"{"job_id": "abc", "status": "extracting"}"#).unwrap();
        assert!(!response.is_finished());
        assert!(response.data.is_none());
    }
}
