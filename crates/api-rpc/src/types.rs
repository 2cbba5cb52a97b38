//! RPC Request/Response Types
//!
//! Defines the JSON-RPC method parameters and results.

use lexcompare_core::domain::{ArticleRecord, Report, SimilarArticle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status string returned by both submit methods
pub const STATUS_PROCESSING: &str = "processing";

/// comparison.submit.v1 - Compare documents already on the daemon's disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub primary_path: String,
    pub comparison_paths: Vec<String>,
}

/// comparison.submit_demo.v1 - Compare documents from the demo directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitDemoRequest {
    pub primary_file: String,
    pub comparison_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub job_id: String,
    pub status: String,
}

/// comparison.results.v1 - Poll live results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsRequest {
    pub job_id: String,
}

/// `status` is `extracting`, `initializing`, `failed`, or the lowercase job state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsResponse {
    pub job_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Report>,
}

/// comparison.row.v1 - One base article with all its matches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowRequest {
    pub job_id: String,
    pub article_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowResponse {
    pub base_article: ArticleRecord,
    pub similar_articles: Vec<SimilarArticle>,
}

/// admin.stats.v1 - Registry statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_jobs: i64,
    /// Count per job state, keyed by state name (`DONE`, `COMPARING`, ...)
    pub jobs_by_state: BTreeMap<String, i64>,
    /// Jobs with a live task in this daemon process
    pub running_jobs: usize,
    pub uptime_seconds: u64,
}
