//! LexCompare SDK - Rust Client Library
//!
//! Provides a client for submitting comparison jobs to the LexCompare daemon
//! and polling their live results.
//!
//! # Example
//!
//! ```no_run
//! use lexcompare_sdk::LexCompareClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = LexCompareClient::connect("http://127.0.0.1:9617").await?;
//!
//!     let submitted = client
//!         .submit_demo("egypt_constitution.pdf", &["tunisia_constitution.pdf".to_string()])
//!         .await?;
//!
//!     let results = client.results(&submitted.job_id).await?;
//!     println!("{}: {}", results.job_id, results.status);
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::LexCompareClient;
pub use error::{Result, SdkError};
pub use types::{
    ResultsRequest, ResultsResponse, RowRequest, RowResponse, StatsResponse, SubmitDemoRequest,
    SubmitRequest, SubmitResponse,
};

// Report types travel in result payloads
pub use lexcompare_core::domain::{
    ArticleRecord, CellStatus, ComparisonCell, FailureReport, Report, ReportRow, SimilarArticle,
};
