// Domain Layer - Pure business logic and entities

pub mod article;
pub mod document;
pub mod error;
pub mod job;
pub mod report;

// Re-exports
pub use article::ArticleRecord;
pub use document::{DocumentRef, DocumentRole};
pub use error::DomainError;
pub use job::{Job, JobId, JobState};
pub use report::{
    CellStatus, ComparisonCell, FailureReport, Report, ReportRow, SimilarArticle,
    TEXT_UNAVAILABLE,
};
