// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
///
/// Provider, parse, extraction and upload failures below the job level are
/// recorded inside the Report as data. Only the variants that reach a caller
/// (status queries, submission, top-level orchestration) are ever surfaced.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transient provider error: {0}")]
    TransientProvider(String),

    #[error("Fatal provider error: {0}")]
    FatalProvider(String),

    #[error("ParseError: {message}")]
    Parse { message: String, raw: String },

    #[error("Extraction failed for {document}: {reason}")]
    ExtractionFailure { document: String, reason: String },

    #[error("Upload failed for {document}: {reason}")]
    UploadFailure { document: String, reason: String },

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Live results not ready for job {0}")]
    ResultsNotReady(String),

    #[error("Article index {index} out of range (rows: {len})")]
    ArticleIndexOutOfRange { index: usize, len: usize },

    #[error("Critical orchestrator error: {0}")]
    CriticalOrchestrator(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl From<crate::port::ProviderError> for AppError {
    fn from(err: crate::port::ProviderError) -> Self {
        match err {
            crate::port::ProviderError::Transient(msg) => AppError::TransientProvider(msg),
            crate::port::ProviderError::Fatal(msg) => AppError::FatalProvider(msg),
        }
    }
}

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by converting to AppError::Database(String)
