//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use jsonrpsee::types::ErrorObjectOwned;
use lexcompare_core::error::AppError;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const THROTTLED: i32 = 4003;
    pub const RESULTS_NOT_READY: i32 = 4004;
    pub const ARTICLE_OUT_OF_RANGE: i32 = 4005;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const DB_ERROR: i32 = 5001;
    pub const SYSTEM_ERROR: i32 = 5002;
    pub const PROVIDER_ERROR: i32 = 5003;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    let code = match &err {
        AppError::Validation(_) | AppError::Domain(_) | AppError::Serialization(_) => {
            code::VALIDATION_ERROR
        }
        AppError::NotFound(_) | AppError::JobNotFound(_) => code::NOT_FOUND,
        AppError::ResultsNotReady(_) => code::RESULTS_NOT_READY,
        AppError::ArticleIndexOutOfRange { .. } => code::ARTICLE_OUT_OF_RANGE,
        AppError::Database(_) => code::DB_ERROR,
        AppError::Io(_) => code::SYSTEM_ERROR,
        AppError::TransientProvider(_)
        | AppError::FatalProvider(_)
        | AppError::Parse { .. }
        | AppError::ExtractionFailure { .. }
        | AppError::UploadFailure { .. } => code::PROVIDER_ERROR,
        AppError::Config(_) | AppError::CriticalOrchestrator(_) | AppError::Internal(_) => {
            code::INTERNAL_ERROR
        }
    };
    ErrorObjectOwned::owned(code, err.to_string(), None::<()>)
}

pub fn throttled() -> ErrorObjectOwned {
    ErrorObjectOwned::owned(
        code::THROTTLED,
        "Rate limit exceeded. Please slow down.",
        None::<()>,
    )
}
