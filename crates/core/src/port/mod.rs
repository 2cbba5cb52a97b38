// Port Layer - Interfaces for external dependencies

pub mod document_store;
pub mod generation_service;
pub mod id_provider; // For deterministic testing
pub mod job_repository;
pub mod result_store;
pub mod sleeper; // Backoff delays
pub mod time_provider;

// Re-exports
pub use document_store::{DocumentStore, ExtractionDiagnostic};
pub use generation_service::{DocumentHandle, GenerationRequest, GenerationService, ProviderError};
pub use id_provider::IdProvider;
pub use job_repository::JobRepository;
pub use result_store::ResultStore;
pub use sleeper::Sleeper;
pub use time_provider::TimeProvider;
