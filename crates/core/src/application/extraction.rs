// Extraction stage: source document -> ordered ArticleRecord list
//
// Memoized on the document's artifact: an existing artifact is reused and no
// external call is made.

use crate::application::output;
use crate::application::prompts::EXTRACTION_PROMPT;
use crate::application::retry::{CallFailure, RetryableCallExecutor};
use crate::domain::{ArticleRecord, DocumentRef};
use crate::error::{AppError, Result};
use crate::port::{DocumentStore, ExtractionDiagnostic, GenerationRequest, GenerationService};
use std::sync::Arc;
use tracing::{info, warn};

pub struct ExtractionStage {
    generation: Arc<dyn GenerationService>,
    documents: Arc<dyn DocumentStore>,
    executor: Arc<RetryableCallExecutor>,
}

impl ExtractionStage {
    pub fn new(
        generation: Arc<dyn GenerationService>,
        documents: Arc<dyn DocumentStore>,
        executor: Arc<RetryableCallExecutor>,
    ) -> Self {
        Self {
            generation,
            documents,
            executor,
        }
    }

    /// Extract `doc`, or reuse its artifact.
    ///
    /// Every failure comes back as `AppError::ExtractionFailure`; whether that
    /// is fatal is the orchestrator's call. Failures after a model response
    /// also leave a diagnostic artifact beside the expected output.
    pub async fn extract(&self, doc: &DocumentRef) -> Result<Vec<ArticleRecord>> {
        match self.documents.load_articles(doc).await {
            Ok(Some(articles)) => {
                info!(
                    document = %doc.file_name(),
                    articles = articles.len(),
                    "Reusing extraction artifact"
                );
                return Ok(articles);
            }
            Ok(None) => {}
            Err(e) => return Err(failure(doc, format!("unreadable artifact: {}", e))),
        }

        info!(document = %doc.file_name(), "Extracting articles");

        let mime_type = doc.source_mime_type();
        let handle = match self
            .executor
            .execute("extract.register", |_| {
                self.generation.register(doc.path(), mime_type)
            })
            .await
        {
            Ok(handle) => handle,
            Err(call_failure) => {
                self.record_diagnostic(doc, &call_failure.to_string(), "").await;
                return Err(failure(doc, call_failure.to_string()));
            }
        };

        let request = GenerationRequest {
            prompt: EXTRACTION_PROMPT.to_string(),
            handles: vec![handle.clone()],
            response_mime_type: None,
        };
        let generated = self
            .executor
            .execute("extract.generate", |_| self.generation.generate(&request))
            .await;

        // The source handle is only needed for this one call
        if let Err(e) = self.generation.release(&handle).await {
            warn!(document = %doc.file_name(), error = %e, "Could not release source handle");
        }

        let raw = match generated {
            Ok(text) => text,
            Err(call_failure) => {
                self.record_diagnostic(doc, &call_failure.to_string(), "").await;
                return Err(failure(doc, call_failure.to_string()));
            }
        };

        let articles: Vec<ArticleRecord> = match output::parse_records(&raw) {
            Ok(articles) => articles,
            Err(err) => {
                let reason = CallFailure::from(err).to_string();
                self.record_diagnostic(doc, &reason, &raw).await;
                return Err(failure(doc, reason));
            }
        };

        self.documents
            .save_articles(doc, &articles)
            .await
            .map_err(|e| failure(doc, format!("could not save artifact: {}", e)))?;

        info!(
            document = %doc.file_name(),
            articles = articles.len(),
            "Extraction complete"
        );
        Ok(articles)
    }

    async fn record_diagnostic(&self, doc: &DocumentRef, error: &str, raw_response: &str) {
        let diagnostic = ExtractionDiagnostic {
            error: error.to_string(),
            file: doc.to_string(),
            raw_response: raw_response.to_string(),
        };
        if let Err(e) = self.documents.save_diagnostic(doc, &diagnostic).await {
            warn!(document = %doc.file_name(), error = %e, "Could not write extraction diagnostic");
        }
    }
}

fn failure(doc: &DocumentRef, reason: String) -> AppError {
    AppError::ExtractionFailure {
        document: doc.file_name(),
        reason,
    }
}
