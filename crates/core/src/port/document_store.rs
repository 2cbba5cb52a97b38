// Document Store Port (staged sources and extraction artifacts)

use crate::domain::{ArticleRecord, DocumentRef, DocumentRole, JobId};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Written beside the expected artifact when extraction fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionDiagnostic {
    pub error: String,
    pub file: String,
    pub raw_response: String,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Copy a source document into the job's working area
    ///
    /// Returns `AppError::NotFound` if `source` does not exist.
    async fn stage(&self, job_id: &JobId, role: DocumentRole, source: &Path)
        -> Result<DocumentRef>;

    /// Load the extraction artifact, or None if the document was never extracted
    async fn load_articles(&self, doc: &DocumentRef) -> Result<Option<Vec<ArticleRecord>>>;

    async fn save_articles(&self, doc: &DocumentRef, articles: &[ArticleRecord]) -> Result<()>;

    async fn save_diagnostic(
        &self,
        doc: &DocumentRef,
        diagnostic: &ExtractionDiagnostic,
    ) -> Result<()>;
}

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::{HashMap, HashSet};
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// In-memory DocumentStore keyed by artifact path
    #[derive(Default)]
    pub struct InMemoryDocumentStore {
        sources: Mutex<HashSet<PathBuf>>,
        artifacts: Mutex<HashMap<PathBuf, Vec<ArticleRecord>>>,
        diagnostics: Mutex<HashMap<PathBuf, ExtractionDiagnostic>>,
    }

    impl InMemoryDocumentStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make `path` available to `stage`
        pub fn add_source(&self, path: impl Into<PathBuf>) {
            self.sources.lock().unwrap().insert(path.into());
        }

        /// Pre-seed an extraction artifact (as if a previous run extracted it)
        pub fn seed_articles(&self, doc: &DocumentRef, articles: Vec<ArticleRecord>) {
            self.artifacts
                .lock()
                .unwrap()
                .insert(doc.artifact_path(), articles);
        }

        pub fn diagnostic(&self, doc: &DocumentRef) -> Option<ExtractionDiagnostic> {
            self.diagnostics
                .lock()
                .unwrap()
                .get(&doc.diagnostic_path())
                .cloned()
        }

        pub fn has_artifact(&self, doc: &DocumentRef) -> bool {
            self.artifacts
                .lock()
                .unwrap()
                .contains_key(&doc.artifact_path())
        }
    }

    #[async_trait]
    impl DocumentStore for InMemoryDocumentStore {
        async fn stage(
            &self,
            job_id: &JobId,
            role: DocumentRole,
            source: &Path,
        ) -> Result<DocumentRef> {
            if !self.sources.lock().unwrap().contains(source) {
                return Err(AppError::NotFound(format!(
                    "Document not found: {}",
                    source.display()
                )));
            }
            let file_name = source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(DocumentRef::new(format!(
                "/staged/{}_{}{}",
                job_id,
                role.staging_prefix(),
                file_name
            )))
        }

        async fn load_articles(&self, doc: &DocumentRef) -> Result<Option<Vec<ArticleRecord>>> {
            Ok(self
                .artifacts
                .lock()
                .unwrap()
                .get(&doc.artifact_path())
                .cloned())
        }

        async fn save_articles(&self, doc: &DocumentRef, articles: &[ArticleRecord]) -> Result<()> {
            self.artifacts
                .lock()
                .unwrap()
                .insert(doc.artifact_path(), articles.to_vec());
            Ok(())
        }

        async fn save_diagnostic(
            &self,
            doc: &DocumentRef,
            diagnostic: &ExtractionDiagnostic,
        ) -> Result<()> {
            self.diagnostics
                .lock()
                .unwrap()
                .insert(doc.diagnostic_path(), diagnostic.clone());
            Ok(())
        }
    }
}
