// Filesystem DocumentStore
//
// Sources are copied into the data dir as `{job_id}_primary_{file}` and
// `{job_id}_cmp{slot}_{file}`; extraction artifacts and diagnostics sit beside them.

use crate::write_json_atomic;
use async_trait::async_trait;
use lexcompare_core::domain::{ArticleRecord, DocumentRef, DocumentRole, JobId};
use lexcompare_core::error::{AppError, Result};
use lexcompare_core::port::{DocumentStore, ExtractionDiagnostic};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct FsDocumentStore {
    data_dir: PathBuf,
}

impl FsDocumentStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn stage(
        &self,
        job_id: &JobId,
        role: DocumentRole,
        source: &Path,
    ) -> Result<DocumentRef> {
        let is_file = match tokio::fs::metadata(source).await {
            Ok(meta) => meta.is_file(),
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        if !is_file {
            return Err(AppError::NotFound(format!(
                "Document not found: {}",
                source.display()
            )));
        }

        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| AppError::Validation(format!("Not a file: {}", source.display())))?;
        let target = self
            .data_dir
            .join(format!("{}_{}{}", job_id, role.staging_prefix(), file_name));

        tokio::fs::copy(source, &target).await?;
        info!(
            job_id = %job_id,
            source = %source.display(),
            staged = %target.display(),
            "Document staged"
        );
        Ok(DocumentRef::new(target))
    }

    async fn load_articles(&self, doc: &DocumentRef) -> Result<Option<Vec<ArticleRecord>>> {
        let path = doc.artifact_path();
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let articles: Vec<ArticleRecord> = serde_json::from_slice(&bytes)?;
                Ok(Some(articles))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_articles(&self, doc: &DocumentRef, articles: &[ArticleRecord]) -> Result<()> {
        let path = doc.artifact_path();
        write_json_atomic(&path, articles).await?;
        debug!(artifact = %path.display(), articles = articles.len(), "Artifact saved");
        Ok(())
    }

    async fn save_diagnostic(
        &self,
        doc: &DocumentRef,
        diagnostic: &ExtractionDiagnostic,
    ) -> Result<()> {
        write_json_atomic(&doc.diagnostic_path(), diagnostic).await
    }
}
