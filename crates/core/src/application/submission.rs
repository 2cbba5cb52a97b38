// Job submission use case
//
// Stages the documents into the job's working area, registers the job and
// hands it to the runner. Returns as soon as the job is accepted.

use crate::application::runner::JobRunner;
use crate::domain::{DocumentRef, DocumentRole, Job, JobId};
use crate::error::{AppError, Result};
use crate::port::{DocumentStore, IdProvider, JobRepository, TimeProvider};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub struct SubmissionService {
    documents: Arc<dyn DocumentStore>,
    jobs: Arc<dyn JobRepository>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    runner: Arc<JobRunner>,
    demo_dir: Option<PathBuf>,
}

impl SubmissionService {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        jobs: Arc<dyn JobRepository>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        runner: Arc<JobRunner>,
    ) -> Self {
        Self {
            documents,
            jobs,
            id_provider,
            time_provider,
            runner,
            demo_dir: None,
        }
    }

    /// Resolve `submit_demo` names against `dir`
    pub fn with_demo_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.demo_dir = Some(dir.into());
        self
    }

    /// Submit a comparison job and start it in the background.
    ///
    /// # Errors
    /// - `Validation` if no comparison document is given
    /// - `NotFound` if the primary document, or every comparison document, is missing
    pub async fn submit(&self, primary: &Path, comparisons: &[PathBuf]) -> Result<JobId> {
        if comparisons.is_empty() {
            return Err(AppError::Validation(
                "At least one comparison document is required".to_string(),
            ));
        }

        let job_id = self.id_provider.generate_id();

        let primary_document = self
            .documents
            .stage(&job_id, DocumentRole::Primary, primary)
            .await?;

        let mut comparison_documents: Vec<DocumentRef> = Vec::with_capacity(comparisons.len());
        for (index, source) in comparisons.iter().enumerate() {
            match self
                .documents
                .stage(&job_id, DocumentRole::Comparison(index + 1), source)
                .await
            {
                Ok(doc) => comparison_documents.push(doc),
                Err(AppError::NotFound(msg)) => {
                    warn!(job_id = %job_id, source = %source.display(), "Skipping missing comparison document: {}", msg);
                }
                Err(e) => return Err(e),
            }
        }
        if comparison_documents.is_empty() {
            return Err(AppError::NotFound(
                "None of the comparison documents exist".to_string(),
            ));
        }

        let job = Job::new(
            job_id.clone(),
            self.time_provider.now_millis(),
            primary_document,
            comparison_documents,
        );
        self.jobs.insert(&job).await?;

        info!(
            job_id = %job_id,
            primary = %primary.display(),
            comparisons = job.comparison_documents.len(),
            "Job submitted"
        );
        self.runner.spawn(job);

        Ok(job_id)
    }

    /// Submit a job whose documents live in the demo directory.
    pub async fn submit_demo(&self, primary_name: &str, comparison_names: &[String]) -> Result<JobId> {
        let dir = self
            .demo_dir
            .as_ref()
            .ok_or_else(|| AppError::Config("Demo directory is not configured".to_string()))?;

        let primary = resolve_demo_file(dir, primary_name)?;
        let comparisons = comparison_names
            .iter()
            .map(|name| resolve_demo_file(dir, name))
            .collect::<Result<Vec<_>>>()?;

        self.submit(&primary, &comparisons).await
    }
}

/// Demo names are bare file names; anything that could leave the directory is rejected.
fn resolve_demo_file(dir: &Path, name: &str) -> Result<PathBuf> {
    let is_bare = !name.is_empty()
        && !name.contains('/')
        && !name.contains('\\')
        && name != "."
        && name != "..";
    if !is_bare {
        return Err(AppError::Validation(format!(
            "Invalid demo file name: {:?}",
            name
        )));
    }
    Ok(dir.join(name))
}
