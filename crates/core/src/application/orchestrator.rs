//! Job orchestrator
//!
//! Drives one job through the fixed pipeline
//! `extracting -> uploading -> comparing -> done`, escaping to
//! `critical_failure` on any job-level error. Cleanup of uploaded handles runs
//! exactly once, after the last Report write, on every normal exit path.

use crate::application::cleanup::CleanupStage;
use crate::application::comparison::{ComparisonStage, ComparisonTarget};
use crate::application::extraction::ExtractionStage;
use crate::application::retry::RetryableCallExecutor;
use crate::application::upload::{HandleTable, UploadStage};
use crate::domain::{Job, JobId, JobState, Report};
use crate::error::{AppError, Result};
use crate::port::{DocumentStore, GenerationService, JobRepository, ResultStore, TimeProvider};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct JobOrchestrator {
    results: Arc<dyn ResultStore>,
    jobs: Arc<dyn JobRepository>,
    time_provider: Arc<dyn TimeProvider>,
    extraction: ExtractionStage,
    upload: UploadStage,
    comparison: ComparisonStage,
    cleanup: CleanupStage,
}

impl JobOrchestrator {
    pub fn new(
        generation: Arc<dyn GenerationService>,
        documents: Arc<dyn DocumentStore>,
        results: Arc<dyn ResultStore>,
        jobs: Arc<dyn JobRepository>,
        time_provider: Arc<dyn TimeProvider>,
        executor: Arc<RetryableCallExecutor>,
    ) -> Self {
        Self {
            extraction: ExtractionStage::new(generation.clone(), documents, executor.clone()),
            upload: UploadStage::new(generation.clone(), executor.clone()),
            comparison: ComparisonStage::new(generation.clone(), executor, results.clone()),
            cleanup: CleanupStage::new(generation),
            results,
            jobs,
            time_provider,
        }
    }

    /// Run `job` to a terminal state and return that state.
    pub async fn run(&self, mut job: Job) -> JobState {
        info!(
            job_id = %job.id,
            comparisons = job.comparison_documents.len(),
            "Job started"
        );
        let mut handles = HandleTable::new();

        if let Err(err) = self.run_pipeline(&mut job, &mut handles).await {
            self.enter_critical_failure(&mut job, &err).await;
        }

        self.cleanup.release_all(&job.id, &mut handles).await;

        info!(job_id = %job.id, state = %job.state, "Job finished");
        job.state
    }

    async fn run_pipeline(&self, job: &mut Job, handles: &mut HandleTable) -> Result<()> {
        // Phase 1: extraction
        job.begin_extraction(self.time_provider.now_millis())?;
        self.persist(job).await;

        let base_articles = self.extraction.extract(&job.primary_document).await?;

        // Artifact names key the handle table; a document that would share one
        // is excluded instead of silently reusing another document's articles.
        let mut claimed = HashSet::from([job.primary_document.artifact_name()]);
        let mut comparison_articles = Vec::with_capacity(job.comparison_documents.len());
        for doc in &job.comparison_documents {
            if !claimed.insert(doc.artifact_name()) {
                warn!(job_id = %job.id, document = %doc.file_name(), "Excluding document with a duplicate artifact name");
                comparison_articles.push(Err(format!(
                    "artifact {} collides with another document of this job",
                    doc.artifact_name()
                )));
                continue;
            }
            let extracted = self.extraction.extract(doc).await.map_err(|e| {
                warn!(job_id = %job.id, document = %doc.file_name(), error = %e, "Excluding document");
                e.to_string()
            });
            comparison_articles.push(extracted);
        }

        // Phase 2: upload (primary first; its failure is fatal)
        job.begin_upload()?;
        self.persist(job).await;

        let primary_handle = self
            .upload
            .upload(&job.primary_document, handles)
            .await
            .map_err(|failure| AppError::UploadFailure {
                document: job.primary_document.file_name(),
                reason: failure.to_string(),
            })?;

        let mut targets = Vec::with_capacity(job.comparison_documents.len());
        for (doc, extracted) in job.comparison_documents.iter().zip(comparison_articles) {
            let name = doc.display_name(&job.id);
            let target = match extracted {
                Ok(articles) => {
                    let handle = self
                        .upload
                        .upload(doc, handles)
                        .await
                        .map_err(|failure| {
                            warn!(job_id = %job.id, document = %name, error = %failure, "Upload failed");
                            format!("upload failed: {}", failure)
                        });
                    ComparisonTarget {
                        name,
                        articles,
                        handle,
                    }
                }
                Err(reason) => ComparisonTarget {
                    name,
                    articles: Vec::new(),
                    handle: Err(reason),
                },
            };
            targets.push(target);
        }

        // Phase 3: comparison
        job.begin_comparison()?;
        self.persist(job).await;

        let names: Vec<String> = targets.iter().map(|t| t.name.clone()).collect();
        let mut report = Report::scaffold(&base_articles, &names);
        self.results.write(&job.id, &report).await?;

        self.comparison
            .run(&job.id, &mut report, &primary_handle, &targets)
            .await?;

        job.complete(self.time_provider.now_millis())?;
        self.persist(job).await;
        Ok(())
    }

    /// Overwrite the Report with the terminal failure object and mark the job.
    async fn enter_critical_failure(&self, job: &mut Job, err: &AppError) {
        let details = err.to_string();
        error!(job_id = %job.id, state = %job.state, error = %details, "Critical job failure");
        self.write_failure_report(&job.id, &details).await;

        match job.fail_critically(self.time_provider.now_millis(), &details) {
            Ok(()) => self.persist(job).await,
            Err(e) => warn!(job_id = %job.id, error = %e, "Job already terminal"),
        }
    }

    /// Record a critical failure for a job whose run was lost (panicked task).
    ///
    /// The Report is overwritten even when the registry cannot be read.
    pub async fn fail_job(&self, job_id: &JobId, err: AppError) {
        let details = err.to_string();
        error!(job_id = %job_id, error = %details, "Critical job failure");
        self.write_failure_report(job_id, &details).await;

        match self.jobs.find_by_id(job_id).await {
            Ok(Some(mut job)) => {
                if job.fail_critically(self.time_provider.now_millis(), &details).is_ok() {
                    self.persist(&job).await;
                }
            }
            Ok(None) => warn!(job_id = %job_id, "Failed job is not in the registry"),
            Err(e) => warn!(job_id = %job_id, error = %e, "Could not load failed job"),
        }
    }

    async fn write_failure_report(&self, job_id: &JobId, details: &str) {
        if let Err(e) = self.results.write(job_id, &Report::critical(details)).await {
            error!(job_id = %job_id, error = %e, "Could not write failure report");
        }
    }

    /// Registry writes are best-effort: the Report stays the source of truth.
    async fn persist(&self, job: &Job) {
        if let Err(e) = self.jobs.update(job).await {
            warn!(job_id = %job.id, state = %job.state, error = %e, "Could not persist job state");
        }
    }
}
