//! Shared harness: real filesystem adapters, scripted generation service.

#![allow(dead_code)]

use async_trait::async_trait;
use lexcompare_core::application::{
    JobOrchestrator, JobRunner, RetryConfig, RetryableCallExecutor, StatusService,
    SubmissionService,
};
use lexcompare_core::domain::{JobId, Report};
use lexcompare_core::error::Result;
use lexcompare_core::port::generation_service::mocks::ScriptedGenerationService;
use lexcompare_core::port::id_provider::mocks::SequentialIdProvider;
use lexcompare_core::port::job_repository::mocks::InMemoryJobRepository;
use lexcompare_core::port::result_store::mocks::InMemoryResultStore;
use lexcompare_core::port::sleeper::mocks::RecordingSleeper;
use lexcompare_core::port::time_provider::mocks::SteppingTimeProvider;
use lexcompare_core::port::{GenerationRequest, ResultStore};
use lexcompare_infra_fs::{FsDocumentStore, FsResultStore};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Writes through to disk and keeps every snapshot for inspection
pub struct RecordingResultStore {
    pub disk: FsResultStore,
    pub memory: InMemoryResultStore,
}

#[async_trait]
impl ResultStore for RecordingResultStore {
    async fn write(&self, job_id: &JobId, report: &Report) -> Result<()> {
        self.memory.write(job_id, report).await?;
        self.disk.write(job_id, report).await
    }

    async fn read(&self, job_id: &JobId) -> Result<Option<Report>> {
        self.disk.read(job_id).await
    }
}

pub struct Pipeline {
    _dir: TempDir,
    pub sources: PathBuf,
    pub data: PathBuf,
    pub generation: Arc<ScriptedGenerationService>,
    pub results: Arc<RecordingResultStore>,
    pub jobs: Arc<InMemoryJobRepository>,
    pub sleeper: Arc<RecordingSleeper>,
    pub runner: Arc<JobRunner>,
    pub submission: SubmissionService,
    pub status: StatusService,
}

impl Pipeline {
    pub fn new(generation: Arc<ScriptedGenerationService>) -> Self {
        let dir = TempDir::new().unwrap();
        let sources = dir.path().join("sources");
        let data = dir.path().join("data");
        std::fs::create_dir_all(&sources).unwrap();
        std::fs::create_dir_all(&data).unwrap();

        let documents = Arc::new(FsDocumentStore::new(&data));
        let results = Arc::new(RecordingResultStore {
            disk: FsResultStore::new(&data),
            memory: InMemoryResultStore::new(),
        });
        let jobs = Arc::new(InMemoryJobRepository::new());
        let sleeper = Arc::new(RecordingSleeper::new());
        let time = Arc::new(SteppingTimeProvider::new(1_700_000_000_000));

        let orchestrator = Arc::new(JobOrchestrator::new(
            generation.clone(),
            documents.clone(),
            results.clone(),
            jobs.clone(),
            time.clone(),
            Arc::new(RetryableCallExecutor::new(
                RetryConfig::default(),
                sleeper.clone(),
            )),
        ));
        let runner = Arc::new(JobRunner::new(orchestrator));
        let submission = SubmissionService::new(
            documents.clone(),
            jobs.clone(),
            Arc::new(SequentialIdProvider::new()),
            time,
            runner.clone(),
        );
        let status = StatusService::new(results.clone(), jobs.clone(), documents);

        Self {
            _dir: dir,
            sources,
            data,
            generation,
            results,
            jobs,
            sleeper,
            runner,
            submission,
            status,
        }
    }

    /// Create a source document and return its path
    pub fn source(&self, name: &str) -> PathBuf {
        let path = self.sources.join(name);
        std::fs::write(&path, b"%PDF-1.7 stub").unwrap();
        path
    }

    /// Submit a job over freshly created sources and wait until it finishes
    pub async fn run(&self, primary: &str, comparisons: &[&str]) -> JobId {
        let primary = self.source(primary);
        let comparisons: Vec<PathBuf> = comparisons.iter().map(|c| self.source(c)).collect();

        let job_id = self.submission.submit(&primary, &comparisons).await.unwrap();
        assert!(self.runner.drain(Duration::from_secs(10)).await);
        job_id
    }

    pub async fn report(&self, job_id: &JobId) -> Report {
        self.results.read(job_id).await.unwrap().unwrap()
    }

    /// Handle names passed to `release`
    pub fn released(&self) -> Vec<String> {
        self.generation
            .released()
            .into_iter()
            .map(|h| h.name)
            .collect()
    }

    /// Generation calls that compared articles (excludes extraction)
    pub fn comparison_calls(&self) -> usize {
        self.generation
            .requests()
            .iter()
            .filter(|r| !is_extraction(r))
            .count()
    }
}

pub fn is_extraction(req: &GenerationRequest) -> bool {
    req.response_mime_type.is_none()
}

/// The request compares the base article numbered `number`
pub fn about_article(req: &GenerationRequest, number: &str) -> bool {
    !is_extraction(req)
        && req
            .prompt
            .contains(&format!("\"article_number\": \"{}\"", number))
}

/// The comparison document of the request is `name` (file stem)
pub fn against(req: &GenerationRequest, name: &str) -> bool {
    req.handles
        .get(1)
        .map(|h| h.name.contains("_cmp") && h.name.ends_with(&format!("_{}.json", name)))
        .unwrap_or(false)
}

/// The extraction request targets the source `file_name`
pub fn extracting(req: &GenerationRequest, file_name: &str) -> bool {
    is_extraction(req)
        && req
            .handles
            .first()
            .map(|h| h.name.ends_with(file_name))
            .unwrap_or(false)
}

/// Extraction answers: articles "1" and "2" for the primary document,
/// "Art.3" and "Art.4" for every comparison document.
pub fn extraction_answer(req: &GenerationRequest) -> String {
    let is_primary = req
        .handles
        .first()
        .map(|h| h.name.contains("_primary_"))
        .unwrap_or(false);

    if is_primary {
        let articles = json!([
            {"article_number": "1", "article_title": "Family", "article_text": "The state protects the family."},
            {"article_number": "2", "article_title": null, "article_text": "Education is free."}
        ]);
        format!("```json\n{}\n```", articles)
    } else {
        json!([
            {"article_number": "Art.3", "article_title": "X", "article_text": "The family is the basis of society."},
            {"article_number": "Art.4", "article_text": "Schooling is compulsory."}
        ])
        .to_string()
    }
}
