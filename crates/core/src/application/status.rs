// Status queries: live results and per-row context
//
// Read-only. The Report in the ResultStore is the source of truth; the
// registry and extraction artifacts only fill in the phase before the first
// Report write.

use crate::domain::{
    ArticleRecord, CellStatus, FailureReport, JobId, JobState, Report, SimilarArticle,
};
use crate::error::{AppError, Result};
use crate::port::{DocumentStore, JobRepository, ResultStore};
use std::sync::Arc;
use tracing::debug;

/// Progress of a job as seen by a poller.
#[derive(Debug, Clone, PartialEq)]
pub enum JobProgress {
    /// Primary document not extracted yet
    Extracting,
    /// Primary extracted, no Report written yet; every cell is pending
    Initializing(Report),
    /// Row Report persisted; `state` is None when the registry has no record
    Live {
        state: Option<JobState>,
        report: Report,
    },
    /// Terminal failure object
    Failed(FailureReport),
}

/// Context of one base article: the article and every match found for it.
#[derive(Debug, Clone, PartialEq)]
pub struct RowContext {
    pub base_article: ArticleRecord,
    pub similar_articles: Vec<SimilarArticle>,
}

pub struct StatusService {
    results: Arc<dyn ResultStore>,
    jobs: Arc<dyn JobRepository>,
    documents: Arc<dyn DocumentStore>,
}

impl StatusService {
    pub fn new(
        results: Arc<dyn ResultStore>,
        jobs: Arc<dyn JobRepository>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            results,
            jobs,
            documents,
        }
    }

    pub async fn results(&self, job_id: &JobId) -> Result<JobProgress> {
        if let Some(report) = self.results.read(job_id).await? {
            return Ok(match report {
                Report::Failed(failure) => JobProgress::Failed(failure),
                report => {
                    let state = match self.jobs.find_by_id(job_id).await {
                        Ok(job) => job.map(|j| j.state),
                        Err(e) => {
                            debug!(job_id = %job_id, error = %e, "Registry unavailable");
                            None
                        }
                    };
                    JobProgress::Live { state, report }
                }
            });
        }

        let job = self
            .jobs
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| AppError::JobNotFound(job_id.clone()))?;

        match self.documents.load_articles(&job.primary_document).await? {
            None => Ok(JobProgress::Extracting),
            Some(articles) => {
                let names: Vec<String> = job
                    .comparison_documents
                    .iter()
                    .map(|doc| doc.display_name(&job.id))
                    .collect();
                Ok(JobProgress::Initializing(Report::scaffold(&articles, &names)))
            }
        }
    }

    /// Base article `article_index` with the matches of all completed cells.
    pub async fn row(&self, job_id: &JobId, article_index: usize) -> Result<RowContext> {
        let report = self
            .results
            .read(job_id)
            .await?
            .ok_or_else(|| AppError::ResultsNotReady(job_id.clone()))?;

        let rows = report.rows();
        let row = rows
            .get(article_index)
            .ok_or(AppError::ArticleIndexOutOfRange {
                index: article_index,
                len: rows.len(),
            })?;

        let similar_articles = row
            .country_comparisons
            .iter()
            .filter(|cell| cell.status == CellStatus::Completed)
            .flat_map(|cell| cell.similar_articles.iter().cloned())
            .collect();

        Ok(RowContext {
            base_article: row.base_article_info.clone(),
            similar_articles,
        })
    }
}
