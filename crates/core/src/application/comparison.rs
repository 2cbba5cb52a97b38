// Pairwise comparison stage
//
// Cells are processed article-major, comparison-document-minor. Each cell goes
// pending -> completed | failed exactly once and the whole Report is persisted
// after every cell so pollers see monotonic progress.

use crate::application::constants::JSON_MIME_TYPE;
use crate::application::prompts::comparison_prompt;
use crate::application::retry::RetryableCallExecutor;
use crate::domain::{ArticleRecord, JobId, Report, SimilarArticle, TEXT_UNAVAILABLE};
use crate::error::{AppError, Result};
use crate::port::{DocumentHandle, GenerationRequest, GenerationService, ResultStore};
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use tracing::{info, warn};

/// One column of the Report.
#[derive(Debug, Clone)]
pub struct ComparisonTarget {
    pub name: String,
    /// Articles of the comparison document, used to resolve full texts
    pub articles: Vec<ArticleRecord>,
    /// Ok(handle) when the document is usable, Err(reason) when it was excluded
    pub handle: std::result::Result<DocumentHandle, String>,
}

/// Similarity record as returned by the model.
#[derive(Debug, Deserialize)]
struct RawSimilarity {
    #[serde(
        default,
        alias = "matched_article_identifier",
        deserialize_with = "opt_string_or_number"
    )]
    id: Option<String>,
    #[serde(default, alias = "matched_article_title")]
    title: Option<String>,
    #[serde(default, alias = "reason_for_similarity")]
    reason: Option<String>,
}

fn opt_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Full text of the first article whose number matches; the sentinel otherwise.
pub fn resolve_full_text(articles: &[ArticleRecord], identifier: &str) -> String {
    articles
        .iter()
        .find(|a| a.article_number == identifier)
        .map(|a| a.article_text.clone())
        .unwrap_or_else(|| TEXT_UNAVAILABLE.to_string())
}

pub struct ComparisonStage {
    generation: Arc<dyn GenerationService>,
    executor: Arc<RetryableCallExecutor>,
    results: Arc<dyn ResultStore>,
}

impl ComparisonStage {
    pub fn new(
        generation: Arc<dyn GenerationService>,
        executor: Arc<RetryableCallExecutor>,
        results: Arc<dyn ResultStore>,
    ) -> Self {
        Self {
            generation,
            executor,
            results,
        }
    }

    /// Settle every cell of `report`.
    ///
    /// Cell-level failures are recorded in the Report. Only a ResultStore
    /// failure is returned as an error.
    pub async fn run(
        &self,
        job_id: &JobId,
        report: &mut Report,
        primary: &DocumentHandle,
        targets: &[ComparisonTarget],
    ) -> Result<()> {
        let base_articles: Vec<ArticleRecord> = report
            .rows()
            .iter()
            .map(|row| row.base_article_info.clone())
            .collect();
        let total = base_articles.len();

        for (row, article) in base_articles.iter().enumerate() {
            info!(
                job_id = %job_id,
                article = row + 1,
                total = total,
                "Processing article"
            );

            for (column, target) in targets.iter().enumerate() {
                let outcome = match &target.handle {
                    Err(reason) => Err(format!("Document unavailable: {}", reason)),
                    Ok(handle) => self
                        .compare(article, primary, handle, &target.articles)
                        .await
                        .map_err(|failure| failure.to_string()),
                };

                let cell = report.cell_mut(row, column).ok_or_else(|| {
                    AppError::Internal(format!("Report has no cell ({}, {})", row, column))
                })?;
                match outcome {
                    Ok(similar) => {
                        info!(
                            job_id = %job_id,
                            article = row + 1,
                            document = %target.name,
                            matches = similar.len(),
                            "Cell completed"
                        );
                        cell.complete(similar)?;
                    }
                    Err(message) => {
                        warn!(
                            job_id = %job_id,
                            article = row + 1,
                            document = %target.name,
                            error = %message,
                            "Cell failed"
                        );
                        cell.fail(Some(message))?;
                    }
                }

                self.results.write(job_id, report).await?;
            }
        }

        Ok(())
    }

    async fn compare(
        &self,
        article: &ArticleRecord,
        primary: &DocumentHandle,
        comparison: &DocumentHandle,
        comparison_articles: &[ArticleRecord],
    ) -> std::result::Result<Vec<SimilarArticle>, crate::application::retry::CallFailure> {
        let request = GenerationRequest {
            prompt: comparison_prompt(article),
            handles: vec![primary.clone(), comparison.clone()],
            response_mime_type: Some(JSON_MIME_TYPE.to_string()),
        };

        let raw: Vec<RawSimilarity> = self
            .executor
            .generate_records("compare", self.generation.as_ref(), &request)
            .await?;

        Ok(raw
            .into_iter()
            .map(|sim| {
                let identifier = sim.id.unwrap_or_default();
                let full_text = if identifier.is_empty() {
                    TEXT_UNAVAILABLE.to_string()
                } else {
                    resolve_full_text(comparison_articles, &identifier)
                };
                SimilarArticle {
                    matched_article_identifier: identifier,
                    matched_article_title: sim.title,
                    reason_for_similarity: sim.reason.unwrap_or_default(),
                    matched_article_full_text: full_text,
                }
            })
            .collect())
    }
}
