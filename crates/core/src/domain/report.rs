// Report Domain Model
//
// The Report is the only channel through which pollers observe a job:
// one row per base article, one cell per comparison document.

use crate::domain::article::ArticleRecord;
use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Full text placed on a similarity record whose matched article cannot be found.
pub const TEXT_UNAVAILABLE: &str = "Text unavailable";

/// Message carried by every terminal failure Report.
pub const CRITICAL_ERROR_MESSAGE: &str = "A critical error occurred in the backend process.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellStatus {
    Pending,
    Completed,
    Failed,
}

impl std::fmt::Display for CellStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellStatus::Pending => write!(f, "pending"),
            CellStatus::Completed => write!(f, "completed"),
            CellStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarArticle {
    pub matched_article_identifier: String,
    pub matched_article_title: Option<String>,
    pub reason_for_similarity: String,
    pub matched_article_full_text: String,
}

/// Outcome of one (base article, comparison document) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonCell {
    pub country_name: String,
    pub status: CellStatus,
    #[serde(default)]
    pub similar_articles: Vec<SimilarArticle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComparisonCell {
    pub fn pending(country_name: impl Into<String>) -> Self {
        Self {
            country_name: country_name.into(),
            status: CellStatus::Pending,
            similar_articles: Vec::new(),
            error: None,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.status != CellStatus::Pending
    }

    fn settle(&mut self, next: CellStatus) -> Result<()> {
        if self.is_settled() {
            return Err(DomainError::InvalidCellTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    /// `pending -> completed`. An empty list is a legitimate "no match" outcome.
    pub fn complete(&mut self, similar_articles: Vec<SimilarArticle>) -> Result<()> {
        self.settle(CellStatus::Completed)?;
        self.similar_articles = similar_articles;
        Ok(())
    }

    /// `pending -> failed`
    pub fn fail(&mut self, error: Option<String>) -> Result<()> {
        self.settle(CellStatus::Failed)?;
        self.error = error;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub base_article_info: ArticleRecord,
    pub country_comparisons: Vec<ComparisonCell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStatus {
    Failed,
}

/// Terminal object that replaces the rows after a critical failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub status: FailureStatus,
    pub error_message: String,
    pub error_details: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Report {
    Rows(Vec<ReportRow>),
    Failed(FailureReport),
}

impl Report {
    /// Every cell `pending`; `country_names` fixes the column count for the job's lifetime.
    pub fn scaffold(base_articles: &[ArticleRecord], country_names: &[String]) -> Self {
        Report::Rows(
            base_articles
                .iter()
                .map(|article| ReportRow {
                    base_article_info: article.clone(),
                    country_comparisons: country_names
                        .iter()
                        .map(|name| ComparisonCell::pending(name.clone()))
                        .collect(),
                })
                .collect(),
        )
    }

    pub fn critical(details: impl Into<String>) -> Self {
        Report::Failed(FailureReport {
            status: FailureStatus::Failed,
            error_message: CRITICAL_ERROR_MESSAGE.to_string(),
            error_details: details.into(),
        })
    }

    pub fn rows(&self) -> &[ReportRow] {
        match self {
            Report::Rows(rows) => rows,
            Report::Failed(_) => &[],
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Report::Failed(_))
    }

    pub fn cell_mut(&mut self, row: usize, column: usize) -> Option<&mut ComparisonCell> {
        match self {
            Report::Rows(rows) => rows
                .get_mut(row)
                .and_then(|r| r.country_comparisons.get_mut(column)),
            Report::Failed(_) => None,
        }
    }

    /// True once every cell has left `pending`.
    pub fn is_settled(&self) -> bool {
        self.rows()
            .iter()
            .all(|row| row.country_comparisons.iter().all(ComparisonCell::is_settled))
    }

    /// Status grid in row-major order, for progress display and assertions.
    pub fn cell_statuses(&self) -> Vec<Vec<CellStatus>> {
        self.rows()
            .iter()
            .map(|row| row.country_comparisons.iter().map(|c| c.status).collect())
            .collect()
    }
}
