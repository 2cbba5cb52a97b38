// SQLite JobRepository Implementation

use async_trait::async_trait;
use lexcompare_core::domain::{DocumentRef, Job, JobId, JobState};
use lexcompare_core::error::{AppError, Result};
use lexcompare_core::port::JobRepository;
use sqlx::SqlitePool;

// Helper to convert sqlx::Error to AppError with structured information
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            // Extract database-specific error code and message
            if let Some(code) = db_err.code() {
                let code_str = code.as_ref();

                // SQLite error codes: https://www.sqlite.org/rescode.html
                match code_str {
                    "2067" | "1555" => {
                        // UNIQUE constraint failed
                        AppError::Database(format!(
                            "Unique constraint violation: {} ({})",
                            db_err.message(),
                            code_str
                        ))
                    }
                    "5" => {
                        // SQLITE_BUSY - database is locked
                        AppError::Database(format!(
                            "Database locked (SQLITE_BUSY): {}",
                            db_err.message()
                        ))
                    }
                    "13" => {
                        // SQLITE_FULL - database or disk is full
                        AppError::Database(format!("Database full: {}", db_err.message()))
                    }
                    _ => AppError::Database(format!(
                        "Database error [{}]: {}",
                        code_str,
                        db_err.message()
                    )),
                }
            } else {
                AppError::Database(format!("Database error: {}", db_err.message()))
            }
        }
        sqlx::Error::RowNotFound => AppError::Database("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => {
            AppError::Database(format!("Column not found: {}", col))
        }
        // Connection, pool, protocol errors
        _ => AppError::Database(err.to_string()),
    }
}

pub struct SqliteJobRepository {
    pool: SqlitePool,
}

impl SqliteJobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    async fn insert(&self, job: &Job) -> Result<()> {
        let comparison_documents = serde_json::to_string(&job.comparison_documents)?;

        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, primary_document, comparison_documents, state,
                created_at, started_at, finished_at, error
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(job.primary_document.to_string())
        .bind(&comparison_documents)
        .bind(job.state.to_string())
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.finished_at)
        .bind(&job.error)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(JobRow::into_job).transpose()
    }

    async fn update(&self, job: &Job) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET state = ?, started_at = ?, finished_at = ?, error = ?
            WHERE id = ?
            "#,
        )
        .bind(job.state.to_string())
        .bind(job.started_at)
        .bind(job.finished_at)
        .bind(&job.error)
        .bind(&job.id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::JobNotFound(job.id.clone()));
        }
        Ok(())
    }

    async fn find_by_state(&self, state: JobState) -> Result<Vec<Job>> {
        let rows: Vec<JobRow> = sqlx::query_as(
            r#"
            SELECT * FROM jobs
            WHERE state = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(state.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(JobRow::into_job).collect()
    }

    async fn count_by_state(&self, state: JobState) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE state = ?")
            .bind(state.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(count)
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    primary_document: String,
    comparison_documents: String, // JSON array
    state: String,
    created_at: i64,
    started_at: Option<i64>,
    finished_at: Option<i64>,
    error: Option<String>,
}

impl JobRow {
    fn into_job(self) -> Result<Job> {
        let state = JobState::parse(&self.state).ok_or_else(|| {
            AppError::Database(format!("Unknown job state {:?} for {}", self.state, self.id))
        })?;
        let comparison_documents: Vec<DocumentRef> =
            serde_json::from_str(&self.comparison_documents)?;

        Ok(Job {
            id: self.id,
            primary_document: DocumentRef::new(self.primary_document),
            comparison_documents,
            state,
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
            error: self.error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};

    async fn setup_test_db() -> SqlitePool {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    fn job() -> Job {
        Job::new_test(
            "/data/abc_primary_jordan.pdf",
            &["/data/abc_cmp_egypt.pdf", "/data/abc_cmp_france.pdf"],
        )
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let repo = SqliteJobRepository::new(setup_test_db().await);
        let job = job();

        repo.insert(&job).await.unwrap();

        let found = repo.find_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(found.id, job.id);
        assert_eq!(found.state, JobState::Created);
        assert_eq!(found.primary_document, job.primary_document);
        // Column order survives the round trip
        assert_eq!(found.comparison_documents, job.comparison_documents);

        assert!(repo.find_by_id(&"missing".to_string()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_rejected() {
        let repo = SqliteJobRepository::new(setup_test_db().await);
        let job = job();
        repo.insert(&job).await.unwrap();

        let err = repo.insert(&job).await.unwrap_err();
        assert!(err.to_string().contains("Unique constraint violation"));
    }

    #[tokio::test]
    async fn test_update_persists_lifecycle_fields() {
        let repo = SqliteJobRepository::new(setup_test_db().await);
        let mut job = job();
        repo.insert(&job).await.unwrap();

        job.begin_extraction(100).unwrap();
        job.fail_critically(200, "Extraction failed for jordan.pdf").unwrap();
        repo.update(&job).await.unwrap();

        let found = repo.find_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(found.state, JobState::CriticalFailure);
        assert_eq!(found.started_at, Some(100));
        assert_eq!(found.finished_at, Some(200));
        assert_eq!(found.error.as_deref(), Some("Extraction failed for jordan.pdf"));
    }

    #[tokio::test]
    async fn test_update_unknown_job_is_not_found() {
        let repo = SqliteJobRepository::new(setup_test_db().await);
        let err = repo.update(&job()).await.unwrap_err();
        assert!(matches!(err, AppError::JobNotFound(_)));
    }

    #[tokio::test]
    async fn test_find_and_count_by_state() {
        let repo = SqliteJobRepository::new(setup_test_db().await);
        let first = job();
        let mut second = job();
        repo.insert(&first).await.unwrap();
        repo.insert(&second).await.unwrap();

        second.begin_extraction(1).unwrap();
        repo.update(&second).await.unwrap();

        let created = repo.find_by_state(JobState::Created).await.unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].id, first.id);
        assert_eq!(repo.count_by_state(JobState::Extracting).await.unwrap(), 1);
        assert_eq!(repo.count_by_state(JobState::Done).await.unwrap(), 0);
    }
}
