// Filesystem ResultStore: one `results_{job_id}.json` per job

use crate::write_json_atomic;
use async_trait::async_trait;
use lexcompare_core::domain::{JobId, Report};
use lexcompare_core::error::{AppError, Result};
use lexcompare_core::port::ResultStore;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct FsResultStore {
    data_dir: PathBuf,
}

impl FsResultStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Location of a job's Report.
    ///
    /// The id must be a plain file-name fragment; anything that could name
    /// another path is rejected.
    pub fn report_path(&self, job_id: &str) -> Result<PathBuf> {
        let is_plain = !job_id.is_empty()
            && job_id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if !is_plain {
            return Err(AppError::Validation(format!("Invalid job id: {:?}", job_id)));
        }
        Ok(self.data_dir.join(format!("results_{}.json", job_id)))
    }
}

#[async_trait]
impl ResultStore for FsResultStore {
    async fn write(&self, job_id: &JobId, report: &Report) -> Result<()> {
        let path = self.report_path(job_id)?;
        write_json_atomic(&path, report).await?;
        debug!(job_id = %job_id, path = %path.display(), "Report written");
        Ok(())
    }

    async fn read(&self, job_id: &JobId) -> Result<Option<Report>> {
        let path = self.report_path(job_id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| {
                AppError::Internal(format!("Corrupt report {}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
