// Cleanup stage: release every ephemeral handle of a job (best-effort)

use crate::application::upload::HandleTable;
use crate::domain::JobId;
use crate::port::GenerationService;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

pub struct CleanupStage {
    generation: Arc<dyn GenerationService>,
}

impl CleanupStage {
    pub fn new(generation: Arc<dyn GenerationService>) -> Self {
        Self { generation }
    }

    /// Release all handles in `table`. Returns how many releases succeeded.
    ///
    /// Release failures are logged only; they never touch job status or the Report.
    pub async fn release_all(&self, job_id: &JobId, table: &mut HandleTable) -> usize {
        let handles = table.drain();
        if handles.is_empty() {
            return 0;
        }
        info!(job_id = %job_id, handles = handles.len(), "Releasing uploaded artifacts");

        let releases = handles.iter().map(|(artifact, handle)| async move {
            match self.generation.release(handle).await {
                Ok(()) => {
                    info!(job_id = %job_id, artifact = %artifact, "Released");
                    true
                }
                Err(e) => {
                    warn!(
                        job_id = %job_id,
                        artifact = %artifact,
                        handle = %handle.name,
                        error = %e,
                        "Could not release uploaded artifact"
                    );
                    false
                }
            }
        });

        join_all(releases).await.into_iter().filter(|ok| *ok).count()
    }
}
