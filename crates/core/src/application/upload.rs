// Upload stage: register extraction artifacts, track the ephemeral handles

use crate::application::constants::ARTIFACT_MIME_TYPE;
use crate::application::retry::{CallFailure, RetryableCallExecutor};
use crate::domain::DocumentRef;
use crate::port::{DocumentHandle, GenerationService};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Job-scoped handle table, keyed by artifact file name.
///
/// Acquired on successful upload, released by the cleanup stage on every
/// normal exit path.
#[derive(Debug, Default)]
pub struct HandleTable {
    handles: BTreeMap<String, DocumentHandle>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `handle` under `doc`'s artifact name.
    ///
    /// An occupied slot is never overwritten: the rejected handle is given
    /// back so the caller can release it.
    pub fn insert(
        &mut self,
        doc: &DocumentRef,
        handle: DocumentHandle,
    ) -> Result<(), DocumentHandle> {
        match self.handles.entry(doc.artifact_name()) {
            Entry::Occupied(_) => Err(handle),
            Entry::Vacant(slot) => {
                slot.insert(handle);
                Ok(())
            }
        }
    }

    pub fn get(&self, doc: &DocumentRef) -> Option<&DocumentHandle> {
        self.handles.get(&doc.artifact_name())
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Hand over every handle, leaving the table empty
    pub fn drain(&mut self) -> Vec<(String, DocumentHandle)> {
        std::mem::take(&mut self.handles).into_iter().collect()
    }
}

pub struct UploadStage {
    generation: Arc<dyn GenerationService>,
    executor: Arc<RetryableCallExecutor>,
}

impl UploadStage {
    pub fn new(generation: Arc<dyn GenerationService>, executor: Arc<RetryableCallExecutor>) -> Self {
        Self {
            generation,
            executor,
        }
    }

    /// Register `doc`'s JSON artifact and record the handle in `table`.
    pub async fn upload(
        &self,
        doc: &DocumentRef,
        table: &mut HandleTable,
    ) -> Result<DocumentHandle, CallFailure> {
        let artifact = doc.artifact_path();
        let handle = self
            .executor
            .execute("upload", |_| {
                self.generation.register(&artifact, ARTIFACT_MIME_TYPE)
            })
            .await?;

        if let Err(rejected) = table.insert(doc, handle.clone()) {
            warn!(
                artifact = %doc.artifact_name(),
                handle = %rejected.name,
                "Artifact already has a handle in this job; releasing the new one"
            );
            if let Err(e) = self.generation.release(&rejected).await {
                warn!(handle = %rejected.name, error = %e, "Could not release duplicate handle");
            }
            return Err(CallFailure::fatal(format!(
                "Artifact {} is already uploaded for this job",
                doc.artifact_name()
            )));
        }

        info!(
            artifact = %doc.artifact_name(),
            handle = %handle.name,
            "Uploaded extraction artifact"
        );
        Ok(handle)
    }
}
