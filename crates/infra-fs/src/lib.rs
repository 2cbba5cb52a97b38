// LexCompare Infrastructure - Filesystem Adapters
// Implements: ResultStore, DocumentStore

mod document_store;
mod result_store;

pub use document_store::FsDocumentStore;
pub use result_store::FsResultStore;

use lexcompare_core::error::Result;
use serde::Serialize;
use std::path::Path;

/// Serialize `value` as pretty JSON and replace `path` atomically.
///
/// The document is written to a sibling temp file and renamed over the
/// target, so a concurrent reader sees the old or the new content only.
pub(crate) async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    tokio::fs::write(&tmp, &bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}
