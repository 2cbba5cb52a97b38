// Document identity and artifact layout

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const PRIMARY_PREFIX: &str = "primary_";
const COMPARISON_PREFIX: &str = "cmp";

/// Role a document plays inside a job; also the staging file-name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentRole {
    Primary,
    /// 1-based position among the requested comparison documents
    Comparison(usize),
}

impl DocumentRole {
    /// `primary_` or `cmp{slot}_`. Numbered slots keep sources that share a
    /// file stem from sharing an artifact.
    pub fn staging_prefix(&self) -> String {
        match self {
            DocumentRole::Primary => PRIMARY_PREFIX.to_string(),
            DocumentRole::Comparison(slot) => format!("{}{}_", COMPARISON_PREFIX, slot),
        }
    }
}

/// Strip `cmp_` or `cmp{slot}_`
fn strip_comparison_prefix(name: &str) -> Option<&str> {
    name.strip_prefix(COMPARISON_PREFIX)?
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .strip_prefix('_')
}

/// Reference to a source document on disk.
///
/// Extraction artifacts live beside the source: `<stem>.json` for the article
/// list, `<stem>.error.json` for the diagnostic of a failed extraction. The
/// artifact file name is the document's identity in the upload handle table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentRef {
    path: PathBuf,
}

impl DocumentRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.path.with_extension("json")
    }

    pub fn diagnostic_path(&self) -> PathBuf {
        self.path.with_extension("error.json")
    }

    /// Handle-table key
    pub fn artifact_name(&self) -> String {
        self.artifact_path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Human-facing name: file stem without the job staging prefixes.
    pub fn display_name(&self, job_id: &str) -> String {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let job_prefix = format!("{}_", job_id);
        let name = stem.strip_prefix(job_prefix.as_str()).unwrap_or(&stem);
        name.strip_prefix(PRIMARY_PREFIX)
            .or_else(|| strip_comparison_prefix(name))
            .unwrap_or(name)
            .to_string()
    }

    /// MIME type used when registering the source itself with the generation service.
    pub fn source_mime_type(&self) -> &'static str {
        let ext = self
            .path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => "application/pdf",
            "txt" => "text/plain",
            "json" => "application/json",
            "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            _ => "application/octet-stream",
        }
    }
}

impl std::fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_layout() {
        let doc = DocumentRef::new("/data/abc_cmp_egypt.pdf");
        assert_eq!(doc.artifact_path(), PathBuf::from("/data/abc_cmp_egypt.json"));
        assert_eq!(
            doc.diagnostic_path(),
            PathBuf::from("/data/abc_cmp_egypt.error.json")
        );
        assert_eq!(doc.artifact_name(), "abc_cmp_egypt.json");
    }

    #[test]
    fn test_display_name_strips_staging_prefixes() {
        let cmp = DocumentRef::new("/data/abc_cmp_egypt_civil_code.pdf");
        assert_eq!(cmp.display_name("abc"), "egypt_civil_code");

        let slotted = DocumentRef::new("/data/abc_cmp12_egypt.docx");
        assert_eq!(slotted.display_name("abc"), "egypt");

        let primary = DocumentRef::new("/data/abc_primary_jordan.pdf");
        assert_eq!(primary.display_name("abc"), "jordan");

        // Unstaged documents keep their stem
        let plain = DocumentRef::new("/srv/demo/france.pdf");
        assert_eq!(plain.display_name("abc"), "france");
    }

    #[test]
    fn test_comparison_slots_get_distinct_artifacts() {
        assert_eq!(DocumentRole::Primary.staging_prefix(), "primary_");
        assert_eq!(DocumentRole::Comparison(2).staging_prefix(), "cmp2_");

        // Same stem, different extensions, different slots
        let pdf = DocumentRef::new("/data/abc_cmp1_egypt.pdf");
        let docx = DocumentRef::new("/data/abc_cmp2_egypt.docx");
        assert_ne!(pdf.artifact_name(), docx.artifact_name());
        assert_eq!(pdf.display_name("abc"), docx.display_name("abc"));
    }

    #[test]
    fn test_source_mime_type() {
        assert_eq!(DocumentRef::new("a.PDF").source_mime_type(), "application/pdf");
        assert_eq!(DocumentRef::new("a.txt").source_mime_type(), "text/plain");
        assert_eq!(
            DocumentRef::new("a.bin").source_mime_type(),
            "application/octet-stream"
        );
    }
}
