use std::path::{Path, PathBuf};

use serde_json::json;

use crate::persist::{AtomicFileWriter, PersistError};
use crate::{DownloadOutcome, QueryStatus, RunReport};

pub const MANIFEST_FILENAME: &str = "manifest.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DownloadSummary {
    pub succeeded: usize,
    pub failed: usize,
}

pub fn summarize(outcomes: &[DownloadOutcome]) -> DownloadSummary {
    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    DownloadSummary {
        succeeded,
        failed: outcomes.len() - succeeded,
    }
}

/// Write `manifest.json` describing the run into `output_dir`.
/// Outcomes are listed sorted by URL.
pub fn write_manifest(
    output_dir: &Path,
    generated_utc: &str,
    run: &RunReport,
    outcomes: &[DownloadOutcome],
) -> Result<PathBuf, PersistError> {
    let summary = summarize(outcomes);
    let mut sorted: Vec<&DownloadOutcome> = outcomes.iter().collect();
    sorted.sort_by(|a, b| a.reference.url.cmp(&b.reference.url));

    let manifest = json!({
        "generated_utc": generated_utc,
        "aborted": run.aborted,
        "queries": run.queries.iter().map(|q| {
            let (status, detail) = match &q.status {
                QueryStatus::Completed { new_references, .. } => {
                    ("completed", json!({ "new_references": new_references }))
                }
                QueryStatus::Failed(err) => ("failed", json!({ "error": err.to_string() })),
                QueryStatus::Skipped => ("skipped", json!({})),
            };
            json!({ "query": q.query.as_str(), "status": status, "detail": detail })
        }).collect::<Vec<_>>(),
        "total_references": outcomes.len(),
        "succeeded": summary.succeeded,
        "failed": summary.failed,
        "files": sorted.iter().map(|o| {
            match &o.result {
                Ok(path) => json!({
                    "url": o.reference.url,
                    "query": o.reference.query.as_str(),
                    "path": path.file_name().map(|n| n.to_string_lossy().into_owned()),
                }),
                Err(err) => json!({
                    "url": o.reference.url,
                    "query": o.reference.query.as_str(),
                    "error": err.to_string(),
                }),
            }
        }).collect::<Vec<_>>(),
    });

    let content = serde_json::to_vec_pretty(&manifest).map_err(|err| PersistError::Write {
        path: output_dir.join(MANIFEST_FILENAME),
        source: std::io::Error::other(err),
    })?;
    AtomicFileWriter::new(output_dir.to_path_buf()).write(MANIFEST_FILENAME, &content)
}
