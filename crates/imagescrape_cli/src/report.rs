//! End-of-run summary printed to stdout.

use std::fmt::Write;

use imagescrape_engine::{summarize, DownloadOutcome, QueryStatus, RunReport};

pub fn render(run: &RunReport, outcomes: &[DownloadOutcome]) -> String {
    let mut out = String::new();
    for query in &run.queries {
        let line = match &query.status {
            QueryStatus::Completed {
                discovery,
                new_references,
            } => format!(
                "{new_references} new images after {} scrolls",
                discovery.iterations
            ),
            QueryStatus::Failed(err) => format!("failed: {err}"),
            QueryStatus::Skipped => "skipped".to_string(),
        };
        let _ = writeln!(out, "  \"{}\": {}", query.query, line);
    }

    let summary = summarize(outcomes);
    let _ = writeln!(
        out,
        "queries: {} completed, {} failed",
        run.succeeded(),
        run.failed()
    );
    let _ = writeln!(
        out,
        "downloads: {} saved, {} failed",
        summary.succeeded, summary.failed
    );
    if let Some(reason) = &run.aborted {
        let _ = writeln!(out, "run aborted: {reason}");
    }
    out
}
