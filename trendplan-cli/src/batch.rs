//! Batch planning: every `*.json` request in a directory, in parallel.
//!
//! Each request is independent, so files are fanned out over rayon's pool.
//! Output for `foo.json` is written to `foo.plan.json` beside it; existing
//! `*.plan.json` files are never treated as requests.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use trendplan_core::Planner;

use crate::request::handle_request;

const PLAN_SUFFIX: &str = ".plan.json";

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub planned: usize,
    pub degraded: usize,
    /// Files that could not be read or written.
    pub failed: Vec<(PathBuf, String)>,
}

enum FileOutcome {
    Planned,
    Degraded,
}

/// Request files in `dir`, sorted by name.
pub fn request_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in
        std::fs::read_dir(dir).with_context(|| format!("cannot read {}", dir.display()))?
    {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if path.is_file() && name.ends_with(".json") && !name.ends_with(PLAN_SUFFIX) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Output path for a request file: `<stem>.plan.json`.
pub fn plan_path(request: &Path) -> PathBuf {
    let stem = request
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    request.with_file_name(format!("{stem}{PLAN_SUFFIX}"))
}

fn plan_file(path: &Path, planner: &Planner) -> Result<FileOutcome> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let response = handle_request(&raw, planner);
    let json = serde_json::to_string_pretty(&response).context("failed to serialize plan")?;
    let out = plan_path(path);
    std::fs::write(&out, json).with_context(|| format!("cannot write {}", out.display()))?;
    Ok(if response.is_degraded() {
        FileOutcome::Degraded
    } else {
        FileOutcome::Planned
    })
}

/// Plan every request in `dir`.
pub fn run_batch(dir: &Path, planner: &Planner) -> Result<BatchSummary> {
    let files = request_files(dir)?;
    tracing::info!(dir = %dir.display(), files = files.len(), "planning batch");

    let outcomes: Vec<(PathBuf, Result<FileOutcome>)> = files
        .into_par_iter()
        .map(|path| {
            let outcome = plan_file(&path, planner);
            (path, outcome)
        })
        .collect();

    let mut summary = BatchSummary::default();
    for (path, outcome) in outcomes {
        match outcome {
            Ok(FileOutcome::Planned) => summary.planned += 1,
            Ok(FileOutcome::Degraded) => summary.degraded += 1,
            Err(e) => {
                tracing::error!(file = %path.display(), error = %format!("{e:#}"), "batch item failed");
                summary.failed.push((path, format!("{e:#}")));
            }
        }
    }
    Ok(summary)
}
