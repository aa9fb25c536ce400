//! Per-run bookkeeping: result CSVs, a JSON summary and resume support.
//!
//! Each run writes into its own `run-<timestamp>` folder under the outputs
//! directory. A later run can resume from one of them, skipping URLs that
//! already succeeded and retrying the ones that failed.

mod batch;

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::bookmarks::{BookmarkRecord, Status};

pub use batch::{BatchEnd, RETRY_PENDING, plan_resume, process_batch};

const RUN_PREFIX: &str = "run-";
const SUCCESSFUL_FILE: &str = "successful.csv";
const FAILED_FILE: &str = "failed.csv";
const SUMMARY_FILE: &str = "summary.json";

#[derive(Error, Debug)]
pub enum RunError {
    #[error("run folder I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("malformed results file: {0}")]
    Csv(#[from] csv::Error),

    #[error("summary serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> RunError + '_ {
    move |source| RunError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { output_path: PathBuf },
    Failed { error: String },
}

/// What happened to one bookmark during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub record: BookmarkRecord,
    pub outcome: Outcome,
}

impl ConversionResult {
    pub fn success(record: BookmarkRecord, output_path: PathBuf) -> Self {
        Self {
            record,
            outcome: Outcome::Success { output_path },
        }
    }

    pub fn failed(record: BookmarkRecord, error: impl Into<String>) -> Self {
        Self {
            record,
            outcome: Outcome::Failed {
                error: error.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }
}

/// Record `result`, replacing an earlier entry for the same URL.
pub fn upsert(results: &mut Vec<ConversionResult>, result: ConversionResult) {
    match results
        .iter_mut()
        .find(|existing| existing.record.url == result.record.url)
    {
        Some(existing) => *existing = result,
        None => results.push(result),
    }
}

/// Outcome of an earlier run, as needed to resume it.
#[derive(Debug, Default)]
pub struct PreviousResults {
    pub successful: HashSet<String>,
    pub failed: Vec<BookmarkRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SuccessRow {
    title: String,
    url: String,
    time_added: String,
    tags: String,
    status: Status,
    output_path: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct FailureRow {
    title: String,
    url: String,
    time_added: String,
    tags: String,
    status: String,
    error: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub timestamp: String,
    pub output_dir: String,
}

/// Folder name for a run started now: `run-YYYY-MM-DDTHH-MM-SS`.
pub fn run_folder_name() -> String {
    format!("{RUN_PREFIX}{}", Utc::now().format("%Y-%m-%dT%H-%M-%S"))
}

pub fn create_run_folder(outputs: &Path) -> Result<PathBuf, RunError> {
    let folder = outputs.join(run_folder_name());
    fs::create_dir_all(&folder).map_err(io_error(&folder))?;
    info!(folder = %folder.display(), "created run folder");
    Ok(folder)
}

/// The most recent `run-*` folder, if any. Timestamps sort lexicographically.
pub fn find_latest_run(outputs: &Path) -> Result<Option<PathBuf>, RunError> {
    if !outputs.exists() {
        return Ok(None);
    }

    let mut latest: Option<String> = None;
    for entry in fs::read_dir(outputs).map_err(io_error(outputs))? {
        let entry = entry.map_err(io_error(outputs))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(RUN_PREFIX)
            && entry.path().is_dir()
            && latest.as_ref().is_none_or(|current| name > *current)
        {
            latest = Some(name);
        }
    }

    Ok(latest.map(|name| outputs.join(name)))
}

pub fn read_previous_results(folder: &Path) -> Result<PreviousResults, RunError> {
    let mut previous = PreviousResults::default();

    let successful_path = folder.join(SUCCESSFUL_FILE);
    if successful_path.exists() {
        let mut reader = csv::Reader::from_path(&successful_path)?;
        for row in reader.deserialize::<SuccessRow>() {
            previous.successful.insert(row?.url);
        }
    }

    let failed_path = folder.join(FAILED_FILE);
    if failed_path.exists() {
        let mut reader = csv::Reader::from_path(&failed_path)?;
        for row in reader.deserialize::<FailureRow>() {
            let row = row?;
            if row.url.is_empty() {
                continue;
            }
            previous.failed.push(BookmarkRecord {
                title: row.title,
                url: row.url,
                time_added: row.time_added,
                tags: row.tags,
                status: Status::from_export(&row.status),
            });
        }
    }

    info!(
        folder = %folder.display(),
        successful = previous.successful.len(),
        failed = previous.failed.len(),
        "loaded previous run"
    );
    Ok(previous)
}

/// Write `successful.csv` and `failed.csv` (each only when non-empty) and
/// `summary.json` into `folder`.
pub fn write_results(results: &[ConversionResult], folder: &Path) -> Result<Summary, RunError> {
    let mut successful = Vec::new();
    let mut failed = Vec::new();
    for result in results {
        let record = &result.record;
        match &result.outcome {
            Outcome::Success { output_path } => successful.push(SuccessRow {
                title: record.title.clone(),
                url: record.url.clone(),
                time_added: record.time_added.clone(),
                tags: record.tags.clone(),
                status: record.status,
                output_path: output_path.display().to_string(),
            }),
            Outcome::Failed { error } => failed.push(FailureRow {
                title: record.title.clone(),
                url: record.url.clone(),
                time_added: record.time_added.clone(),
                tags: record.tags.clone(),
                status: record.status.to_string(),
                error: error.clone(),
            }),
        }
    }

    write_rows(&folder.join(SUCCESSFUL_FILE), &successful)?;
    write_rows(&folder.join(FAILED_FILE), &failed)?;

    let summary = Summary {
        total: results.len(),
        successful: successful.len(),
        failed: failed.len(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        output_dir: folder.display().to_string(),
    };
    let summary_path = folder.join(SUMMARY_FILE);
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)
        .map_err(io_error(&summary_path))?;

    if summary.failed > 0 {
        warn!(failed = summary.failed, "some bookmarks could not be clipped");
    }
    info!(
        total = summary.total,
        successful = summary.successful,
        failed = summary.failed,
        "wrote run results"
    );
    Ok(summary)
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), RunError> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(io_error(path))?;
    Ok(())
}
