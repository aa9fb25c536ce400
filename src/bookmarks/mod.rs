//! Reading saved-link exports.
//!
//! The export is a CSV file with a header row naming at least `url`; `title`,
//! `time_added`, `tags` and `status` are optional and default to empty.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Which vault folder a bookmark belongs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Unread,
    Archive,
}

impl Status {
    /// `unread` stays unread; every other export value means archived.
    pub fn from_export(raw: &str) -> Self {
        if raw == "unread" {
            Self::Unread
        } else {
            Self::Archive
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unread => "unread",
            Self::Archive => "archive",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One saved link from the export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkRecord {
    pub title: String,
    pub url: String,
    /// Opaque token, used verbatim in file names.
    pub time_added: String,
    pub tags: String,
    pub status: Status,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExportRow {
    title: String,
    url: String,
    time_added: String,
    tags: String,
    status: String,
}

impl ExportRow {
    fn into_record(self) -> Option<BookmarkRecord> {
        if self.url.trim().is_empty() {
            return None;
        }
        Some(BookmarkRecord {
            title: self.title,
            url: self.url,
            time_added: self.time_added,
            tags: self.tags,
            status: Status::from_export(&self.status),
        })
    }
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("cannot open export {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed export: {0}")]
    Csv(#[from] csv::Error),
}

/// Read every record with a URL from the export file at `path`.
pub fn read_export(path: impl AsRef<Path>) -> Result<Vec<BookmarkRecord>, ExportError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ExportError::Open {
        path: path.display().to_string(),
        source,
    })?;
    let records = parse_export(file)?;
    info!(path = %path.display(), count = records.len(), "loaded bookmark export");
    Ok(records)
}

pub fn parse_export<R: Read>(reader: R) -> Result<Vec<BookmarkRecord>, ExportError> {
    let mut csv = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for row in csv.deserialize::<ExportRow>() {
        match row?.into_record() {
            Some(record) => records.push(record),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(skipped, "dropped rows without a url");
    }
    Ok(records)
}
