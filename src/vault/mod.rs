//! Placing rendered notes inside the vault.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::bookmarks::{BookmarkRecord, Status};

const CLIPPINGS_DIR: &str = "Clippings";
const MAX_SLUG_LEN: usize = 100;

#[derive(Debug, Clone)]
pub struct Vault {
    root: PathBuf,
}

impl Vault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/Clippings/<unread|archive>/<slug>-<time_added>.md`
    pub fn note_path(&self, record: &BookmarkRecord) -> PathBuf {
        let folder = match record.status {
            Status::Unread => "unread",
            Status::Archive => "archive",
        };
        let file_name = format!("{}-{}.md", slugify(&record.title), record.time_added);
        self.root.join(CLIPPINGS_DIR).join(folder).join(file_name)
    }

    /// Write `markdown` to the record's note path, creating folders as
    /// needed. An existing note at that path is replaced.
    pub fn write_note(&self, record: &BookmarkRecord, markdown: &str) -> io::Result<PathBuf> {
        let path = self.note_path(record);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, markdown)?;
        debug!(path = %path.display(), "wrote note");
        Ok(path)
    }
}

/// Lowercase ASCII letters and digits, every other run of characters
/// collapsed to one `-`, capped in length. Empty slugs become `untitled`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len().min(MAX_SLUG_LEN));
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }

    slug.truncate(MAX_SLUG_LEN);
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug.to_string()
    }
}
