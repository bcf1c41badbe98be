//! Append-only ledger of identifiers that have already been emitted.
//!
//! The file holds one lowercase identifier per line and is only ever appended
//! to. The in-memory set is hydrated once when the ledger is opened.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::AppError;

pub const HISTORY_FILE: &str = "history.log";

#[derive(Debug)]
pub struct HistoryLedger {
    path: PathBuf,
    seen: HashSet<String>,
}

impl HistoryLedger {
    /// Opens `history.log` inside `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Self {
        Self::with_filename(dir, HISTORY_FILE)
    }

    pub fn with_filename(dir: impl AsRef<Path>, filename: &str) -> Self {
        let mut ledger = Self {
            path: dir.as_ref().join(filename),
            seen: HashSet::new(),
        };
        ledger.load();
        ledger
    }

    fn load(&mut self) {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No history file yet, starting empty");
                return;
            }
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "Failed to open history file, starting empty");
                return;
            }
        };

        for (index, line) in BufReader::new(file).split(b'\n').enumerate() {
            let bytes = match line {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!(path = %self.path.display(), error = %e, "Stopped reading history file");
                    break;
                }
            };
            match std::str::from_utf8(&bytes) {
                Ok(line) => {
                    let id = line.trim();
                    if !id.is_empty() {
                        self.seen.insert(id.to_lowercase());
                    }
                }
                Err(_) => {
                    tracing::warn!(path = %self.path.display(), line = index + 1, "Skipping undecodable history line");
                }
            }
        }

        tracing::info!(path = %self.path.display(), entries = self.seen.len(), "Loaded history");
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn exists(&self, id: &str) -> bool {
        self.seen.contains(&id.trim().to_lowercase())
    }

    /// Records `id`. A no-op if it is already known.
    ///
    /// The line is appended before returning. If the append fails the
    /// identifier stays known for this process and the failure is logged.
    pub fn add(&mut self, id: &str) {
        let id = id.trim().to_lowercase();
        if id.is_empty() || self.seen.contains(&id) {
            return;
        }

        if let Err(e) = self.append(&id) {
            tracing::error!(id = %id, error = %e, "Failed to append to history file");
        }
        self.seen.insert(id);
    }

    fn append(&self, id: &str) -> Result<(), AppError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AppError::storage(&self.path, e))?;

        FileExt::lock_exclusive(&file).map_err(|e| AppError::storage(&self.path, e))?;
        let result = (&file)
            .write_all(format!("{id}\n").as_bytes())
            .and_then(|()| file.sync_data())
            .map_err(|e| AppError::storage(&self.path, e));
        let _ = FileExt::unlock(&file);
        result
    }
}
