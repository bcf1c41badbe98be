//! Durable JSON file shared between a writer and concurrent readers.
//!
//! Writes go to a sibling `<name>.tmp` file which is flushed, synced and then
//! renamed over the target, so the target path always holds either the old or
//! the new complete document. A sibling `<name>.lock` file carries advisory
//! locks: exclusive for the whole write-and-rename, shared for reads.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AtomicStore {
    path: PathBuf,
    tmp_path: PathBuf,
    lock_path: PathBuf,
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

impl AtomicStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            tmp_path: sibling(&path, ".tmp"),
            lock_path: sibling(&path, ".lock"),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn open_lock(&self) -> Result<File, AppError> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| AppError::storage(&self.lock_path, e))
    }

    /// Reads and deserializes the document. Returns `Ok(None)` if it does not exist.
    pub fn load<T: DeserializeOwned>(&self) -> Result<Option<T>, AppError> {
        // Readers without write access to the directory still get a consistent
        // view thanks to the rename, just without the shared lock.
        let lock = match self.open_lock() {
            Ok(file) => {
                FileExt::lock_shared(&file).map_err(|e| AppError::storage(&self.lock_path, e))?;
                Some(file)
            }
            Err(e) => {
                tracing::debug!(error = %e, "Reading without shared lock");
                None
            }
        };

        let result = match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(AppError::from),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::storage(&self.path, e)),
        };

        if let Some(file) = lock {
            let _ = FileExt::unlock(&file);
        }
        result
    }

    /// Serializes `value` and atomically replaces the document.
    ///
    /// On failure the temp file is removed best-effort and the error returned.
    pub fn store<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), AppError> {
        let lock = self.open_lock()?;
        FileExt::lock_exclusive(&lock).map_err(|e| AppError::storage(&self.lock_path, e))?;

        let result = self.write_and_replace(value);
        if result.is_err() && self.tmp_path.exists() {
            if let Err(e) = fs::remove_file(&self.tmp_path) {
                tracing::warn!(path = %self.tmp_path.display(), error = %e, "Failed to remove temp file");
            }
        }

        let _ = FileExt::unlock(&lock);
        result
    }

    fn write_and_replace<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), AppError> {
        let file = File::create(&self.tmp_path).map_err(|e| AppError::storage(&self.tmp_path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer
            .flush()
            .map_err(|e| AppError::storage(&self.tmp_path, e))?;
        let file = writer
            .into_inner()
            .map_err(|e| AppError::storage(&self.tmp_path, e.into_error()))?;
        file.sync_all()
            .map_err(|e| AppError::storage(&self.tmp_path, e))?;
        drop(file);

        fs::rename(&self.tmp_path, &self.path).map_err(|e| AppError::storage(&self.path, e))?;
        sync_parent_dir(&self.path);
        Ok(())
    }
}

/// Persist the rename itself. Best-effort: not every platform can open directories.
fn sync_parent_dir(path: &Path) {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if let Ok(dir) = File::open(parent) {
        let _ = dir.sync_all();
    }
}
