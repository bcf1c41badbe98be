//! Date-partitioned files of emitted magnet links.
//!
//! The daemon appends one link per line to `magnets_YYYY-MM-DD.txt` under an
//! exclusive lock; readers take a shared lock per file.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use fs2::FileExt;

use crate::error::AppError;
use crate::link::ParsedLink;

const FILE_PREFIX: &str = "magnets_";
const FILE_SUFFIX: &str = ".txt";

/// Default number of links returned by [`LinkArchive::recent`].
pub const DEFAULT_RECENT_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub struct LinkArchive {
    dir: PathBuf,
}

impl LinkArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{FILE_PREFIX}{}{FILE_SUFFIX}", date.format("%Y-%m-%d")))
    }

    /// Appends `link` to today's file (local time).
    pub fn append_today(&self, link: &str) -> Result<PathBuf, AppError> {
        self.append(Local::now().date_naive(), link)
    }

    pub fn append(&self, date: NaiveDate, link: &str) -> Result<PathBuf, AppError> {
        let path = self.path_for(date);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| AppError::storage(&path, e))?;

        FileExt::lock_exclusive(&file).map_err(|e| AppError::storage(&path, e))?;
        let result = (&file)
            .write_all(format!("{}\n", link.trim()).as_bytes())
            .map_err(|e| AppError::storage(&path, e));
        let _ = FileExt::unlock(&file);

        result.map(|()| path)
    }

    /// Dated files in chronological order.
    fn files(&self) -> Result<Vec<PathBuf>, AppError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::storage(&self.dir, e)),
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .and_then(|n| n.strip_prefix(FILE_PREFIX))
                    .and_then(|n| n.strip_suffix(FILE_SUFFIX))
                    .is_some_and(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok())
            })
            .collect();
        files.sort();
        Ok(files)
    }

    /// Reads a dated file under a shared lock. Undecodable bytes are
    /// replaced so one damaged line does not hide the rest of the file.
    fn read_locked(path: &Path) -> Result<String, AppError> {
        let mut file = File::open(path).map_err(|e| AppError::storage(path, e))?;
        FileExt::lock_shared(&file).map_err(|e| AppError::storage(path, e))?;
        let mut bytes = Vec::new();
        let result = file
            .read_to_end(&mut bytes)
            .map_err(|e| AppError::storage(path, e));
        let _ = FileExt::unlock(&file);
        result.map(|_| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// The most recent `limit` links across all dated files, newest first.
    ///
    /// Lines that are not magnet links are ignored.
    pub fn recent(&self, limit: usize) -> Result<Vec<ParsedLink>, AppError> {
        let mut links = Vec::new();
        for path in self.files()?.iter().rev() {
            let contents = match Self::read_locked(path) {
                Ok(contents) => contents,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable link file");
                    continue;
                }
            };
            for line in contents.lines().rev() {
                if links.len() >= limit {
                    return Ok(links);
                }
                if let Some(link) = ParsedLink::parse(line) {
                    links.push(link);
                }
            }
        }
        Ok(links)
    }
}
