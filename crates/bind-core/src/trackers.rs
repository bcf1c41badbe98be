//! Persistent list of BitTorrent announce URLs.
//!
//! Stored as a JSON array in `trackers.json`, one directory above the output
//! directory, so the dashboard process can read it while the daemon writes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::atomic_store::AtomicStore;
use crate::error::AppError;

pub const TRACKERS_FILE: &str = "trackers.json";

const VALID_SCHEMES: [&str; 3] = ["udp://", "http://", "https://"];

const DEFAULT_TRACKERS: [&str; 5] = [
    "udp://tracker.opentrackr.org:1337/announce",
    "udp://tracker.openbittorrent.com:80/announce",
    "udp://9.rarbg.to:2710/announce",
    "http://tracker.openbittorrent.com:80/announce",
    "udp://tracker.coppersurfer.tk:6969/announce",
];

#[derive(Debug, Clone)]
pub struct TrackerManager {
    store: AtomicStore,
}

impl TrackerManager {
    /// Opens the tracker store for `output_dir`, writing the defaults if absent.
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = Self::path_for(output_dir.as_ref());
        tracing::info!(path = %path.display(), "Resolved tracker store path");

        let manager = Self {
            store: AtomicStore::new(path),
        };
        if !manager.store.exists() {
            tracing::info!("Tracker store missing, initializing with defaults");
            manager.save(&Self::defaults())?;
        }
        Ok(manager)
    }

    /// `trackers.json` beside `output_dir`.
    pub fn path_for(output_dir: &Path) -> PathBuf {
        match output_dir.parent() {
            Some(parent) => parent.join(TRACKERS_FILE),
            None => output_dir.join(TRACKERS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }

    pub fn defaults() -> Vec<String> {
        DEFAULT_TRACKERS.iter().map(|t| t.to_string()).collect()
    }

    /// Returns the persisted trackers, or the defaults if they cannot be read.
    pub fn get(&self) -> Vec<String> {
        match self.store.load::<Vec<String>>() {
            Ok(Some(trackers)) => Self::normalize(&trackers),
            Ok(None) => Self::defaults(),
            Err(e) => {
                tracing::error!(path = %self.path().display(), error = %e, "Failed to load trackers");
                Self::defaults()
            }
        }
    }

    /// Normalizes and atomically persists `trackers`.
    ///
    /// Errors are returned to the caller: a lost update would silently change
    /// every link built afterwards.
    pub fn save<S: AsRef<str>>(&self, trackers: &[S]) -> Result<(), AppError> {
        let normalized = Self::normalize(trackers);
        match self.store.store(&normalized) {
            Ok(()) => {
                tracing::debug!(count = normalized.len(), path = %self.path().display(), "Saved trackers");
                Ok(())
            }
            Err(e) => {
                tracing::error!(path = %self.path().display(), error = %e, "Failed to save trackers");
                Err(e)
            }
        }
    }

    /// Replaces the trackers with one entry per non-blank line of `text`.
    pub fn set_from_text(&self, text: &str) -> Result<(), AppError> {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        self.save(&lines)
    }

    pub fn reset(&self) -> Result<(), AppError> {
        self.save(&Self::defaults())
    }

    /// Trims entries, drops blanks and unsupported schemes, and removes
    /// case-insensitive duplicates keeping the first occurrence.
    pub fn normalize<S: AsRef<str>>(trackers: &[S]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut normalized = Vec::new();

        for tracker in trackers {
            let clean = tracker.as_ref().trim();
            if clean.is_empty() {
                continue;
            }

            let lowered = clean.to_lowercase();
            if !VALID_SCHEMES.iter().any(|scheme| lowered.starts_with(scheme)) {
                tracing::warn!(tracker = %clean, "Rejecting tracker with unsupported scheme");
                continue;
            }

            if seen.insert(lowered) {
                normalized.push(clean.to_string());
            }
        }

        normalized
    }
}
