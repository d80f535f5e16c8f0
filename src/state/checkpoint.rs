//! Resume checkpoint persistence
//!
//! A single JSON document `{"current_job_id": ..., "next_page": ...}` that is
//! always read and written whole. Losing a write only costs re-visiting one
//! listing page, so write failures are logged rather than propagated.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The persisted resume pointer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(rename = "current_job_id")]
    pub job_id: String,
    pub next_page: u32,
}

/// File-backed checkpoint store
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the checkpoint as `(job_id, next_page)`.
    ///
    /// Returns `(None, 1)` when the file is missing, unreadable or corrupt.
    pub fn load(&self) -> (Option<String>, u32) {
        match self.read() {
            Some(checkpoint) => {
                tracing::info!(
                    "Loaded checkpoint: job '{}', resuming at page {}",
                    checkpoint.job_id,
                    checkpoint.next_page
                );
                (Some(checkpoint.job_id), checkpoint.next_page)
            }
            None => (None, 1),
        }
    }

    fn read(&self) -> Option<Checkpoint> {
        if !self.path.is_file() {
            tracing::info!("No checkpoint at {}, starting from the beginning", self.path.display());
            return None;
        }

        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(
                    "Failed to read checkpoint {}: {}. Starting from the beginning",
                    self.path.display(),
                    e
                );
                return None;
            }
        };

        match serde_json::from_str::<Checkpoint>(&content) {
            Ok(checkpoint) if checkpoint.next_page >= 1 && !checkpoint.job_id.is_empty() => {
                Some(checkpoint)
            }
            Ok(checkpoint) => {
                tracing::warn!(
                    "Ignoring invalid checkpoint {:?}. Starting from the beginning",
                    checkpoint
                );
                None
            }
            Err(e) => {
                tracing::warn!(
                    "Corrupt checkpoint {}: {}. Starting from the beginning",
                    self.path.display(),
                    e
                );
                None
            }
        }
    }

    /// Overwrites the checkpoint atomically (temp file + rename)
    pub fn save(&self, job_id: &str, next_page: u32) {
        let checkpoint = Checkpoint {
            job_id: job_id.to_string(),
            next_page,
        };

        match self.write(&checkpoint) {
            Ok(()) => tracing::debug!("Checkpoint saved: job '{}', next page {}", job_id, next_page),
            Err(e) => tracing::error!(
                "Failed to save checkpoint ({} page {}) to {}: {}",
                job_id,
                next_page,
                self.path.display(),
                e
            ),
        }
    }

    fn write(&self, checkpoint: &Checkpoint) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(checkpoint)?;
        let tmp = self.temp_path();
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Removes the checkpoint after a run that finished every job
    pub fn clear(&self) {
        if !self.path.is_file() {
            return;
        }

        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::info!("All jobs finished. Checkpoint {} removed", self.path.display()),
            Err(e) => tracing::error!("Failed to remove checkpoint {}: {}", self.path.display(), e),
        }
    }
}
