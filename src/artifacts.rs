//! Best-effort persistence for reflection snapshots and burn reports.
//!
//! Nothing in here returns an error. A failed write leaves a sibling
//! `<path>.err.txt` holding a timestamped diagnostic line so that one bad
//! artifact never aborts a burn. When the sibling cannot be written either
//! (the save directory is missing or is not a directory), the sidecar goes
//! to the save directory's parent, then to the system temp directory.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Current UTC time at second precision, e.g. `2026-10-16T09:30:00Z`.
pub fn now_utc_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Generate a run identifier of the form `prefix_timestamp_shorthash`.
pub fn stable_run_id(prefix: &str) -> String {
    run_id_at(prefix, &now_utc_iso())
}

/// Build a run identifier for an explicit timestamp.
///
/// The short hash is the first 6 hex characters of SHA-256 over
/// `prefix|timestamp`. Colons are replaced so the id is filename-safe.
pub fn run_id_at(prefix: &str, timestamp: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}|{}", prefix, timestamp).as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("{}_{}_{}", prefix, timestamp.replace(':', "-"), &digest[..6])
}

/// Path of the diagnostic file written when `path` could not be written.
pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".err.txt");
    PathBuf::from(os)
}

/// What happened to a single artifact write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// The artifact failed and a diagnostic sidecar was written instead.
    Degraded { sidecar: PathBuf, error: String },
    /// Neither the artifact nor its sidecar could be written.
    Lost { error: String },
}

impl WriteOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, WriteOutcome::Written)
    }
}

/// Writes artifacts under a single save directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    save_path: PathBuf,
}

impl ArtifactWriter {
    pub fn new(save_path: impl Into<PathBuf>) -> Self {
        Self {
            save_path: save_path.into(),
        }
    }

    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    /// Join `file_name` onto the save directory.
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.save_path.join(file_name)
    }

    /// Create the save directory if needed. Failure is logged, not returned;
    /// the individual writes will degrade on their own.
    pub fn ensure_dir(&self) {
        if let Err(e) = fs::create_dir_all(&self.save_path) {
            tracing::warn!(
                save_path = %self.save_path.display(),
                "Failed to create artifact directory: {}",
                e
            );
        }
    }

    /// Serialize `value` as pretty JSON to `path`.
    pub fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> WriteOutcome {
        let result = serde_json::to_string_pretty(value)
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(path, json).map_err(|e| e.to_string()));
        self.settle(path, result, "JSON")
    }

    /// Write `text` verbatim to `path`.
    pub fn write_text(&self, path: &Path, text: &str) -> WriteOutcome {
        let result = fs::write(path, text).map_err(|e| e.to_string());
        self.settle(path, result, "text")
    }

    fn settle(&self, path: &Path, result: Result<(), String>, kind: &str) -> WriteOutcome {
        let error = match result {
            Ok(()) => return WriteOutcome::Written,
            Err(e) => e,
        };

        let line = format!(
            "[{}] Failed to write {} to {}: {}\n",
            now_utc_iso(),
            kind,
            path.display(),
            error
        );
        let mut last_err = String::new();
        for sidecar in self.sidecar_candidates(path) {
            match fs::write(&sidecar, &line) {
                Ok(()) => {
                    tracing::warn!(
                        path = %path.display(),
                        sidecar = %sidecar.display(),
                        "Artifact write failed, wrote diagnostic sidecar: {}",
                        error
                    );
                    return WriteOutcome::Degraded { sidecar, error };
                }
                Err(e) => last_err = e.to_string(),
            }
        }

        tracing::error!(
            path = %path.display(),
            "Artifact write failed and no sidecar could be written: {}; {}",
            error,
            last_err
        );
        WriteOutcome::Lost { error }
    }

    /// Places to try for the sidecar of `path`, in order: next to it, in the
    /// parent of the save directory, in the system temp directory.
    fn sidecar_candidates(&self, path: &Path) -> Vec<PathBuf> {
        let primary = sidecar_path(path);
        let Some(name) = primary.file_name().map(|n| n.to_os_string()) else {
            return vec![primary];
        };
        let mut candidates = vec![primary];
        if let Some(parent) = self.save_path.parent()
            && !parent.as_os_str().is_empty()
        {
            candidates.push(parent.join(&name));
        }
        candidates.push(std::env::temp_dir().join(&name));
        candidates
    }
}
