//! Artifact harvesting
//!
//! The workload writes its output under fixed names in the working
//! directory. Each name is a single slot: whatever sits there must be
//! claimed into the archive before the next invocation, or it is lost.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{HarnessError, Result};

/// How the workload treats an existing file of the same name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Retention {
    /// Rewritten from scratch by every run
    Truncate,
    /// One line appended per run
    Append,
}

/// What an artifact measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactRole {
    Throughput,
    TxnLatency,
    SysLatency,
    ClientLatency,
}

/// A raw artifact expected from one invocation and where it is archived
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSpec {
    pub role: ArtifactRole,
    /// Fixed name the workload writes in the working directory
    pub raw_name: String,
    /// Archive name before any repetition suffix
    pub archive_name: String,
    pub retention: Retention,
}

impl ArtifactSpec {
    pub fn new(
        role: ArtifactRole,
        raw_name: impl Into<String>,
        archive_name: impl Into<String>,
        retention: Retention,
    ) -> Self {
        Self {
            role,
            raw_name: raw_name.into(),
            archive_name: archive_name.into(),
            retention,
        }
    }

    /// Archive name, scoped to a repetition when given one
    pub fn archive_name_for(&self, repetition: Option<usize>) -> String {
        match repetition {
            Some(rep) => repetition_name(&self.archive_name, rep),
            None => self.archive_name.clone(),
        }
    }
}

/// Insert `_rep<k>` before the extension: `a_sys_latency.txt` becomes
/// `a_sys_latency_rep3.txt`
pub fn repetition_name(name: &str, repetition: usize) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_rep{}.{}", stem, repetition, ext),
        _ => format!("{}_rep{}", name, repetition),
    }
}

/// Occupancy of a fixed-name slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Empty,
    Occupied { len: u64 },
}

/// Claims fixed-name workload output into the archive directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    working_dir: PathBuf,
    archive_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(working_dir: impl Into<PathBuf>, archive_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            archive_dir: archive_dir.into(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// Create the archive directory if absent
    pub fn ensure_archive_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.archive_dir).map_err(|source| HarnessError::DirectoryCreation {
            path: self.archive_dir.clone(),
            source,
        })
    }

    /// Path of a fixed-name slot in the working directory
    pub fn slot_path(&self, expected: &str) -> PathBuf {
        self.working_dir.join(expected)
    }

    /// Path of an archived file
    pub fn archive_path(&self, name: &str) -> PathBuf {
        self.archive_dir.join(name)
    }

    /// Inspect a slot without touching it
    pub fn slot(&self, expected: &str) -> Result<SlotState> {
        let path = self.slot_path(expected);
        match fs::metadata(&path) {
            Ok(meta) => Ok(SlotState::Occupied { len: meta.len() }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(SlotState::Empty),
            Err(e) => Err(HarnessError::fs(&path, "cannot inspect slot", e)),
        }
    }

    /// Move the file in slot `expected` to `destination`
    ///
    /// Never replaces an existing destination. Returns the destination.
    pub fn claim(&self, expected: &str, destination: &Path) -> Result<PathBuf> {
        let source = self.slot_path(expected);

        match fs::symlink_metadata(&source) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(HarnessError::FileSystem {
                    path: source,
                    message: "slot is not a regular file".into(),
                    source: None,
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(HarnessError::MissingArtifact { path: source })
            }
            Err(e) => return Err(HarnessError::fs(&source, "cannot inspect artifact", e)),
        }

        if destination
            .try_exists()
            .map_err(|e| HarnessError::fs(destination, "cannot inspect destination", e))?
        {
            return Err(destination_exists(destination));
        }

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| HarnessError::fs(parent, "cannot create archive directory", e))?;
        }

        match fs::hard_link(&source, destination) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(destination_exists(destination))
            }
            Err(e) => {
                debug!(
                    source = %source.display(),
                    error = %e,
                    "Hard link unavailable, copying artifact"
                );
                copy_into_place(&source, destination)?;
            }
        }

        fs::remove_file(&source)
            .map_err(|e| HarnessError::fs(&source, "claimed artifact could not be released", e))?;

        debug!(
            artifact = expected,
            destination = %destination.display(),
            "Claimed artifact"
        );
        Ok(destination.to_path_buf())
    }

    /// Move an untrusted leftover out of its slot into
    /// `<archive>/quarantine/`, returning where it went
    ///
    /// Repeated leftovers of one point get `.1`, `.2`, ... appended.
    pub fn quarantine(&self, expected: &str, label: &str) -> Result<Option<PathBuf>> {
        if self.slot(expected)? == SlotState::Empty {
            return Ok(None);
        }

        let dir = self.archive_dir.join("quarantine");
        let base = format!("{}_{}", label, expected);
        let mut destination = dir.join(&base);
        let mut attempt = 1;
        while destination
            .try_exists()
            .map_err(|e| HarnessError::fs(&destination, "cannot inspect destination", e))?
        {
            destination = dir.join(format!("{}.{}", base, attempt));
            attempt += 1;
        }

        let claimed = self.claim(expected, &destination)?;
        warn!(
            artifact = expected,
            destination = %claimed.display(),
            "Quarantined untrusted artifact"
        );
        Ok(Some(claimed))
    }
}

fn destination_exists(destination: &Path) -> HarnessError {
    HarnessError::FileSystem {
        path: destination.to_path_buf(),
        message: "destination already exists, refusing to overwrite".into(),
        source: None,
    }
}

/// Cross-device fallback: copy beside the destination, then rename
fn copy_into_place(source: &Path, destination: &Path) -> Result<()> {
    let mut partial = destination.as_os_str().to_owned();
    partial.push(".partial");
    let partial = PathBuf::from(partial);

    fs::copy(source, &partial)
        .map_err(|e| HarnessError::fs(&partial, "cannot copy artifact", e))?;

    if destination.exists() {
        let _ = fs::remove_file(&partial);
        return Err(destination_exists(destination));
    }

    fs::rename(&partial, destination).map_err(|e| {
        let _ = fs::remove_file(&partial);
        HarnessError::fs(destination, "cannot move artifact into place", e)
    })
}
