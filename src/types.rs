//! Core data types used throughout the triggerstate library
//!
//! ## Overview
//!
//! - **Tracked state**: [`StateEntry`], one recorded `(path, mtime)` pair
//! - **Decisions**: [`Staleness`], why a path does or does not need its hook re-run
//! - **Operation results**: [`LoadSummary`], [`WriteSummary`]
//! - **Configuration**: [`TrackerConfig`]
//!
//! ## Examples
//!
//! ```rust
//! use triggerstate::types::TrackerConfig;
//! use std::path::PathBuf;
//!
//! let config = TrackerConfig {
//!     status_file: PathBuf::from("/tmp/triggers/status"),
//!     ..Default::default()
//! };
//! assert_eq!(config.state_dir(), PathBuf::from("/tmp/triggers"));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default location of the status file
pub const DEFAULT_STATUS_FILE: &str = "/var/lib/triggerstate/status";

/// Permission bits used when the state directory has to be created
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// A tracked path and the modification time last recorded for it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateEntry {
    /// Absolute, canonical path
    pub path: String,
    /// Modification time in seconds since the Unix epoch
    pub mtime: i64,
}

impl StateEntry {
    /// Create a new entry
    pub fn new(path: impl Into<String>, mtime: i64) -> Self {
        Self {
            path: path.into(),
            mtime,
        }
    }

    /// The tracked path as a [`Path`]
    pub fn as_path(&self) -> &Path {
        Path::new(&self.path)
    }
}

/// Outcome of a staleness check, in evaluation order
///
/// Only [`Staleness::Unresolvable`] and [`Staleness::Fresh`] report that no
/// update is needed. Note that a path which cannot be resolved is treated as
/// up to date, so a hook guarded by it will be skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Staleness {
    /// Path could not be canonicalized
    Unresolvable,
    /// No record exists for the path
    Untracked,
    /// Current modification time could not be read
    StatFailed,
    /// Caller asked for an unconditional update
    Forced,
    /// Recorded mtime is older than the one on disk
    Modified {
        /// Value held by the tracker
        recorded: i64,
        /// Value currently on disk
        current: i64,
    },
    /// Recorded mtime is equal to or newer than the one on disk
    Fresh,
}

impl Staleness {
    /// Whether the caller should treat the path as changed
    pub fn needs_update(&self) -> bool {
        !matches!(self, Staleness::Unresolvable | Staleness::Fresh)
    }
}

impl fmt::Display for Staleness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Staleness::Unresolvable => write!(f, "unresolvable"),
            Staleness::Untracked => write!(f, "untracked"),
            Staleness::StatFailed => write!(f, "stat failed"),
            Staleness::Forced => write!(f, "forced"),
            Staleness::Modified { recorded, current } => {
                write!(f, "modified ({} -> {})", recorded, current)
            }
            Staleness::Fresh => write!(f, "up to date"),
        }
    }
}

/// Statistics from loading a status file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    /// Entries inserted into the store
    pub loaded: usize,
    /// Valid lines dropped because their path no longer exists
    pub discarded: usize,
    /// Comment lines skipped
    pub comments: usize,
    /// False when the status file did not exist
    pub file_present: bool,
}

/// Statistics from writing a status file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteSummary {
    /// Entry lines written
    pub written: usize,
    /// Entries left out because their path no longer exists
    pub dropped: usize,
}

/// Configuration for a [`StateTracker`](crate::StateTracker)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Location of the status file
    pub status_file: PathBuf,
    /// Mode for the state directory when it has to be created
    pub dir_mode: u32,
    /// Write to a temporary file and rename it over the status file
    pub atomic_write: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            status_file: PathBuf::from(DEFAULT_STATUS_FILE),
            dir_mode: DEFAULT_DIR_MODE,
            atomic_write: false,
        }
    }
}

impl TrackerConfig {
    /// Directory holding the status file
    pub fn state_dir(&self) -> PathBuf {
        match self.status_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}
