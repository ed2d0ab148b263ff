//! The state tracker
//!
//! [`StateTracker`] remembers, for every path a trigger cares about, the
//! modification time seen the last time its hook ran successfully. A trigger
//! run looks like this:
//!
//! ```rust,no_run
//! use triggerstate::{StateTracker, TrackerBuilder};
//!
//! # fn main() -> triggerstate::Result<()> {
//! let mut tracker = TrackerBuilder::new()
//!     .status_file("/var/lib/triggerstate/status")
//!     .build();
//! tracker.load()?;
//!
//! for path in ["/etc/ld.so.conf", "/usr/share/fonts"] {
//!     if tracker.needs_update(path, false) {
//!         // ... run the hook for `path` ...
//!         tracker.push_path(path)?;
//!     }
//! }
//!
//! tracker.write()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Stale entries
//!
//! Entries whose path has disappeared from disk are dropped lazily: the loader
//! skips them, and the writer leaves them out of the file while keeping them
//! in memory.
//!
//! ## Caveats
//!
//! - A path that cannot be canonicalized is reported as *not* needing an
//!   update, so a hook keyed on a missing path never runs.
//! - The tracker assumes it is the only writer of its status file. Unless
//!   [`TrackerConfig::atomic_write`] is set, a crash during [`StateTracker::write`]
//!   can leave a truncated file behind, which the next load may reject.

use crate::error::{Result, TrackerError};
use crate::fs::{FileSystem, OsFileSystem};
use crate::status_file::{self, Line};
use crate::store::EntryStore;
use crate::types::{LoadSummary, StateEntry, Staleness, TrackerConfig, WriteSummary};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, trace, warn};

/// Mode given to a status file produced by an atomic write
#[cfg(unix)]
const STATUS_FILE_MODE: u32 = 0o644;

/// Persistent record of tracked paths and their last-seen modification times
#[derive(Debug)]
pub struct StateTracker<F: FileSystem = OsFileSystem> {
    config: TrackerConfig,
    store: EntryStore,
    fs: F,
}

impl StateTracker<OsFileSystem> {
    /// Create an empty tracker using the default status file
    pub fn new() -> Self {
        Self::with_config(TrackerConfig::default())
    }

    /// Create an empty tracker with the given configuration
    pub fn with_config(config: TrackerConfig) -> Self {
        Self::with_filesystem(config, OsFileSystem)
    }

    /// Create a tracker and load its status file
    pub fn open(config: TrackerConfig) -> Result<Self> {
        let mut tracker = Self::with_config(config);
        tracker.load()?;
        Ok(tracker)
    }
}

impl Default for StateTracker<OsFileSystem> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FileSystem> StateTracker<F> {
    /// Create an empty tracker on top of a custom [`FileSystem`]
    pub fn with_filesystem(config: TrackerConfig, fs: F) -> Self {
        Self {
            config,
            store: EntryStore::new(),
            fs,
        }
    }

    /// Location of the status file
    pub fn status_file(&self) -> &Path {
        &self.config.status_file
    }

    /// Active configuration
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Find the entry for an already canonical path
    pub fn lookup(&self, path: &str) -> Option<&StateEntry> {
        self.store.lookup(path)
    }

    /// Record `mtime` for `path` without touching the disk
    ///
    /// `path` is taken as is; callers wanting validation should use
    /// [`StateTracker::push_path`].
    pub fn put(&mut self, path: &str, mtime: i64) -> Result<()> {
        self.store.put(path, mtime)
    }

    /// Register interest in `path` with its current modification time
    ///
    /// The path is canonicalized and must exist. The recorded mtime is the one
    /// observed now, replacing any earlier record for the same canonical path.
    ///
    /// # Errors
    ///
    /// - [`TrackerError::Canonicalize`] if the path cannot be resolved
    /// - [`TrackerError::PathConversion`] if the resolved path is not UTF-8
    /// - [`TrackerError::Stat`] if its modification time cannot be read
    /// - [`TrackerError::OutOfMemory`] if the entry cannot be allocated
    pub fn push_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let real = self
            .fs
            .canonicalize(path)
            .map_err(|source| TrackerError::Canonicalize {
                path: path.to_path_buf(),
                source,
            })?;

        let mtime = self
            .fs
            .mtime(&real)
            .map_err(|source| TrackerError::Stat {
                path: real.clone(),
                source,
            })?;

        let real = real
            .into_os_string()
            .into_string()
            .map_err(TrackerError::PathConversion)?;

        trace!("Recording {} at {}", real, mtime);
        self.store.put(&real, mtime)
    }

    /// Iterate over tracked entries, newest first
    pub fn entries(&self) -> impl Iterator<Item = &StateEntry> {
        self.store.iter()
    }

    /// Number of tracked entries
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Decide whether `path` should be treated as changed, and why
    ///
    /// Checks run in order: resolution, known entry, stat, `force`, then the
    /// mtime comparison. A stored mtime equal to or newer than the one on disk
    /// is [`Staleness::Fresh`].
    pub fn staleness(&self, path: impl AsRef<Path>, force: bool) -> Staleness {
        let path = path.as_ref();
        let real = match self.fs.canonicalize(path) {
            Ok(real) => real,
            Err(e) => {
                debug!("Cannot resolve {}, treating as up to date: {}", path.display(), e);
                return Staleness::Unresolvable;
            }
        };

        let entry = match real.to_str().and_then(|real| self.store.lookup(real)) {
            Some(entry) => entry,
            None => {
                debug!("{} is not tracked", real.display());
                return Staleness::Untracked;
            }
        };

        let current = match self.fs.mtime(&real) {
            Ok(mtime) => mtime,
            Err(e) => {
                debug!("Cannot stat {}: {}", real.display(), e);
                return Staleness::StatFailed;
            }
        };

        if force {
            return Staleness::Forced;
        }

        if entry.mtime < current {
            debug!("{} modified ({} -> {})", real.display(), entry.mtime, current);
            Staleness::Modified {
                recorded: entry.mtime,
                current,
            }
        } else {
            Staleness::Fresh
        }
    }

    /// Whether the hook guarded by `path` must run
    ///
    /// Shorthand for `self.staleness(path, force).needs_update()`.
    pub fn needs_update(&self, path: impl AsRef<Path>, force: bool) -> bool {
        self.staleness(path, force).needs_update()
    }

    /// Populate the tracker from its status file
    ///
    /// A missing status file is the first-run case and succeeds with nothing
    /// loaded. Lines whose path no longer exists are skipped.
    ///
    /// # Errors
    ///
    /// - [`TrackerError::Io`] if the file cannot be opened or read
    /// - [`TrackerError::Parse`] on a malformed line
    /// - [`TrackerError::OutOfMemory`] if an entry cannot be allocated
    ///
    /// On any error the tracker is left empty.
    pub fn load(&mut self) -> Result<LoadSummary> {
        let status_file = self.config.status_file.clone();
        let file = match File::open(&status_file) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No status file at {}, starting empty", status_file.display());
                return Ok(LoadSummary::default());
            }
            Err(e) => return Err(TrackerError::io(status_file, e)),
        };

        match self.load_from(BufReader::new(file), &status_file) {
            Ok(summary) => {
                info!(
                    "Loaded {} entries from {} ({} stale)",
                    summary.loaded,
                    status_file.display(),
                    summary.discarded
                );
                Ok(summary)
            }
            Err(e) => {
                warn!("Failed to load state {}: {}", status_file.display(), e);
                self.store.clear();
                Err(e)
            }
        }
    }

    fn load_from<R: BufRead>(&mut self, mut reader: R, file_path: &Path) -> Result<LoadSummary> {
        let mut summary = LoadSummary {
            file_present: true,
            ..Default::default()
        };
        let mut buf = String::new();
        let mut line_no = 0;

        loop {
            buf.clear();
            let read = reader
                .read_line(&mut buf)
                .map_err(|e| TrackerError::io(file_path, e))?;
            if read == 0 {
                break;
            }
            line_no += 1;

            let line = buf.strip_suffix('\n').unwrap_or(buf.as_str());
            let parsed = status_file::parse_line(line, line_no).map_err(|source| {
                TrackerError::Parse {
                    path: file_path.to_path_buf(),
                    source,
                }
            })?;

            match parsed {
                Line::Comment => summary.comments += 1,
                Line::Entry { mtime, path } => {
                    if !self.fs.exists(Path::new(path)) {
                        trace!("Dropping stale entry {}", path);
                        summary.discarded += 1;
                        continue;
                    }
                    self.store.put(path, mtime)?;
                    summary.loaded += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Persist every entry whose path still exists
    ///
    /// Creates the state directory if needed and fully rewrites the status
    /// file. Entries for vanished paths are left out of the file but remain in
    /// memory.
    ///
    /// # Errors
    ///
    /// - [`TrackerError::CreateDirectory`] if the state directory cannot be created
    /// - [`TrackerError::Io`] if the file cannot be opened or any line fails to write
    pub fn write(&self) -> Result<WriteSummary> {
        let state_dir = self.config.state_dir();
        self.fs
            .ensure_directory(&state_dir, self.config.dir_mode)
            .map_err(|source| TrackerError::CreateDirectory {
                path: state_dir.clone(),
                source,
            })?;

        let status_file = &self.config.status_file;
        let summary = if self.config.atomic_write {
            self.write_atomic(&state_dir, status_file)?
        } else {
            let file = File::create(status_file).map_err(|e| TrackerError::io(status_file, e))?;
            let mut out = BufWriter::new(file);
            self.write_entries(&mut out)
                .and_then(|summary| out.flush().map(|_| summary))
                .map_err(|e| TrackerError::io(status_file, e))?
        };

        info!(
            "Wrote {} entries to {} ({} dropped)",
            summary.written,
            status_file.display(),
            summary.dropped
        );
        Ok(summary)
    }

    fn write_atomic(&self, state_dir: &Path, status_file: &Path) -> Result<WriteSummary> {
        let mut temp = NamedTempFile::new_in(state_dir).map_err(|e| TrackerError::io(state_dir, e))?;
        let temp_path = temp.path().to_path_buf();

        let summary = {
            let mut out = BufWriter::new(temp.as_file_mut());
            self.write_entries(&mut out)
                .and_then(|summary| out.flush().map(|_| summary))
                .map_err(|e| TrackerError::io(&temp_path, e))?
        };
        set_status_file_mode(temp.as_file()).map_err(|e| TrackerError::io(&temp_path, e))?;

        temp.persist(status_file)
            .map_err(|e| TrackerError::io(status_file, e.error))?;
        Ok(summary)
    }

    fn write_entries<W: Write>(&self, out: &mut W) -> io::Result<WriteSummary> {
        let mut summary = WriteSummary::default();
        status_file::write_header(out)?;

        for entry in self.store.iter() {
            if !self.fs.exists(entry.as_path()) {
                warn!("Dropping vanished path {}", entry.path);
                summary.dropped += 1;
                continue;
            }
            status_file::write_entry(out, entry.mtime, &entry.path)?;
            summary.written += 1;
        }

        Ok(summary)
    }
}

#[cfg(unix)]
fn set_status_file_mode(file: &File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(STATUS_FILE_MODE))
}

#[cfg(not(unix))]
fn set_status_file_mode(_file: &File) -> io::Result<()> {
    Ok(())
}

/// Builder for [`StateTracker`]
///
/// # Examples
///
/// ```rust
/// use triggerstate::TrackerBuilder;
///
/// let tracker = TrackerBuilder::new()
///     .status_file("/tmp/triggerstate-doc/status")
///     .dir_mode(0o700)
///     .atomic_write(true)
///     .build();
/// assert!(tracker.is_empty());
/// assert!(tracker.config().atomic_write);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TrackerBuilder {
    config: TrackerConfig,
}

impl TrackerBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn from_config(config: TrackerConfig) -> Self {
        Self { config }
    }

    /// Set the status file location
    pub fn status_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.status_file = path.into();
        self
    }

    /// Set the mode used when creating the state directory
    pub fn dir_mode(mut self, mode: u32) -> Self {
        self.config.dir_mode = mode;
        self
    }

    /// Replace the status file through a temporary file and rename
    pub fn atomic_write(mut self, enabled: bool) -> Self {
        self.config.atomic_write = enabled;
        self
    }

    /// Build a tracker on the real filesystem
    pub fn build(self) -> StateTracker<OsFileSystem> {
        StateTracker::with_config(self.config)
    }

    /// Build a tracker on a custom [`FileSystem`]
    pub fn build_with<F: FileSystem>(self, fs: F) -> StateTracker<F> {
        StateTracker::with_filesystem(self.config, fs)
    }
}
