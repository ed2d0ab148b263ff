//! Filesystem access used by the tracker
//!
//! The tracker never touches the disk directly for path resolution and stat
//! calls; it goes through the [`FileSystem`] trait so the trigger engine (or a
//! test) can supply its own view. [`OsFileSystem`] is the production
//! implementation on top of `std::fs`.

use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Primitives the tracker needs from the filesystem
pub trait FileSystem {
    /// Resolve symlinks and relative segments; fails if the target does not exist
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    /// Whether something exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Modification time of `path` in whole seconds since the Unix epoch
    fn mtime(&self, path: &Path) -> io::Result<i64>;

    /// Create `path` with `mode` unless it already exists
    fn ensure_directory(&self, path: &Path, mode: u32) -> io::Result<()>;
}

/// [`FileSystem`] backed by the real operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn mtime(&self, path: &Path) -> io::Result<i64> {
        let modified = fs::metadata(path)?.modified()?;
        Ok(DateTime::<Utc>::from(modified).timestamp())
    }

    fn ensure_directory(&self, path: &Path, mode: u32) -> io::Result<()> {
        if path.is_dir() {
            return Ok(());
        }
        trace!("Creating state directory {} ({:o})", path.display(), mode);
        match create_dir(path, mode) {
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            other => other,
        }
    }
}

/// Create a single directory with Unix permissions
#[cfg(unix)]
fn create_dir(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().mode(mode).create(path)
}

/// Create a single directory (Windows has no mode bits)
#[cfg(not(unix))]
fn create_dir(path: &Path, _mode: u32) -> io::Result<()> {
    fs::DirBuilder::new().create(path)
}
