//! Error types for the triggerstate library
//!
//! Every fallible tracker operation returns [`Result<T>`]. The variants fall
//! into four groups:
//!
//! - **Resource exhaustion**: [`TrackerError::OutOfMemory`]
//! - **I/O failure**: [`TrackerError::Io`], [`TrackerError::CreateDirectory`],
//!   [`TrackerError::Canonicalize`], [`TrackerError::Stat`]
//! - **Format/corruption**: [`TrackerError::Parse`]
//! - **Caller input**: [`TrackerError::PathConversion`]
//!
//! A missing status file on load is not an error and has no variant.

use std::collections::TryReserveError;
use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the triggerstate library
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Main error type for all tracker operations
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Memory could not be reserved for a new entry or its path
    #[error("Out of memory while recording {path}")]
    OutOfMemory {
        /// Path that was being recorded
        path: String,
        /// Underlying reservation failure
        #[source]
        source: TryReserveError,
    },

    /// I/O error while reading or writing the status file
    #[error("IO error on {path:?}: {source}")]
    Io {
        /// File the operation was acting on
        path: PathBuf,
        /// Underlying system error
        #[source]
        source: std::io::Error,
    },

    /// The state directory could not be created
    #[error("Failed to create state directory {path:?}: {source}")]
    CreateDirectory {
        /// Directory that was being created
        path: PathBuf,
        /// Underlying system error
        #[source]
        source: std::io::Error,
    },

    /// Path could not be resolved to a canonical absolute form
    #[error("Cannot resolve path {path:?}: {source}")]
    Canonicalize {
        /// Path as given by the caller
        path: PathBuf,
        /// Underlying system error
        #[source]
        source: std::io::Error,
    },

    /// Modification time of a path could not be read
    #[error("Cannot stat {path:?}: {source}")]
    Stat {
        /// Canonical path that was being inspected
        path: PathBuf,
        /// Underlying system error
        #[source]
        source: std::io::Error,
    },

    /// Canonical path is not valid UTF-8 and cannot be stored in the status file
    #[error("Path conversion error: {0:?}")]
    PathConversion(std::ffi::OsString),

    /// Malformed line in the status file
    #[error("Failed to parse state {path:?}: {source}")]
    Parse {
        /// Status file being loaded
        path: PathBuf,
        /// What was wrong with the line
        #[source]
        source: ParseError,
    },
}

/// A malformed status-file line
///
/// Line numbers are 1-based and count comment lines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// No `:` between timestamp and path
    #[error("line {line_no}: erroneous line misses colon: '{line}'")]
    MissingSeparator {
        /// Line number within the file
        line_no: usize,
        /// Offending line without its newline
        line: String,
    },

    /// Nothing after the `:`
    #[error("line {line_no}: missing filename in line: '{line}'")]
    MissingPath {
        /// Line number within the file
        line_no: usize,
        /// Offending line without its newline
        line: String,
    },

    /// Text before the `:` is not a decimal integer
    #[error("line {line_no}: invalid timestamp '{timestamp}'")]
    InvalidTimestamp {
        /// Line number within the file
        line_no: usize,
        /// The timestamp portion as found
        timestamp: String,
    },
}

impl ParseError {
    /// Line number the error was found on
    pub fn line_no(&self) -> usize {
        match self {
            ParseError::MissingSeparator { line_no, .. }
            | ParseError::MissingPath { line_no, .. }
            | ParseError::InvalidTimestamp { line_no, .. } => *line_no,
        }
    }
}

impl TrackerError {
    /// Create an I/O error bound to the file it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TrackerError::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if this error indicates a corrupt status file
    pub fn is_corruption(&self) -> bool {
        matches!(self, TrackerError::Parse { .. })
    }

    /// Check if this error came from a path that does not exist on disk
    pub fn is_not_found(&self) -> bool {
        match self {
            TrackerError::Canonicalize { source, .. } | TrackerError::Stat { source, .. } => {
                source.kind() == std::io::ErrorKind::NotFound
            }
            _ => false,
        }
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            TrackerError::Parse { path, source } => {
                format!(
                    "Status file {:?} is corrupt ({}). Remove it to force every trigger to re-run.",
                    path, source
                )
            }
            TrackerError::CreateDirectory { path, .. } => {
                format!(
                    "Cannot create {:?}. Check permissions or run with appropriate privileges.",
                    path
                )
            }
            _ => self.to_string(),
        }
    }
}
