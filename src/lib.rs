//! # triggerstate - change detection for post-install triggers
//!
//! A small persistent cache that records the modification time of every path
//! a trigger hook depends on, so a trigger runner can skip hooks whose inputs
//! have not changed since the last successful run.
//!
//! ## Overview
//!
//! - Track absolute, canonical paths together with their last-seen mtime
//! - Persist them to a plain text status file and load them back
//! - Ask whether a path is stale before running the hook that consumes it
//! - Forget paths that have disappeared from disk, lazily, on load and write
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use triggerstate::TrackerBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut tracker = TrackerBuilder::new()
//!     .status_file("/var/lib/triggerstate/status")
//!     .build();
//! tracker.load()?;
//!
//! if tracker.needs_update("/etc/ld.so.conf", false) {
//!     // run ldconfig ...
//!     tracker.push_path("/etc/ld.so.conf")?;
//! }
//!
//! let summary = tracker.write()?;
//! println!("Tracking {} paths", summary.written);
//! # Ok(())
//! # }
//! ```
//!
//! ## Status File
//!
//! ```text
//! # This file is automatically generated. DO NOT EDIT
//! 1700000000:/etc/ld.so.conf
//! ```
//!
//! One `<mtime>:<path>` line per entry, newest entry first. Lines starting
//! with `#` are comments. Neither `:` nor newlines in paths are escaped.
//!
//! ## Error Handling
//!
//! All fallible operations return `Result<T, TrackerError>`. A missing status
//! file is not an error. A malformed one fails the load and leaves the tracker
//! empty, so every hook re-runs.
//!
//! ## Module Organization
//!
//! - [`tracker`]: The state tracker and its builder
//! - [`types`]: Entries, staleness reasons, summaries, configuration
//! - [`fs`]: Filesystem primitives the tracker relies on
//! - [`status_file`]: Line format of the status file
//! - [`error`]: Error types and handling

// Public API modules
pub mod error;
pub mod fs;
pub mod status_file;
pub mod tracker;
pub mod types;

// Internal modules (not part of public API)
mod store;

// Re-export main types for convenience
pub use error::{ParseError, Result, TrackerError};
pub use fs::{FileSystem, OsFileSystem};
pub use tracker::{StateTracker, TrackerBuilder};
pub use types::*;
