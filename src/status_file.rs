//! Status file line format
//!
//! ```text
//! # This file is automatically generated. DO NOT EDIT
//! 1700000000:/etc/ld.so.conf
//! 1699999000:/usr/share/fonts
//! ```
//!
//! Any line starting with `#` is a comment. Entry lines are split at the
//! first `:`, so paths may contain colons but never newlines; neither is
//! escaped.

use crate::error::ParseError;
use std::io::{self, Write};

/// First line of every written status file
pub const HEADER: &str = "# This file is automatically generated. DO NOT EDIT";

/// Marks a comment line
pub const COMMENT_MARKER: char = '#';

/// Separates the timestamp from the path
pub const SEPARATOR: char = ':';

/// One parsed line of a status file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// Comment, ignored by the loader
    Comment,
    /// A recorded path
    Entry {
        /// Recorded modification time
        mtime: i64,
        /// Path as written
        path: &'a str,
    },
}

/// Parse a single line with any trailing newline already removed
pub fn parse_line(line: &str, line_no: usize) -> Result<Line<'_>, ParseError> {
    if line.starts_with(COMMENT_MARKER) {
        return Ok(Line::Comment);
    }

    let (timestamp, path) =
        line.split_once(SEPARATOR)
            .ok_or_else(|| ParseError::MissingSeparator {
                line_no,
                line: line.to_string(),
            })?;

    if path.is_empty() {
        return Err(ParseError::MissingPath {
            line_no,
            line: line.to_string(),
        });
    }

    let mtime = timestamp
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidTimestamp {
            line_no,
            timestamp: timestamp.to_string(),
        })?;

    Ok(Line::Entry { mtime, path })
}

/// Write the generated-file header
pub fn write_header<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", HEADER)
}

/// Write one entry line
pub fn write_entry<W: Write>(out: &mut W, mtime: i64, path: &str) -> io::Result<()> {
    writeln!(out, "{}{}{}", mtime, SEPARATOR, path)
}
