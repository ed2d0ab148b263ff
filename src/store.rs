//! In-memory entry store
//!
//! Entries live in an append-only arena with a path index beside it. Logical
//! iteration order is newest first, so walking the arena backwards gives the
//! same order as prepending to a list. Updating an existing path keeps its
//! slot, and therefore its position.

use crate::error::{Result, TrackerError};
use crate::types::StateEntry;
use std::collections::HashMap;

/// Collection of [`StateEntry`] records keyed by exact path
#[derive(Debug, Default, Clone)]
pub struct EntryStore {
    entries: Vec<StateEntry>,
    index: HashMap<String, usize>,
}

impl EntryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the entry recorded for `path`
    pub fn lookup(&self, path: &str) -> Option<&StateEntry> {
        self.index.get(path).map(|&slot| &self.entries[slot])
    }

    /// Insert a new entry or overwrite the mtime of an existing one
    ///
    /// All memory needed for a new entry is reserved before anything is
    /// inserted, so on [`TrackerError::OutOfMemory`] the store is unchanged.
    pub fn put(&mut self, path: &str, mtime: i64) -> Result<()> {
        if let Some(&slot) = self.index.get(path) {
            self.entries[slot].mtime = mtime;
            return Ok(());
        }

        let oom = |source| TrackerError::OutOfMemory {
            path: path.to_string(),
            source,
        };

        let mut owned = String::new();
        owned.try_reserve_exact(path.len()).map_err(oom)?;
        owned.push_str(path);
        self.entries.try_reserve(1).map_err(oom)?;
        self.index.try_reserve(1).map_err(oom)?;

        let slot = self.entries.len();
        self.index.insert(owned.clone(), slot);
        self.entries.push(StateEntry { path: owned, mtime });
        Ok(())
    }

    /// Iterate newest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &StateEntry> + ExactSizeIterator {
        self.entries.iter().rev()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}
