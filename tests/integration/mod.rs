//! Integration tests for full trigger runs
//!
//! Each test drives a tracker through load, check, record and write cycles
//! against files in a temporary directory, with mtimes pinned via `filetime`.

use ::triggerstate::*;
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary root holding tracked files and the status file
pub struct TriggerTestHarness {
    pub temp_dir: TempDir,
    /// Canonical form of the temp dir, so paths match what the tracker stores
    pub root: PathBuf,
    pub status_file: PathBuf,
}

impl TriggerTestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = fs::canonicalize(temp_dir.path()).unwrap();
        let status_file = root.join("state").join("status");
        Self {
            temp_dir,
            root,
            status_file,
        }
    }

    /// Create (or rewrite) a file and pin its mtime
    pub fn file(&self, name: &str, mtime: i64) -> PathBuf {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, name).unwrap();
        self.touch(&path, mtime);
        path
    }

    /// Change the mtime of an existing file
    pub fn touch(&self, path: &Path, mtime: i64) {
        set_file_mtime(path, FileTime::from_unix_time(mtime, 0)).unwrap();
    }

    pub fn tracker(&self) -> StateTracker {
        TrackerBuilder::new().status_file(&self.status_file).build()
    }

    pub fn loaded_tracker(&self) -> StateTracker {
        let mut tracker = self.tracker();
        tracker.load().unwrap();
        tracker
    }

    pub fn write_status(&self, contents: &str) {
        fs::create_dir_all(self.status_file.parent().unwrap()).unwrap();
        fs::write(&self.status_file, contents).unwrap();
    }

    pub fn status_contents(&self) -> String {
        fs::read_to_string(&self.status_file).unwrap()
    }

    /// Entries as a sorted list of (path, mtime)
    pub fn snapshot(tracker: &StateTracker) -> Vec<(String, i64)> {
        let mut entries: Vec<_> = tracker
            .entries()
            .map(|e| (e.path.clone(), e.mtime))
            .collect();
        entries.sort();
        entries
    }
}

fn key(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn test_load_write_load_is_idempotent() {
        let harness = TriggerTestHarness::new();
        let a = harness.file("a.conf", 100);
        let b = harness.file("sub/b.conf", 200);
        harness.write_status(&format!(
            "# This file is automatically generated. DO NOT EDIT\n{}:{}\n{}:{}\n",
            100,
            a.display(),
            250,
            b.display()
        ));

        let first = harness.loaded_tracker();
        first.write().unwrap();
        let second = harness.loaded_tracker();

        assert_eq!(
            TriggerTestHarness::snapshot(&first),
            TriggerTestHarness::snapshot(&second)
        );
        assert_eq!(second.lookup(key(&b)).unwrap().mtime, 250);
    }

    #[test]
    fn test_repeated_push_keeps_single_entry() {
        let harness = TriggerTestHarness::new();
        let conf = harness.file("fonts.conf", 10);
        let mut tracker = harness.tracker();

        for mtime in [10, 20, 5, 40] {
            harness.touch(&conf, mtime);
            tracker.push_path(&conf).unwrap();
        }

        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.lookup(key(&conf)).unwrap().mtime, 40);
    }

    #[cfg(unix)]
    #[test]
    fn test_push_through_symlink_records_target() {
        let harness = TriggerTestHarness::new();
        let target = harness.file("real.conf", 300);
        let link = harness.root.join("link.conf");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let mut tracker = harness.tracker();
        tracker.push_path(&link).unwrap();
        tracker.push_path(&target).unwrap();

        assert_eq!(tracker.len(), 1);
        assert!(tracker.lookup(key(&target)).is_some());
        assert!(tracker.lookup(key(&link)).is_none());
        assert!(!tracker.needs_update(&link, false));
    }

    #[test]
    fn test_push_missing_path_fails() {
        let harness = TriggerTestHarness::new();
        let mut tracker = harness.tracker();

        let err = tracker.push_path(harness.root.join("absent.conf")).unwrap_err();
        assert!(err.is_not_found());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_deleted_path_is_dropped_on_write() {
        let harness = TriggerTestHarness::new();
        let gone = harness.file("foo.conf", 100);
        let kept = harness.file("bar.conf", 100);

        let mut tracker = harness.tracker();
        tracker.push_path(&gone).unwrap();
        tracker.push_path(&kept).unwrap();
        tracker.write().unwrap();
        assert!(harness.status_contents().contains(key(&gone)));

        fs::remove_file(&gone).unwrap();
        let summary = tracker.write().unwrap();

        assert_eq!(summary, WriteSummary { written: 1, dropped: 1 });
        let contents = harness.status_contents();
        assert!(!contents.contains(key(&gone)));
        assert!(contents.contains(&format!("100:{}\n", kept.display())));
        // Still known in memory until the next load
        assert!(tracker.lookup(key(&gone)).is_some());
    }

    #[test]
    fn test_deleted_path_is_dropped_on_load() {
        let harness = TriggerTestHarness::new();
        let kept = harness.file("kept.conf", 1);
        harness.write_status(&format!(
            "5:{}\n6:{}\n",
            harness.root.join("vanished.conf").display(),
            kept.display()
        ));

        let mut tracker = harness.tracker();
        let summary = tracker.load().unwrap();

        assert_eq!(summary.loaded, 1);
        assert_eq!(summary.discarded, 1);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_fresh_push_then_touch() {
        let harness = TriggerTestHarness::new();
        let conf = harness.file("ld.so.conf", 1_000);
        let mut tracker = harness.tracker();

        assert!(tracker.needs_update(&conf, false));
        tracker.push_path(&conf).unwrap();
        assert!(!tracker.needs_update(&conf, false));

        harness.touch(&conf, 1_001);
        assert!(tracker.needs_update(&conf, false));
    }

    #[test]
    fn test_force_overrides_fresh_record() {
        let harness = TriggerTestHarness::new();
        let conf = harness.file("ld.so.conf", 1_000);
        let mut tracker = harness.tracker();

        // Untracked and tracked alike
        assert!(tracker.needs_update(&conf, true));
        tracker.push_path(&conf).unwrap();
        assert!(tracker.needs_update(&conf, true));
        assert_eq!(tracker.staleness(&conf, true), Staleness::Forced);
    }

    #[test]
    fn test_newer_record_is_not_stale() {
        let harness = TriggerTestHarness::new();
        let conf = harness.file("foo.conf", 50);
        harness.write_status(&format!("100:{}\n", conf.display()));

        let tracker = harness.loaded_tracker();
        assert!(!tracker.needs_update(&conf, false));
        assert_eq!(tracker.staleness(&conf, false), Staleness::Fresh);
    }

    #[test]
    fn test_relative_path_resolves() {
        let harness = TriggerTestHarness::new();
        let conf = harness.file("dir/x.conf", 7);
        let dotted = harness.root.join("dir").join("..").join("dir").join("x.conf");

        let mut tracker = harness.tracker();
        tracker.push_path(&dotted).unwrap();

        assert_eq!(tracker.lookup(key(&conf)).unwrap().mtime, 7);
        assert!(!tracker.needs_update(&conf, false));
    }

    #[test]
    fn test_unresolvable_path_is_never_stale() {
        let harness = TriggerTestHarness::new();
        let tracker = harness.loaded_tracker();
        let missing = harness.root.join("never-existed.conf");

        assert!(!tracker.needs_update(&missing, false));
        assert!(!tracker.needs_update(&missing, true));
    }

    #[test]
    #[traced_test]
    fn test_corrupt_line_empties_tracker() {
        let harness = TriggerTestHarness::new();
        let conf = harness.file("a.conf", 1);
        harness.write_status(&format!("1:{}\nthis line has no separator\n", conf.display()));

        let mut tracker = harness.tracker();
        tracker.put("/preexisting", 9).unwrap();
        let err = tracker.load().unwrap_err();

        assert!(err.is_corruption());
        assert!(tracker.is_empty());
        assert!(logs_contain("Failed to load state"));
    }

    #[test]
    fn test_corrupt_timestamp_and_path_rejected() {
        let harness = TriggerTestHarness::new();
        let conf = harness.file("a.conf", 1);

        for contents in [format!("soon:{}\n", conf.display()), "12:\n".to_string()] {
            harness.write_status(&contents);
            let mut tracker = harness.tracker();
            let err = tracker.load().unwrap_err();
            assert!(
                matches!(err, TrackerError::Parse { .. }),
                "unexpected error {:?} for {:?}",
                err,
                contents
            );
            assert!(tracker.is_empty());
        }
    }

    #[test]
    fn test_any_hash_line_is_a_comment() {
        let harness = TriggerTestHarness::new();
        let conf = harness.file("a.conf", 1);
        harness.write_status(&format!(
            "# one\n3:{}\n#no space, no colon\n# two\n",
            conf.display()
        ));

        let mut tracker = harness.tracker();
        let summary = tracker.load().unwrap();
        assert_eq!(summary.comments, 3);
        assert_eq!(summary.loaded, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_path_with_colon_round_trips() {
        let harness = TriggerTestHarness::new();
        let conf = harness.file("odd:name.conf", 42);

        let mut tracker = harness.tracker();
        tracker.push_path(&conf).unwrap();
        tracker.write().unwrap();

        let reloaded = harness.loaded_tracker();
        assert_eq!(reloaded.lookup(key(&conf)).unwrap().mtime, 42);
    }

    #[test]
    fn test_write_orders_newest_first() {
        let harness = TriggerTestHarness::new();
        let first = harness.file("first.conf", 1);
        let second = harness.file("second.conf", 2);

        let mut tracker = harness.tracker();
        tracker.push_path(&first).unwrap();
        tracker.push_path(&second).unwrap();
        tracker.write().unwrap();

        assert_eq!(
            harness.status_contents(),
            format!(
                "# This file is automatically generated. DO NOT EDIT\n2:{}\n1:{}\n",
                second.display(),
                first.display()
            )
        );
    }

    #[test]
    fn test_write_truncates_previous_contents() {
        let harness = TriggerTestHarness::new();
        harness.write_status(&"9:/left/over/from/before\n".repeat(100));

        let tracker = harness.tracker();
        tracker.write().unwrap();

        assert_eq!(
            harness.status_contents(),
            "# This file is automatically generated. DO NOT EDIT\n"
        );
    }

    #[test]
    fn test_atomic_write_matches_plain_write() {
        let harness = TriggerTestHarness::new();
        let a = harness.file("a.conf", 11);
        let b = harness.file("b.conf", 22);

        let mut plain = harness.tracker();
        plain.push_path(&a).unwrap();
        plain.push_path(&b).unwrap();
        plain.write().unwrap();
        let expected = harness.status_contents();

        let mut atomic = TrackerBuilder::new()
            .status_file(&harness.status_file)
            .atomic_write(true)
            .build();
        atomic.load().unwrap();
        atomic.write().unwrap();

        // Same lines; loading prepends, so their order is reversed
        let sorted = |text: &str| {
            let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
            lines.sort();
            lines
        };
        assert_eq!(sorted(&harness.status_contents()), sorted(&expected));
    }

    #[test]
    #[traced_test]
    fn test_load_reports_counts() {
        let harness = TriggerTestHarness::new();
        let a = harness.file("a.conf", 1);
        harness.write_status(&format!("1:{}\n", a.display()));

        harness.loaded_tracker();
        assert!(logs_contain("Loaded 1 entries"));
    }

    #[test]
    fn test_open_missing_status_file() {
        let harness = TriggerTestHarness::new();
        let tracker = StateTracker::open(TrackerConfig {
            status_file: harness.status_file.clone(),
            ..Default::default()
        })
        .unwrap();
        assert!(tracker.is_empty());
        assert!(!harness.status_file.exists());
    }
}
