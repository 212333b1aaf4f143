//! Bookkeeping of discovered clips between batches

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::StitchOrder;

/// A clip waiting to be batched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFile {
    pub path: PathBuf,
    pub duration_ms: u64,
}

/// Snapshot of the tracked clips, in stitch order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    entries: Vec<TrackedFile>,
}

impl Batch {
    #[must_use]
    pub fn paths(&self) -> Vec<&Path> {
        self.entries.iter().map(|e| e.path.as_path()).collect()
    }

    #[must_use]
    pub fn total_ms(&self) -> u64 {
        self.entries.iter().map(|e| e.duration_ms).sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Tracked and processed clip sets plus the running duration total
///
/// `total_ms` always equals the sum of tracked durations, and no path is
/// ever both tracked and processed.
#[derive(Debug, Default)]
pub struct Tracker {
    tracked: Vec<TrackedFile>,
    processed: HashSet<PathBuf>,
    total_ms: u64,
}

impl Tracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a clip
    ///
    /// Returns false, leaving state untouched, if the path is already
    /// tracked or processed.
    pub fn track(&mut self, path: PathBuf, duration_ms: u64) -> bool {
        if self.is_known(&path) {
            return false;
        }
        self.total_ms += duration_ms;
        self.tracked.push(TrackedFile { path, duration_ms });
        true
    }

    /// Whether the path is tracked or already processed
    #[must_use]
    pub fn is_known(&self, path: &Path) -> bool {
        self.is_tracked(path) || self.processed.contains(path)
    }

    #[must_use]
    pub fn is_tracked(&self, path: &Path) -> bool {
        self.tracked.iter().any(|e| e.path == path)
    }

    #[must_use]
    pub const fn total_ms(&self) -> u64 {
        self.total_ms
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// True when at least one clip is tracked and the total reaches `threshold_ms`
    #[must_use]
    pub fn threshold_met(&self, threshold_ms: u64) -> bool {
        !self.tracked.is_empty() && self.total_ms >= threshold_ms
    }

    /// Snapshot every tracked clip as a batch
    #[must_use]
    pub fn batch(&self, order: StitchOrder) -> Batch {
        let mut entries = self.tracked.clone();
        if order == StitchOrder::Lexical {
            entries.sort_by(|a, b| {
                a.path
                    .file_name()
                    .cmp(&b.path.file_name())
                    .then_with(|| a.path.cmp(&b.path))
            });
        }
        Batch { entries }
    }

    /// Move a batch's clips from the tracked set to the processed set
    pub fn mark_processed(&mut self, batch: &Batch) {
        for entry in &batch.entries {
            if self.untrack(&entry.path) {
                self.processed.insert(entry.path.clone());
            }
        }
    }

    /// Drop every record of a path, e.g. after the file was deleted
    ///
    /// Returns true if the path was tracked or processed.
    pub fn forget(&mut self, path: &Path) -> bool {
        let was_tracked = self.untrack(path);
        let was_processed = self.processed.remove(path);
        was_tracked || was_processed
    }

    #[must_use]
    pub fn tracked(&self) -> &[TrackedFile] {
        &self.tracked
    }

    #[must_use]
    pub const fn processed(&self) -> &HashSet<PathBuf> {
        &self.processed
    }

    fn untrack(&mut self, path: &Path) -> bool {
        let Some(index) = self.tracked.iter().position(|e| e.path == path) else {
            return false;
        };
        let entry = self.tracked.remove(index);
        self.total_ms -= entry.duration_ms;
        true
    }
}
