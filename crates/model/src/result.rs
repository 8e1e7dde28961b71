use std::path::PathBuf;

use crate::Diff;

/// Outcome of the copy phase (Phase 2) of a synchronization run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncDetails {
    /// Number of files actually written to the destination.
    pub files_copied: u64,
    /// Number of files whose destination content already matched the source.
    pub files_skipped: u64,
    /// Sum of `size` over every source file observed, copied or not.
    pub size_discovered: u64,
    /// Sum of `size` over every file actually copied.
    pub size_copied: u64,
    /// Sum of `size` over every file skipped.
    pub size_skipped: u64,
    /// The destination path of the file whose write attempt exhausted its
    /// retry budget, if the run ended in a fatal per-file failure.
    pub current_destination_path: Option<PathBuf>,
}

impl SyncDetails {
    /// A zero-valued details record, used as a placeholder when a run is
    /// interrupted before Phase 2 produces any real figures.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Full outcome of a `synchronize_to_folder` run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncResult {
    /// Number of files the reindex phase actually rehashed or evicted.
    pub files_indexed: u64,
    /// Number of files the index believed were managed before reindexing.
    pub total_indices: u64,
    /// Number of files the source reported via `count_files()`.
    pub total_files: u64,
    /// Outcome of the copy phase.
    pub details: SyncDetails,
    /// Diff accumulated by the reindex phase, as of its own commit.
    pub index_diff: Diff,
    /// Diff accumulated by the copy phase, as of its own commit.
    pub sync_diff: Diff,
}
