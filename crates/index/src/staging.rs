use model::IndexRow;

use crate::error::IndexError;
use crate::store::Indexer;

/// State recorded for a single open staging region.
///
/// Exists (rather than living directly on [`Indexer`]) so the "at most one
/// live region" invariant is a single `Option` field, and so the postlude and
/// revert logic in [`store`](crate::store) can match on it without threading
/// extra parameters through every call.
pub(crate) struct StagedData {
    pub(crate) path: String,
    pub(crate) relative_path: String,
    pub(crate) backup_path: String,
    pub(crate) prior_row: Option<IndexRow>,
}

/// RAII handle to an in-progress staged write, returned by
/// [`Indexer::stage`](crate::Indexer::stage).
///
/// A caller writes the new content through [`fs_mut`](Self::fs_mut), records
/// its fingerprint via [`update`](Self::update) or
/// [`validate`](Self::validate), and then consumes the region with either
/// [`finish`](Self::finish) (keep the new content, drop the backup) or
/// [`revert`](Self::revert) (restore the backup, undo the index change). If
/// neither is called — an early return on an error path the caller forgot to
/// handle explicitly, a panic unwinding through the block — [`Drop`] reverts
/// the region, so a destination file can never be left holding partial
/// content with no backup to fall back to.
pub struct StagingRegion<'a> {
    indexer: &'a mut Indexer,
    fs: &'a mut dyn fs::FileSystem,
    settled: bool,
}

impl<'a> StagingRegion<'a> {
    pub(crate) fn new(indexer: &'a mut Indexer, fs: &'a mut dyn fs::FileSystem) -> Self {
        Self {
            indexer,
            fs,
            settled: false,
        }
    }

    /// The absolute path being written.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.indexer.staged_data().path
    }

    /// The relative path the write is recorded under in the index.
    #[must_use]
    pub fn relative_path(&self) -> &str {
        &self.indexer.staged_data().relative_path
    }

    /// Mutable access to the filesystem this region was opened against, for
    /// writing the new content at [`path`](Self::path).
    pub fn fs_mut(&mut self) -> &mut dyn fs::FileSystem {
        self.fs
    }

    /// Recomputes the index row for this region's relative path from the
    /// file currently at [`path`](Self::path): its on-disk mtime, size, and a
    /// fresh MD5.
    ///
    /// Call after writing the new content and before
    /// [`finish`](Self::finish), so the committed index reflects what was
    /// actually written rather than whatever the source reported.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Fs`] if the path cannot be stat'd or read.
    pub fn update(&mut self, buffer_size: usize) -> Result<(), IndexError> {
        let relative_path = self.relative_path().to_string();
        self.indexer.update(self.fs, &relative_path, buffer_size)
    }

    /// `true` iff the index row recorded for this region matches `hash`,
    /// `last_modified`, and `size`.
    #[must_use]
    pub fn validate(&self, hash: &str, last_modified: f64, size: u64) -> bool {
        self.indexer.validate(self.relative_path(), hash, last_modified, size)
    }

    /// Keeps the new content: drops the backup if the write succeeded, or
    /// restores it if the caller never actually wrote a new file at
    /// [`path`](Self::path).
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Fs`] if the backup cannot be removed or
    /// restored.
    pub fn finish(mut self) -> Result<(), IndexError> {
        let result = self.indexer.finish_stage(self.fs);
        self.settled = true;
        result
    }

    /// Undoes the region: restores the prior index row (or removes it, if
    /// this was a new path), then restores the backup file over whatever is
    /// at [`path`](Self::path), removing it first if necessary.
    pub fn revert(mut self) {
        self.indexer.revert_stage(self.fs);
        self.settled = true;
    }
}

impl Drop for StagingRegion<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.indexer.revert_stage(self.fs);
        }
    }
}
