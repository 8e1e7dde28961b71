use std::collections::{HashMap, HashSet};
use std::io::Read;

use checksums::strong::{Md5, StrongDigest, to_hex};
use fs::FileSystem;
use interrupt::Guard;
use model::{Diff, DiffKind, DuplicateMode, IndexRow};

use crate::error::{IndexError, ReindexError};
use crate::persist;
use crate::staging::{StagedData, StagingRegion};

/// The in-memory manifest of every file managed under a destination base
/// folder, backed by the gzipped CSV file named by
/// [`persist::INDEX_FILE_NAME`].
///
/// `Indexer` never owns a [`FileSystem`]; every operation that touches disk
/// takes one as a parameter, so a [`Synchronizer`](../sync/struct.Synchronizer.html)
/// and its `Indexer` always observe the exact same view of the destination,
/// including a [`fs::RemoteFileSystem`]'s cached directory listing.
pub struct Indexer {
    base_folder: String,
    index_path: String,
    index: HashMap<String, IndexRow>,
    diff: Diff,
    staged: Option<StagedData>,
}

impl Indexer {
    /// Opens the index for `base_folder`, loading whatever manifest is
    /// already persisted there (tolerantly — see [`persist::load`]).
    pub fn open(fs: &mut dyn FileSystem, base_folder: impl Into<String>) -> Self {
        let base_folder = base_folder.into();
        let index_path = fs.join(&base_folder, persist::INDEX_FILE_NAME);
        let index = persist::load(fs, &index_path);
        Self {
            base_folder,
            index_path,
            index,
            diff: Diff::new(),
            staged: None,
        }
    }

    /// The destination root this index manages.
    #[must_use]
    pub fn base_folder(&self) -> &str {
        &self.base_folder
    }

    /// Absolute path of the persisted index file.
    #[must_use]
    pub fn index_path(&self) -> &str {
        &self.index_path
    }

    /// Number of rows currently in the in-memory index.
    #[must_use]
    pub fn index_count(&self) -> usize {
        self.index.len()
    }

    /// The diff accumulated since the last [`commit`](Self::commit).
    #[must_use]
    pub fn diff(&self) -> &Diff {
        &self.diff
    }

    /// True if a [`stage`](Self::stage) region is currently open.
    ///
    /// Creating a second region while one is live is a programming error;
    /// [`stage`](Self::stage) asserts on this rather than returning a
    /// recoverable error.
    #[must_use]
    pub fn is_staged(&self) -> bool {
        self.staged.is_some()
    }

    /// Returns the row recorded for `relative_path`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotManaged`] if `relative_path` has no row.
    pub fn get(&self, relative_path: &str) -> Result<&IndexRow, IndexError> {
        self.index
            .get(relative_path)
            .ok_or_else(|| IndexError::NotManaged(relative_path.to_string()))
    }

    /// Removes and returns the row for `relative_path`, recording a
    /// `Removed` diff entry.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotManaged`] if `relative_path` has no row.
    pub fn pop(&mut self, relative_path: &str) -> Result<IndexRow, IndexError> {
        let row = self
            .index
            .remove(relative_path)
            .ok_or_else(|| IndexError::NotManaged(relative_path.to_string()))?;
        self.diff.push(DiffKind::Removed, relative_path.to_string());
        Ok(row)
    }

    /// `true` iff `relative_path` is managed and its recorded mtime and size
    /// both equal the given values. Does not compare the hash.
    #[must_use]
    pub fn match_row(&self, relative_path: &str, last_modified: f64, size: u64) -> bool {
        self.index
            .get(relative_path)
            .is_some_and(|row| row.matches_stat(last_modified, size))
    }

    /// `true` iff [`match_row`](Self::match_row) holds *and* the recorded
    /// hash equals `hash`.
    #[must_use]
    pub fn validate(&self, relative_path: &str, hash: &str, last_modified: f64, size: u64) -> bool {
        self.match_row(relative_path, last_modified, size)
            && self.index.get(relative_path).is_some_and(|row| row.file_hash == hash)
    }

    /// Streams `path` through MD5 in `buffer_size`-byte chunks via `fs`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Fs`] if `path` cannot be opened or read.
    pub fn hash_file(fs: &mut dyn FileSystem, path: &str, buffer_size: usize) -> Result<String, IndexError> {
        let mut reader = fs.open_read(path)?;
        let mut hasher = Md5::new();
        let mut buffer = vec![0u8; buffer_size.max(1)];
        loop {
            let read = reader
                .read(&mut buffer)
                .map_err(|err| IndexError::Fs(fs::FsError::Io(err)))?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }
        Ok(to_hex(&hasher.finalize()))
    }

    /// Recomputes the row for `relative_path` from the file currently on
    /// disk at `base_folder/relative_path`: its on-disk mtime and size, and
    /// a fresh MD5 over its bytes.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Fs`] if the file is missing or cannot be read.
    pub fn update(&mut self, fs: &mut dyn FileSystem, relative_path: &str, buffer_size: usize) -> Result<(), IndexError> {
        let path = fs.join(&self.base_folder, relative_path);
        if !fs.isfile(&path) {
            return Err(IndexError::Fs(fs::FsError::NotAFile(path)));
        }
        let stat = fs.stat(&path)?;
        let hash = Self::hash_file(fs, &path, buffer_size)?;
        self.set(relative_path.to_string(), IndexRow::new(hash, stat.last_modified, stat.size));
        Ok(())
    }

    /// Removes `relative_path` from the index and unlinks its file.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotManaged`] if the path is not managed, or
    /// [`IndexError::Fs`] if the unlink fails.
    pub fn destroy(&mut self, fs: &mut dyn FileSystem, relative_path: &str) -> Result<(), IndexError> {
        self.pop(relative_path)?;
        let path = fs.join(&self.base_folder, relative_path);
        fs.unlink(&path)?;
        Ok(())
    }

    /// Writes the in-memory index to disk if the diff is non-empty,
    /// otherwise a no-op. Bracketed by an interrupt mask: a commit in
    /// progress always finishes once started.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Fs`] if the write fails.
    pub fn commit(&mut self, fs: &mut dyn FileSystem) -> Result<(), IndexError> {
        let _guard = Guard::enter();
        if self.diff.is_empty() {
            return Ok(());
        }
        self.diff = Diff::new();
        persist::save(fs, &self.index_path, &self.index)?;
        Ok(())
    }

    /// Groups managed relative paths that share content (or, in
    /// [`DuplicateMode::Strict`] mode, content *and* mtime *and* size), and
    /// returns only groups with two or more members.
    #[must_use]
    pub fn find_duplicates(&self, mode: DuplicateMode) -> Vec<Vec<String>> {
        let mut groups: HashMap<String, Vec<String>> = HashMap::new();
        for (path, row) in &self.index {
            let key = match mode {
                DuplicateMode::Content => row.file_hash.clone(),
                DuplicateMode::Strict => format!("{}|{}|{}", row.file_hash, row.last_modified, row.size),
            };
            groups.entry(key).or_default().push(path.clone());
        }
        groups.into_values().filter(|group| group.len() >= 2).collect()
    }

    /// Returns every regular file under the base folder, as relative paths,
    /// excluding the index file itself.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Fs`] if the directory walk fails.
    pub fn managed_relative_paths(&self, fs: &mut dyn FileSystem) -> Result<Vec<String>, IndexError> {
        let files = fs.rglob_files()?;
        Ok(files
            .into_iter()
            .filter_map(|path| {
                let relative = fs.relpath(&path, &self.base_folder);
                (relative != persist::INDEX_FILE_NAME).then_some(relative)
            })
            .collect())
    }

    /// Relative paths currently recorded in memory, regardless of whether the
    /// underlying file still exists on disk. Used by destructive cleanup to
    /// find rows whose source object disappeared.
    #[must_use]
    pub fn indexed_relative_paths(&self) -> Vec<String> {
        self.index.keys().cloned().collect()
    }

    /// Counts the files [`managed_relative_paths`](Self::managed_relative_paths)
    /// would return, without allocating a callback for progress pacing.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Fs`] if the directory walk fails.
    pub fn count_managed_files(&self, fs: &mut dyn FileSystem) -> Result<usize, IndexError> {
        Ok(self.managed_relative_paths(fs)?.len())
    }

    /// Reconciles the in-memory index with what is actually present under
    /// the base folder: rehashes any managed file whose mtime or size no
    /// longer matches its row, and evicts rows for files no longer present.
    ///
    /// Each per-file step is bracketed by an interrupt mask; an interrupt
    /// is only observed at the safe point between files, where it short-
    /// circuits with [`ReindexError::Interrupted`] carrying the count of
    /// files processed so far.
    ///
    /// # Errors
    ///
    /// Returns [`ReindexError::Fs`] if a stat, read, or hash fails, or
    /// [`ReindexError::Interrupted`] if a `SIGINT` was observed between
    /// files.
    pub fn reindex(
        &mut self,
        fs: &mut dyn FileSystem,
        buffer_size: usize,
        mut on_progress: impl FnMut(),
    ) -> Result<u64, ReindexError> {
        let managed = self.managed_relative_paths(fs)?;
        let seen: HashSet<&str> = managed.iter().map(String::as_str).collect();
        let mut files_indexed = 0u64;

        for relative_path in &managed {
            {
                let _guard = Guard::enter();
                let abs_path = fs.join(&self.base_folder, relative_path);
                let stat = fs.stat(&abs_path)?;
                if !self.match_row(relative_path, stat.last_modified, stat.size) {
                    let hash = Self::hash_file(fs, &abs_path, buffer_size)?;
                    self.set(relative_path.clone(), IndexRow::new(hash, stat.last_modified, stat.size));
                }
            }

            files_indexed += 1;
            on_progress();

            if let Err(interrupted) = interrupt::checkpoint(|| files_indexed) {
                return Err(ReindexError::Interrupted(interrupted));
            }
        }

        let stale: Vec<String> = self
            .index
            .keys()
            .filter(|key| !seen.contains(key.as_str()))
            .cloned()
            .collect();
        for key in stale {
            let _ = self.pop(&key);
        }

        Ok(files_indexed)
    }

    /// Opens a staging region for a write to `path` (absolute) under key
    /// `relative_path`: moves any existing file at `path` aside, choosing a
    /// free `.bak` name, and records enough state to revert.
    ///
    /// The returned [`StagingRegion`] borrows both `self` and `fs` for its
    /// lifetime; callers perform the actual content write through
    /// [`StagingRegion::fs_mut`] and then call [`StagingRegion::finish`] or
    /// [`StagingRegion::revert`]. Dropping the region without calling
    /// either reverts it as a safety net.
    ///
    /// # Panics
    ///
    /// Panics if a staging region is already live (see
    /// [`is_staged`](Self::is_staged)); creating a second one concurrently
    /// is a programming error, not a recoverable condition.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Fs`] if the prelude rename fails.
    pub fn stage<'a>(
        &'a mut self,
        fs: &'a mut dyn FileSystem,
        path: impl Into<String>,
        relative_path: impl Into<String>,
    ) -> Result<StagingRegion<'a>, IndexError> {
        assert!(
            self.staged.is_none(),
            "programming error: a staging region is already live"
        );

        let path = path.into();
        let relative_path = relative_path.into();

        let staged = {
            let _guard = Guard::enter();
            let mut backup_path = format!("{path}.bak");
            let mut counter = 0u32;
            while fs.isfile(&backup_path) {
                backup_path = format!("{path}{counter}.bak");
                counter += 1;
            }
            let prior_row = self.index.get(&relative_path).cloned();
            if fs.isfile(&path) {
                fs.rename(&path, &backup_path)?;
            }
            StagedData {
                path,
                relative_path,
                backup_path,
                prior_row,
            }
        };

        self.staged = Some(staged);
        Ok(StagingRegion::new(self, fs))
    }

    fn set(&mut self, relative_path: impl Into<String>, row: IndexRow) {
        let relative_path = relative_path.into();
        match self.index.get(&relative_path) {
            Some(existing) if *existing == row => {}
            Some(_) => self.diff.push(DiffKind::Modified, relative_path.clone()),
            None => self.diff.push(DiffKind::Added, relative_path.clone()),
        }
        self.index.insert(relative_path, row);
    }

    pub(crate) fn staged_data(&self) -> &StagedData {
        self.staged
            .as_ref()
            .expect("staging region invariant: StagedData present while a region is open")
    }

    pub(crate) fn finish_stage(&mut self, fs: &mut dyn FileSystem) -> Result<(), IndexError> {
        let _guard = Guard::enter();
        let Some(staged) = self.staged.take() else {
            return Ok(());
        };

        if fs.isfile(&staged.path) {
            if fs.isfile(&staged.backup_path) {
                fs.unlink(&staged.backup_path)?;
            }
        } else if fs.isfile(&staged.backup_path) {
            fs.rename(&staged.backup_path, &staged.path)?;
        }
        Ok(())
    }

    pub(crate) fn revert_stage(&mut self, fs: &mut dyn FileSystem) {
        let _guard = Guard::enter();
        let Some(staged) = self.staged.take() else {
            return;
        };

        match &staged.prior_row {
            None => {
                if self.index.remove(&staged.relative_path).is_some() {
                    self.diff.revert_last(DiffKind::Added, &staged.relative_path);
                }
            }
            Some(prior_row) => {
                if self.index.get(&staged.relative_path) != Some(prior_row) {
                    self.index
                        .insert(staged.relative_path.clone(), prior_row.clone());
                    self.diff.revert_last(DiffKind::Modified, &staged.relative_path);
                }
            }
        }

        if fs.isfile(&staged.path) {
            let _ = fs.unlink(&staged.path);
        }
        if fs.isfile(&staged.backup_path) {
            let _ = fs.rename(&staged.backup_path, &staged.path);
        }
    }
}
