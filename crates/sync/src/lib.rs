#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! [`Synchronizer`] drives the two-phase run described by the index crate's
//! staged-write protocol: reindex whatever is already present at the
//! destination, commit that reconciliation, then iterate the source and
//! copy every object whose content differs, retrying each write against a
//! configured budget before giving up on the whole run.
//!
//! # Design
//!
//! Every step that can be interrupted mid-flight — the reindex scan, a
//! single staged write, the gap between files — is bracketed by
//! [`interrupt::checkpoint`]. Hitting one composes a best-effort
//! [`SyncResult`] from whatever counters have accumulated so far, commits
//! the index to match, and hands the partial result back wrapped in
//! [`SyncError::Interrupted`] rather than losing it to an unwound stack.
//!
//! A destination write that fails outright — a hash mismatch, a dropped
//! source stream, an I/O error on the destination — is not a [`SyncError`]:
//! [`Synchronizer`] retries it up to [`Config::retries`](model::Config::retries)
//! times, and only once the budget is exhausted does the run stop, cleanly,
//! reporting the offending path via
//! [`SyncDetails::current_destination_path`](model::SyncDetails::current_destination_path).

mod error;

use std::io::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use checksums::strong::{Md5, StrongDigest, to_hex};
use fs::FileSystem;
use index::{Indexer, ReindexError};
use interrupt::Interrupted;
use model::{Config, Diff, SyncDetails, SyncResult};
use source::{Source, SourceFile};

pub use error::SyncError;

/// Outcome of a single write attempt inside the per-file retry loop.
enum AttemptOutcome {
    /// The write validated; the index has been updated and committed-to.
    Success,
    /// The write failed for a condition the retry policy may recover from.
    Retry,
    /// The source stream could not be re-established; further attempts
    /// against this file would fail identically.
    GiveUp,
    /// A `SIGINT` was observed mid-write; the region has already been
    /// reverted.
    Interrupted,
}

/// Drives a single reindex-then-copy run against one destination.
///
/// Holds nothing but an immutable [`Config`]; every other piece of state
/// (the source, the destination filesystem, the destination folder) is
/// supplied per call to [`synchronize`](Self::synchronize) so one
/// `Synchronizer` can be reused across runs against different
/// source/destination pairs.
#[derive(Debug, Clone)]
pub struct Synchronizer {
    config: Config,
}

impl Synchronizer {
    /// Creates a synchronizer that will use `config` for every run.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// The configuration this synchronizer was built with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs a full reindex-then-copy pass from `source` into
    /// `dest_folder` on `fs`.
    ///
    /// `on_progress` is invoked once per file considered in each phase,
    /// unless [`Config::silent`](model::Config::silent) is set, in which
    /// case it is never called.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Source`] if source enumeration fails outright,
    /// [`SyncError::Index`] if an index operation outside the per-file retry
    /// path fails, or [`SyncError::Interrupted`] if a `SIGINT` was observed;
    /// the latter carries the partial result accumulated up to that point.
    /// A per-file write that exhausts its retry budget is *not* an error:
    /// it ends the run with
    /// [`SyncDetails::current_destination_path`](model::SyncDetails::current_destination_path)
    /// set, returned as `Ok`.
    pub fn synchronize<S: Source>(
        &self,
        source: &mut S,
        fs: &mut dyn FileSystem,
        dest_folder: &str,
        mut on_progress: impl FnMut(),
    ) -> Result<SyncResult, SyncError> {
        let total_files = source.count_files()? as u64;
        let mut indexer = Indexer::open(fs, dest_folder.to_string());
        let total_indices = indexer.index_count() as u64;

        let files_indexed = match indexer.reindex(fs, self.config.buffer_size, || {
            if !self.config.silent {
                on_progress();
            }
        }) {
            Ok(count) => count,
            Err(ReindexError::Interrupted(interrupted)) => {
                return Err(self.finish_interrupted(
                    &mut indexer,
                    fs,
                    interrupted.data,
                    total_indices,
                    total_files,
                    SyncDetails::empty(),
                ));
            }
            Err(ReindexError::Fs(err)) => return Err(SyncError::Index(err)),
        };

        let index_diff = indexer.diff().clone();
        indexer.commit(fs)?;

        let files = source.list_files()?;
        let file_count = files.len();
        let mut details = SyncDetails::empty();
        let mut observed = std::collections::HashSet::with_capacity(file_count);

        for (position, mut file) in files.into_iter().enumerate() {
            let relative_path = file.relative_path().to_string();
            observed.insert(relative_path.clone());
            details.size_discovered += file.size();

            if indexer.match_row(&relative_path, file.last_modified(), file.size()) {
                details.files_skipped += 1;
                details.size_skipped += file.size();
            } else {
                let target = fs.join(dest_folder, &relative_path);
                let parent = fs.dirname(&target);
                if let Err(err) = fs.mkdir(&parent) {
                    return Err(self.finish_fatal_index_error(
                        &mut indexer,
                        fs,
                        err,
                    ));
                }

                let mut succeeded = false;
                let attempts = self.config.retries.max(1);
                for _ in 0..attempts {
                    match self.attempt_write(&mut indexer, fs, &mut file, &target, &relative_path)? {
                        AttemptOutcome::Success => {
                            succeeded = true;
                            break;
                        }
                        AttemptOutcome::Retry => continue,
                        AttemptOutcome::GiveUp => break,
                        AttemptOutcome::Interrupted => {
                            return Err(self.finish_interrupted(
                                &mut indexer,
                                fs,
                                files_indexed,
                                total_indices,
                                total_files,
                                details,
                            ));
                        }
                    }
                }

                if !succeeded {
                    details.current_destination_path = Some(PathBuf::from(&target));
                    let sync_diff = indexer.diff().clone();
                    indexer.commit(fs)?;
                    return Ok(SyncResult {
                        files_indexed,
                        total_indices,
                        total_files,
                        details,
                        index_diff,
                        sync_diff,
                    });
                }

                details.files_copied += 1;
                details.size_copied += file.size();
            }

            if !self.config.silent {
                on_progress();
            }

            if position + 1 < file_count && self.config.delay > Duration::ZERO {
                std::thread::sleep(self.config.delay);
            }

            if let Err(interrupted) = interrupt::checkpoint(|| ()) {
                let Interrupted { data: () } = interrupted;
                return Err(self.finish_interrupted(
                    &mut indexer,
                    fs,
                    files_indexed,
                    total_indices,
                    total_files,
                    details,
                ));
            }
        }

        if self.config.destructive {
            let stale: Vec<String> = indexer
                .indexed_relative_paths()
                .into_iter()
                .filter(|path| !observed.contains(path))
                .collect();
            for relative_path in stale {
                indexer.destroy(fs, &relative_path)?;
            }
            fs.remove_empty_folders(dest_folder)
                .map_err(index::IndexError::from)?;
        }

        let sync_diff = indexer.diff().clone();
        indexer.commit(fs)?;
        Ok(SyncResult {
            files_indexed,
            total_indices,
            total_files,
            details,
            index_diff,
            sync_diff,
        })
    }

    fn attempt_write(
        &self,
        indexer: &mut Indexer,
        fs: &mut dyn FileSystem,
        file: &mut impl SourceFile,
        target: &str,
        relative_path: &str,
    ) -> Result<AttemptOutcome, SyncError> {
        let mut region = indexer.stage(fs, target.to_string(), relative_path.to_string())?;

        if interrupt::is_interrupted() {
            region.revert();
            return Ok(AttemptOutcome::Interrupted);
        }

        if file.reset_seek().is_err() {
            let can_retry = file.reopen();
            region.revert();
            return Ok(if can_retry { AttemptOutcome::Retry } else { AttemptOutcome::GiveUp });
        }

        let mut writer = match region.fs_mut().open_write(target) {
            Ok(writer) => writer,
            Err(err) => {
                tracing::warn!(path = target, error = %err, "failed to open destination for writing");
                region.revert();
                return Ok(AttemptOutcome::Retry);
            }
        };

        let mut hasher = Md5::new();
        loop {
            if interrupt::is_interrupted() {
                region.revert();
                return Ok(AttemptOutcome::Interrupted);
            }

            match file.read_chunk(self.config.buffer_size) {
                Ok(Some(chunk)) => {
                    hasher.update(&chunk);
                    if writer.write_all(&chunk).is_err() {
                        region.revert();
                        return Ok(AttemptOutcome::Retry);
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(path = relative_path, error = %err, "source stream failed mid-copy");
                    let can_retry = file.reopen();
                    region.revert();
                    return Ok(if can_retry { AttemptOutcome::Retry } else { AttemptOutcome::GiveUp });
                }
            }
        }

        if writer.finish().is_err() {
            region.revert();
            return Ok(AttemptOutcome::Retry);
        }

        let atime = file.last_accessed();
        let mtime = file.last_modified();
        let ctime = file.created_time();
        {
            let fs = region.fs_mut();
            let _ = fs.utime(target, atime, mtime);
            fs.ctime(target, Some(ctime));
        }

        if region.update(self.config.buffer_size).is_err() {
            region.revert();
            return Ok(AttemptOutcome::Retry);
        }

        let source_hash = to_hex(&hasher.finalize());
        if region.validate(&source_hash, file.last_modified(), file.size()) {
            region.finish()?;
            Ok(AttemptOutcome::Success)
        } else {
            region.revert();
            Ok(AttemptOutcome::Retry)
        }
    }

    fn finish_interrupted(
        &self,
        indexer: &mut Indexer,
        fs: &mut dyn FileSystem,
        files_indexed: u64,
        total_indices: u64,
        total_files: u64,
        mut details: SyncDetails,
    ) -> SyncError {
        details.current_destination_path = None;
        let sync_diff = indexer.diff().clone();
        let _ = indexer.commit(fs);
        let result = SyncResult {
            files_indexed,
            total_indices,
            total_files,
            details,
            index_diff: Diff::new(),
            sync_diff,
        };
        SyncError::Interrupted(Interrupted::new(result))
    }

    fn finish_fatal_index_error(
        &self,
        indexer: &mut Indexer,
        fs: &mut dyn FileSystem,
        err: fs::FsError,
    ) -> SyncError {
        let _ = indexer.commit(fs);
        SyncError::Index(index::IndexError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fs::LocalFileSystem;
    use source::{FsSource, SourceError};
    use std::fs as stdfs;
    use tempfile::tempdir;

    fn write_source_tree(root: &std::path::Path) {
        stdfs::write(root.join("a.jpg"), b"aaa").expect("write a");
        stdfs::write(root.join("b.jpg"), b"bbbbb").expect("write b");
    }

    #[test]
    fn cold_start_copies_every_source_file() {
        interrupt::reset_for_testing();
        let source_dir = tempdir().expect("source dir");
        write_source_tree(source_dir.path());
        let dest_dir = tempdir().expect("dest dir");

        let mut source = FsSource::new(source_dir.path().to_path_buf());
        let mut dest_fs = LocalFileSystem::new(dest_dir.path().to_string_lossy().into_owned());
        let synchronizer = Synchronizer::new(Config {
            silent: true,
            ..Config::default()
        });

        let result = synchronizer
            .synchronize(&mut source, &mut dest_fs, dest_dir.path().to_str().expect("utf8 path"), || {})
            .expect("synchronize");

        assert_eq!(result.details.files_copied, 2);
        assert_eq!(result.details.files_skipped, 0);
        assert_eq!(result.details.size_copied, 8);
        assert!(dest_dir.path().join("a.jpg").exists());
        assert!(dest_dir.path().join("b.jpg").exists());
    }

    #[test]
    fn resync_with_unchanged_source_copies_nothing() {
        interrupt::reset_for_testing();
        let source_dir = tempdir().expect("source dir");
        write_source_tree(source_dir.path());
        let dest_dir = tempdir().expect("dest dir");

        let mut source = FsSource::new(source_dir.path().to_path_buf());
        let mut dest_fs = LocalFileSystem::new(dest_dir.path().to_string_lossy().into_owned());
        let synchronizer = Synchronizer::new(Config {
            silent: true,
            ..Config::default()
        });
        let dest_path = dest_dir.path().to_str().expect("utf8 path").to_string();

        synchronizer
            .synchronize(&mut source, &mut dest_fs, &dest_path, || {})
            .expect("first run");

        let mut source_again = FsSource::new(source_dir.path().to_path_buf());
        let result = synchronizer
            .synchronize(&mut source_again, &mut dest_fs, &dest_path, || {})
            .expect("second run");

        assert_eq!(result.details.files_copied, 0);
        assert_eq!(result.details.files_skipped, 2);
        assert!(result.sync_diff.added().is_empty());
        assert!(result.sync_diff.modified().is_empty());
        assert!(result.sync_diff.removed().is_empty());
    }

    #[test]
    fn destructive_mode_removes_files_absent_from_source() {
        interrupt::reset_for_testing();
        let source_dir = tempdir().expect("source dir");
        write_source_tree(source_dir.path());
        let dest_dir = tempdir().expect("dest dir");

        let mut source = FsSource::new(source_dir.path().to_path_buf());
        let mut dest_fs = LocalFileSystem::new(dest_dir.path().to_string_lossy().into_owned());
        let dest_path = dest_dir.path().to_str().expect("utf8 path").to_string();

        Synchronizer::new(Config {
            silent: true,
            ..Config::default()
        })
        .synchronize(&mut source, &mut dest_fs, &dest_path, || {})
        .expect("first run");

        stdfs::remove_file(source_dir.path().join("b.jpg")).expect("remove from source");

        let mut source_again = FsSource::new(source_dir.path().to_path_buf());
        let synchronizer = Synchronizer::new(Config {
            silent: true,
            destructive: true,
            ..Config::default()
        });
        let result = synchronizer
            .synchronize(&mut source_again, &mut dest_fs, &dest_path, || {})
            .expect("destructive run");

        assert_eq!(result.sync_diff.removed(), ["b.jpg"]);
        assert!(!dest_dir.path().join("b.jpg").exists());
        assert!(dest_dir.path().join("a.jpg").exists());
    }

    struct FlakyOnceFile {
        inner: <FsSource as Source>::File,
        failed_once: bool,
    }

    impl SourceFile for FlakyOnceFile {
        fn relative_path(&self) -> &str {
            self.inner.relative_path()
        }
        fn size(&self) -> u64 {
            self.inner.size()
        }
        fn last_modified(&self) -> f64 {
            self.inner.last_modified()
        }
        fn created_time(&self) -> f64 {
            self.inner.created_time()
        }
        fn last_accessed(&self) -> f64 {
            self.inner.last_accessed()
        }
        fn read_chunk(&mut self, buffer_size: usize) -> Result<Option<Vec<u8>>, SourceError> {
            if !self.failed_once {
                self.failed_once = true;
                return Err(SourceError::StreamRead(std::io::Error::other("flaky once")));
            }
            self.inner.read_chunk(buffer_size)
        }
        fn reset_seek(&mut self) -> Result<(), SourceError> {
            self.inner.reset_seek()
        }
        fn reopen(&mut self) -> bool {
            self.inner.reopen()
        }
    }

    #[test]
    fn a_transient_stream_failure_is_retried_and_eventually_succeeds() {
        interrupt::reset_for_testing();
        let source_dir = tempdir().expect("source dir");
        stdfs::write(source_dir.path().join("d.bin"), vec![7u8; 100]).expect("write d");
        let dest_dir = tempdir().expect("dest dir");

        let mut source = FsSource::new(source_dir.path().to_path_buf());
        let inner_file = source.list_files().expect("list").into_iter().next().expect("one file");
        let mut flaky = FlakyOnceFile {
            inner: inner_file,
            failed_once: false,
        };

        let mut dest_fs = LocalFileSystem::new(dest_dir.path().to_string_lossy().into_owned());
        let dest_path = dest_dir.path().to_str().expect("utf8 path").to_string();
        let mut indexer = Indexer::open(&mut dest_fs, dest_path.clone());
        let synchronizer = Synchronizer::new(Config::default());
        let target = dest_fs.join(&dest_path, "d.bin");

        let mut attempts = 0;
        let outcome = loop {
            attempts += 1;
            match synchronizer
                .attempt_write(&mut indexer, &mut dest_fs, &mut flaky, &target, "d.bin")
                .expect("attempt")
            {
                AttemptOutcome::Success => break "success",
                AttemptOutcome::Retry if attempts < 3 => continue,
                AttemptOutcome::Retry => break "exhausted",
                AttemptOutcome::GiveUp => break "gave up",
                AttemptOutcome::Interrupted => break "interrupted",
            }
        };

        assert_eq!(outcome, "success");
        assert_eq!(attempts, 2);
        assert!(!dest_dir.path().join("d.bin.bak").exists());
    }

    struct InterruptingFile {
        inner: <FsSource as Source>::File,
    }

    impl SourceFile for InterruptingFile {
        fn relative_path(&self) -> &str {
            self.inner.relative_path()
        }
        fn size(&self) -> u64 {
            self.inner.size()
        }
        fn last_modified(&self) -> f64 {
            self.inner.last_modified()
        }
        fn created_time(&self) -> f64 {
            self.inner.created_time()
        }
        fn last_accessed(&self) -> f64 {
            self.inner.last_accessed()
        }
        fn read_chunk(&mut self, buffer_size: usize) -> Result<Option<Vec<u8>>, SourceError> {
            // Fires once the first chunk of the new content has already
            // landed in the hasher, so the region is mid-write when the
            // checkpoint inside `attempt_write`'s read loop next fires.
            interrupt::simulate_interrupt_for_testing();
            self.inner.read_chunk(buffer_size)
        }
        fn reset_seek(&mut self) -> Result<(), SourceError> {
            self.inner.reset_seek()
        }
        fn reopen(&mut self) -> bool {
            self.inner.reopen()
        }
    }

    #[test]
    fn interrupt_mid_copy_restores_prior_content_and_carries_partial_counts() {
        interrupt::reset_for_testing();
        let source_dir = tempdir().expect("source dir");
        stdfs::write(source_dir.path().join("e.jpg"), vec![9u8; 1 << 16]).expect("write e");
        let dest_dir = tempdir().expect("dest dir");
        // A prior file already sits at the destination; interrupting the
        // staged write for `e.jpg` must leave it untouched.
        stdfs::write(dest_dir.path().join("e.jpg"), b"prior content").expect("seed prior content");

        let mut source = FsSource::new(source_dir.path().to_path_buf());
        let inner_file = source.list_files().expect("list").into_iter().next().expect("one file");
        let mut interrupting = InterruptingFile { inner: inner_file };

        let mut dest_fs = LocalFileSystem::new(dest_dir.path().to_string_lossy().into_owned());
        let dest_path = dest_dir.path().to_str().expect("utf8 path").to_string();
        let mut indexer = Indexer::open(&mut dest_fs, dest_path.clone());
        let synchronizer = Synchronizer::new(Config::default());
        let target = dest_fs.join(&dest_path, "e.jpg");

        let outcome = synchronizer
            .attempt_write(&mut indexer, &mut dest_fs, &mut interrupting, &target, "e.jpg")
            .expect("attempt_write");

        assert!(matches!(outcome, AttemptOutcome::Interrupted));
        assert_eq!(
            stdfs::read(dest_dir.path().join("e.jpg")).expect("read"),
            b"prior content"
        );
        assert!(!dest_dir.path().join("e.jpg.bak").exists());
        assert!(!indexer.is_staged());

        interrupt::reset_for_testing();
    }
}
