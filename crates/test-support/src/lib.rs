#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! A fully in-memory [`fs::FileSystem`] implementation shared by the index
//! and synchronizer test suites. Exercising staging, revert, and interrupt
//! handling against a real temp directory works, but is slow and leaves the
//! exact write/rename ordering to the OS; [`MemoryFileSystem`] makes that
//! ordering explicit and lets tests inject a failure at a chosen call
//! without racing a real signal or a real disk.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use fs::{FileStat, FileSystem, FsError, ReadStream, WriteStream};

/// One file's content and timestamps inside a [`MemoryFileSystem`].
#[derive(Debug, Clone)]
struct MemoryFile {
    bytes: Vec<u8>,
    last_modified: f64,
    last_accessed: f64,
    created_time: Option<f64>,
}

type Files = Arc<Mutex<HashMap<String, MemoryFile>>>;

fn lock(files: &Files) -> std::sync::MutexGuard<'_, HashMap<String, MemoryFile>> {
    files.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// An in-memory [`FileSystem`] rooted at a synthetic base folder.
///
/// Paths are plain strings keyed exactly as callers pass them; there is no
/// notion of a real directory entry, so [`mkdir`](Self::mkdir) is a no-op and
/// [`rglob_files`](Self::rglob_files) simply reports every key currently
/// written.
pub struct MemoryFileSystem {
    base_folder: String,
    files: Files,
    /// When `Some(path)`, the next [`open_write`](Self::open_write) for that
    /// path fails instead of succeeding, then clears itself. Lets a test
    /// simulate a destination write that fails partway through a retry loop.
    fail_next_write: Option<String>,
}

impl MemoryFileSystem {
    /// Creates an empty filesystem rooted at `base_folder`.
    #[must_use]
    pub fn new(base_folder: impl Into<String>) -> Self {
        Self {
            base_folder: base_folder.into(),
            files: Arc::new(Mutex::new(HashMap::new())),
            fail_next_write: None,
        }
    }

    /// Seeds a file directly, bypassing [`open_write`](Self::open_write), for
    /// tests that want an existing destination file before staging begins.
    pub fn seed(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>, mtime: f64) {
        lock(&self.files).insert(
            path.into(),
            MemoryFile {
                bytes: bytes.into(),
                last_modified: mtime,
                last_accessed: mtime,
                created_time: Some(mtime),
            },
        );
    }

    /// Returns a copy of the bytes currently stored at `path`, if any.
    #[must_use]
    pub fn read_bytes(&self, path: &str) -> Option<Vec<u8>> {
        lock(&self.files).get(path).map(|file| file.bytes.clone())
    }

    /// Arranges for the next [`open_write`](Self::open_write) of `path` to
    /// fail with [`FsError::NotAFile`], simulating a destination I/O error
    /// mid-attempt.
    pub fn fail_next_write_to(&mut self, path: impl Into<String>) {
        self.fail_next_write = Some(path.into());
    }
}

impl FileSystem for MemoryFileSystem {
    fn isfile(&mut self, path: &str) -> bool {
        lock(&self.files).contains_key(path)
    }

    fn rename(&mut self, src: &str, dst: &str) -> Result<(), FsError> {
        let mut files = lock(&self.files);
        let file = files
            .remove(src)
            .ok_or_else(|| FsError::NotAFile(src.to_string()))?;
        files.insert(dst.to_string(), file);
        Ok(())
    }

    fn unlink(&mut self, path: &str) -> Result<(), FsError> {
        lock(&self.files)
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| FsError::NotAFile(path.to_string()))
    }

    fn stat(&mut self, path: &str) -> Result<FileStat, FsError> {
        let files = lock(&self.files);
        let file = files
            .get(path)
            .ok_or_else(|| FsError::NotAFile(path.to_string()))?;
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        Ok(FileStat {
            name,
            size: file.bytes.len() as u64,
            last_modified: file.last_modified,
            last_accessed: file.last_accessed,
            created_time: file.created_time,
        })
    }

    fn join(&self, path: &str, more: &str) -> String {
        format!("{}/{}", path.trim_end_matches('/'), more.trim_start_matches('/'))
    }

    fn dirname(&self, path: &str) -> String {
        match path.rsplit_once('/') {
            Some((parent, _)) if !parent.is_empty() => parent.to_string(),
            Some(_) => "/".to_string(),
            None => String::new(),
        }
    }

    fn relpath(&self, path: &str, start: &str) -> String {
        path.strip_prefix(start)
            .map(|rest| rest.trim_start_matches('/').to_string())
            .unwrap_or_else(|| path.to_string())
    }

    fn mkdir(&mut self, _path: &str) -> Result<(), FsError> {
        Ok(())
    }

    fn rglob_files(&mut self) -> Result<Vec<String>, FsError> {
        Ok(lock(&self.files).keys().cloned().collect())
    }

    fn remove_empty_folders(&mut self, _base_folder: &str) -> Result<(), FsError> {
        Ok(())
    }

    fn utime(&mut self, path: &str, atime: f64, mtime: f64) -> Result<(), FsError> {
        let mut files = lock(&self.files);
        let file = files
            .get_mut(path)
            .ok_or_else(|| FsError::NotAFile(path.to_string()))?;
        file.last_accessed = atime;
        file.last_modified = mtime;
        Ok(())
    }

    fn ctime(&mut self, path: &str, time: Option<f64>) {
        if let Some(file) = lock(&self.files).get_mut(path) {
            file.created_time = time;
        }
    }

    fn set_hidden(&mut self, _path: &str) {}

    fn open_read(&mut self, path: &str) -> Result<Box<dyn ReadStream>, FsError> {
        let files = lock(&self.files);
        let file = files
            .get(path)
            .ok_or_else(|| FsError::NotAFile(path.to_string()))?;
        Ok(Box::new(std::io::Cursor::new(file.bytes.clone())))
    }

    fn open_write(&mut self, path: &str) -> Result<Box<dyn WriteStream>, FsError> {
        if self.fail_next_write.as_deref() == Some(path) {
            self.fail_next_write = None;
            return Err(FsError::NotAFile(path.to_string()));
        }
        Ok(Box::new(MemoryWriteStream {
            path: path.to_string(),
            buffer: Vec::new(),
            files: Arc::clone(&self.files),
        }))
    }

    fn base_folder(&self) -> &str {
        &self.base_folder
    }
}

/// Buffers written bytes until [`finish`](WriteStream::finish), at which
/// point they are inserted into the shared file map. Mirrors the local
/// backend's write-then-`sync_all` shape rather than mutating the stored
/// file incrementally, so a write that is never finished leaves no trace.
struct MemoryWriteStream {
    path: String,
    buffer: Vec<u8>,
    files: Files,
}

impl std::io::Write for MemoryWriteStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl WriteStream for MemoryWriteStream {
    fn finish(self: Box<Self>) -> Result<(), FsError> {
        let now = lock(&self.files)
            .get(&self.path)
            .map(|existing| existing.last_modified)
            .unwrap_or(0.0);
        lock(&self.files).insert(
            self.path,
            MemoryFile {
                bytes: self.buffer,
                last_modified: now,
                last_accessed: now,
                created_time: None,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write as _};

    #[test]
    fn write_then_read_round_trips_bytes() {
        let mut fs = MemoryFileSystem::new("/base");
        let mut writer = fs.open_write("/base/a.bin").expect("open_write");
        writer.write_all(b"hello").expect("write_all");
        writer.finish().expect("finish");

        let mut reader = fs.open_read("/base/a.bin").expect("open_read");
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).expect("read_to_end");
        assert_eq!(buf, b"hello");
    }

    #[test]
    fn unfinished_write_leaves_no_trace() {
        let mut fs = MemoryFileSystem::new("/base");
        let mut writer = fs.open_write("/base/a.bin").expect("open_write");
        writer.write_all(b"partial").expect("write_all");
        drop(writer);

        assert!(!fs.isfile("/base/a.bin"));
    }

    #[test]
    fn fail_next_write_to_fails_exactly_one_attempt() {
        let mut fs = MemoryFileSystem::new("/base");
        fs.fail_next_write_to("/base/a.bin");
        assert!(fs.open_write("/base/a.bin").is_err());
        assert!(fs.open_write("/base/a.bin").is_ok());
    }

    #[test]
    fn rename_moves_content_between_keys() {
        let mut fs = MemoryFileSystem::new("/base");
        fs.seed("/base/a.bin", b"data".to_vec(), 1000.0);
        fs.rename("/base/a.bin", "/base/a.bin.bak").expect("rename");
        assert!(!fs.isfile("/base/a.bin"));
        assert!(fs.isfile("/base/a.bin.bak"));
        assert_eq!(fs.read_bytes("/base/a.bin.bak"), Some(b"data".to_vec()));
    }

    #[test]
    fn stat_reports_recorded_timestamps_and_size() {
        let mut fs = MemoryFileSystem::new("/base");
        fs.seed("/base/a.bin", b"abcde".to_vec(), 1234.5);
        let stat = fs.stat("/base/a.bin").expect("stat");
        assert_eq!(stat.size, 5);
        assert_eq!(stat.last_modified, 1234.5);
    }
}
