use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::SourceError;
use crate::handle::SourceFile;
use crate::Source;

fn system_time_to_f64(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_secs_f64(),
        Err(err) => -err.duration().as_secs_f64(),
    }
}

fn to_forward_slashes(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// A source backed by a plain directory tree, used for local-to-local and
/// local-to-remote runs, and as the reference [`Source`] exercised by the
/// synchronizer's own test suite in place of a real device enumeration
/// layer.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    /// Creates a source rooted at `root`. Every regular file found under
    /// `root` (recursively) is an object this source will enumerate.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn walk(&self) -> Result<Vec<PathBuf>, SourceError> {
        let mut files = Vec::new();
        for entry in jwalk::WalkDir::new(&self.root) {
            let entry = entry.map_err(|err| SourceError::Enumeration(io::Error::other(err.to_string())))?;
            if entry.file_type().is_file() {
                files.push(entry.path());
            }
        }
        Ok(files)
    }
}

impl Source for FsSource {
    type File = FsSourceFile;

    fn list_files(&mut self) -> Result<Vec<Self::File>, SourceError> {
        self.walk()?
            .into_iter()
            .map(|path| {
                let relative = path
                    .strip_prefix(&self.root)
                    .map(to_forward_slashes)
                    .unwrap_or_else(|_| to_forward_slashes(&path));
                FsSourceFile::open(path, relative)
            })
            .collect()
    }

    fn count_files(&mut self) -> Result<usize, SourceError> {
        Ok(self.walk()?.len())
    }
}

/// A streamed, restartable handle to one file on the local filesystem.
pub struct FsSourceFile {
    path: PathBuf,
    relative_path: String,
    size: u64,
    last_modified: f64,
    created_time: f64,
    last_accessed: f64,
    handle: Option<File>,
}

impl FsSourceFile {
    fn open(path: PathBuf, relative_path: String) -> Result<Self, SourceError> {
        let metadata = std::fs::metadata(&path).map_err(SourceError::Enumeration)?;
        let handle = File::open(&path).map_err(SourceError::Enumeration)?;
        let created_time = metadata
            .created()
            .map(system_time_to_f64)
            .unwrap_or_else(|_| {
                metadata
                    .modified()
                    .map(system_time_to_f64)
                    .unwrap_or_default()
            });
        Ok(Self {
            size: metadata.len(),
            last_modified: metadata
                .modified()
                .map(system_time_to_f64)
                .map_err(SourceError::Enumeration)?,
            last_accessed: metadata
                .accessed()
                .map(system_time_to_f64)
                .unwrap_or(created_time),
            created_time,
            path,
            relative_path,
            handle: Some(handle),
        })
    }
}

impl SourceFile for FsSourceFile {
    fn relative_path(&self) -> &str {
        &self.relative_path
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn last_modified(&self) -> f64 {
        self.last_modified
    }

    fn created_time(&self) -> f64 {
        self.created_time
    }

    fn last_accessed(&self) -> f64 {
        self.last_accessed
    }

    fn read_chunk(&mut self, buffer_size: usize) -> Result<Option<Vec<u8>>, SourceError> {
        let handle = self
            .handle
            .as_mut()
            .expect("read_chunk called without an open stream; call reopen() first");
        let mut buffer = vec![0u8; buffer_size.max(1)];
        let read = handle.read(&mut buffer).map_err(SourceError::StreamRead)?;
        if read == 0 {
            Ok(None)
        } else {
            buffer.truncate(read);
            Ok(Some(buffer))
        }
    }

    fn reset_seek(&mut self) -> Result<(), SourceError> {
        let handle = self
            .handle
            .as_mut()
            .expect("reset_seek called without an open stream; call reopen() first");
        handle
            .seek(SeekFrom::Start(0))
            .map_err(SourceError::StreamSeek)?;
        Ok(())
    }

    fn reopen(&mut self) -> bool {
        match File::open(&self.path) {
            Ok(handle) => {
                self.handle = Some(handle);
                true
            }
            Err(_) => {
                self.handle = None;
                false
            }
        }
    }
}
