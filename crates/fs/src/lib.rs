#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! A uniform capability set over the directory tree the index and
//! synchronizer operate on, with two implementations: [`local::LocalFileSystem`]
//! (direct OS calls) and [`remote::RemoteFileSystem`] (a session that shells
//! out to the system `ssh` binary and lazily caches the remote directory
//! listing to amortize round trips).
//!
//! # Design
//!
//! Both variants are dispatched through the [`FileSystem`] trait rather than
//! through inheritance or downcasting, so the index and synchronizer crates
//! never need to know which backend they are driving. Remote-specific
//! failures (a dropped SSH connection, a non-zero exit status) surface as
//! ordinary [`FsError`] values through the same return type local failures
//! use, so the caller's retry policy treats both uniformly.

mod error;
mod local;
mod remote;
mod stat;
mod stream;

pub use error::FsError;
pub use local::LocalFileSystem;
pub use remote::RemoteFileSystem;
pub use stat::FileStat;
pub use stream::{ReadStream, WriteStream};

/// Uniform read/write/stat/rename/walk capability set over a managed base
/// folder, implemented by [`LocalFileSystem`] and [`RemoteFileSystem`].
///
/// Every method that can fail returns [`FsError`]; callers that tolerate a
/// failure (`ctime`, documented as best-effort) are expected to discard the
/// `Err` rather than the trait silently swallowing it, so unexpected
/// failures remain visible to tests and logs.
pub trait FileSystem: Send {
    /// True if `path` names an existing regular file.
    fn isfile(&mut self, path: &str) -> bool;

    /// Renames `src` to `dst`. Both must name paths the filesystem already
    /// knows about consistently with [`isfile`](Self::isfile): `src` must
    /// exist and `dst` must not.
    fn rename(&mut self, src: &str, dst: &str) -> Result<(), FsError>;

    /// Removes the regular file at `path`.
    fn unlink(&mut self, path: &str) -> Result<(), FsError>;

    /// Returns name/size/mtime/atime/ctime for `path`.
    fn stat(&mut self, path: &str) -> Result<FileStat, FsError>;

    /// Joins `path` and `more` using this filesystem's path separator.
    fn join(&self, path: &str, more: &str) -> String;

    /// Returns the parent directory of `path`.
    fn dirname(&self, path: &str) -> String;

    /// Returns `path` expressed relative to `start`.
    fn relpath(&self, path: &str, start: &str) -> String;

    /// Creates `path` and any missing parents; a no-op if it already exists.
    fn mkdir(&mut self, path: &str) -> Result<(), FsError>;

    /// Returns every regular file under the managed base folder.
    fn rglob_files(&mut self) -> Result<Vec<String>, FsError>;

    /// Removes every directory under `base_folder` left with no files or
    /// subdirectories, deepest first.
    fn remove_empty_folders(&mut self, base_folder: &str) -> Result<(), FsError>;

    /// Sets the access and modification times of `path`.
    fn utime(&mut self, path: &str, atime: f64, mtime: f64) -> Result<(), FsError>;

    /// Best-effort attempt to set the creation time of `path`. Failures
    /// (including "not supported on this filesystem") are swallowed; callers
    /// never branch on this succeeding.
    fn ctime(&mut self, path: &str, time: Option<f64>);

    /// Opens `path` for streamed reading.
    fn open_read(&mut self, path: &str) -> Result<Box<dyn ReadStream>, FsError>;

    /// Opens `path` for streamed writing, truncating any existing content.
    fn open_write(&mut self, path: &str) -> Result<Box<dyn WriteStream>, FsError>;

    /// Best-effort attempt to mark `path` hidden, on platforms that expose
    /// such a bit. Failures are swallowed the same way [`ctime`](Self::ctime)
    /// failures are: callers never branch on this succeeding.
    fn set_hidden(&mut self, path: &str);

    /// The absolute path of the managed base folder.
    fn base_folder(&self) -> &str;
}
