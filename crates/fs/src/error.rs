use std::io;

use thiserror::Error;

/// Errors raised by a [`FileSystem`](crate::FileSystem) implementation.
#[derive(Debug, Error)]
pub enum FsError {
    /// The underlying local or remote I/O call failed.
    #[error("I/O error: {0}")]
    Io(
        #[from]
        #[source]
        io::Error,
    ),
    /// An operation that requires an existing regular file was given a path
    /// the filesystem does not consider one (missing, or a directory).
    #[error("not a managed file: {0}")]
    NotAFile(String),
    /// A remote shell command exited with a non-zero status.
    #[error("remote command exited with status {status}: {command}")]
    RemoteCommand {
        /// The command line that was executed.
        command: String,
        /// The exit status reported by the remote shell, or -1 if unknown.
        status: i32,
    },
    /// The requested remote base folder does not exist or is not a directory.
    #[error("remote base folder not found: {0}")]
    BaseFolderNotFound(String),
}
