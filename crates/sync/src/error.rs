use index::IndexError;
use interrupt::Interrupted;
use model::SyncResult;
use source::SourceError;
use thiserror::Error;

/// Errors raised by [`Synchronizer::synchronize`](crate::Synchronizer::synchronize).
///
/// Transient, per-file conditions (a hash mismatch, a dropped source stream,
/// a destination I/O hiccup) never surface here: the retry loop inside
/// [`Synchronizer`](crate::Synchronizer) absorbs them, and exhausting the
/// retry budget is reported through
/// [`SyncDetails::current_destination_path`](model::SyncDetails::current_destination_path)
/// rather than as an `Err`. Only conditions that end the run outright reach
/// this type.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The source's enumeration step failed outright (not a per-file
    /// condition the retry policy can recover from).
    #[error(transparent)]
    Source(#[from] SourceError),

    /// An index operation outside the per-file retry path failed (for
    /// example, the destination directory for a new file could not be
    /// created).
    #[error(transparent)]
    Index(#[from] IndexError),

    /// A `SIGINT` was observed between staging regions or between files.
    /// Carries the partial [`SyncResult`] accumulated so far; the index has
    /// already been committed to reflect it.
    #[error("synchronization interrupted: {0}")]
    Interrupted(#[source] Interrupted<SyncResult>),
}
