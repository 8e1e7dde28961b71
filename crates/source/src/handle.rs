use crate::error::SourceError;

/// A streamed, restartable handle to a single source object.
///
/// The synchronizer drives a handle through one of two paths per retry
/// attempt: either the happy path (`reset_seek` then drain `read_chunk` to
/// exhaustion), or, on a stream failure, `reopen` followed by another
/// `reset_seek`/drain attempt. A handle that cannot seek after a failed read
/// should make `reopen` re-establish the underlying stream from scratch
/// rather than implementing seeking at all.
pub trait SourceFile {
    /// Path of this object relative to the source root, forward-slash
    /// normalized, used as the destination join target and the index key.
    fn relative_path(&self) -> &str;

    /// Exact byte length as reported by the source.
    fn size(&self) -> u64;

    /// Seconds since the Unix epoch, last content modification.
    fn last_modified(&self) -> f64;

    /// Seconds since the Unix epoch, creation time.
    fn created_time(&self) -> f64;

    /// Seconds since the Unix epoch, last access.
    fn last_accessed(&self) -> f64;

    /// Reads the next chunk of up to `buffer_size` bytes, or `None` once the
    /// stream is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::StreamRead`] if the backend fails mid-stream.
    fn read_chunk(&mut self, buffer_size: usize) -> Result<Option<Vec<u8>>, SourceError>;

    /// Positions the logical read cursor at zero so a subsequent drain of
    /// [`read_chunk`](Self::read_chunk) reads the object from the start.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::StreamSeek`] if the backend cannot rewind.
    fn reset_seek(&mut self) -> Result<(), SourceError>;

    /// Attempts to re-establish the underlying stream from scratch.
    ///
    /// Returns `true` on success, driving the synchronizer's decision to
    /// retry the write attempt; `false` means the object is no longer
    /// reachable and the attempt should not be retried.
    fn reopen(&mut self) -> bool;
}
