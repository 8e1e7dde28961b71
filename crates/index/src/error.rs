use fs::FsError;
use interrupt::Interrupted;
use thiserror::Error;

/// Errors raised by [`Indexer`](crate::Indexer) operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A lookup, update, or removal was requested for a relative path the
    /// index does not currently manage.
    #[error("not managed by index: {0}")]
    NotManaged(String),

    /// The underlying filesystem capability failed.
    #[error(transparent)]
    Fs(#[from] FsError),
}

/// Errors raised by [`Indexer::reindex`](crate::Indexer::reindex).
///
/// Kept distinct from [`IndexError`] because a reindex pass can also be cut
/// short by an interrupt, which carries the partial file count rather than a
/// plain error message.
#[derive(Debug, Error)]
pub enum ReindexError {
    /// The pass was interrupted; the payload is the number of files indexed
    /// before the interrupt was observed.
    #[error("reindex interrupted: {0}")]
    Interrupted(#[source] Interrupted<u64>),

    /// A filesystem or index operation failed outright.
    #[error(transparent)]
    Fs(#[from] IndexError),
}

impl From<FsError> for ReindexError {
    fn from(err: FsError) -> Self {
        ReindexError::Fs(IndexError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_managed_renders_the_offending_path() {
        let err = IndexError::NotManaged("a/b.jpg".to_string());
        assert!(err.to_string().contains("a/b.jpg"));
    }

    #[test]
    fn reindex_error_wraps_fs_error_via_from() {
        let err: ReindexError = FsError::NotAFile("a.jpg".to_string()).into();
        assert!(matches!(err, ReindexError::Fs(IndexError::Fs(_))));
    }
}
