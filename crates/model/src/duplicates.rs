/// Grouping strategy for `Indexer::find_duplicates`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateMode {
    /// Group by `file_hash` alone: two files with identical bytes are
    /// duplicates even if one was copied at a different time or currently
    /// reports a different size on a filesystem with sparse support.
    Content,
    /// Group by `(file_hash, last_modified, size)`: only files that are
    /// byte-identical *and* share the same recorded timestamp and size are
    /// considered duplicates.
    Strict,
}
