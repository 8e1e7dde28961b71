/// One row of the persisted index: the content fingerprint of a single
/// managed destination file.
///
/// Invariant (enforced by the `index` crate, not this type): for every row
/// `(path -> row)` there exists a regular file at `base_folder/path` with byte
/// length `row.size`, mtime `row.last_modified`, and MD5 `row.file_hash`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRow {
    /// Lowercase hex digest of the MD5 hash over the file's bytes.
    pub file_hash: String,
    /// Seconds since the Unix epoch, matching the on-disk mtime at the moment
    /// the row was recorded.
    pub last_modified: f64,
    /// Exact byte count of the file.
    pub size: u64,
}

impl IndexRow {
    /// Creates a new row from its three fields.
    #[must_use]
    pub fn new(file_hash: impl Into<String>, last_modified: f64, size: u64) -> Self {
        Self {
            file_hash: file_hash.into(),
            last_modified,
            size,
        }
    }

    /// Returns true if `last_modified` and `size` both match the given
    /// values; does not compare `file_hash`. Used by `Indexer::match_row`.
    #[must_use]
    pub fn matches_stat(&self, last_modified: f64, size: u64) -> bool {
        self.last_modified == last_modified && self.size == size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_stat_compares_mtime_and_size_only() {
        let row = IndexRow::new("abc123", 1000.0, 100);
        assert!(row.matches_stat(1000.0, 100));
        assert!(!row.matches_stat(1000.0, 101));
        assert!(!row.matches_stat(1001.0, 100));
    }

    #[test]
    fn equality_considers_all_fields() {
        let a = IndexRow::new("abc123", 1000.0, 100);
        let b = IndexRow::new("abc123", 1000.0, 100);
        let c = IndexRow::new("def456", 1000.0, 100);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
