/// Which of the three diff sequences a relative path was appended to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    /// The path was not previously managed.
    Added,
    /// The path was previously managed with a different row.
    Modified,
    /// The path is no longer managed.
    Removed,
}

/// The accumulated set of changes to the index since the last `commit`.
///
/// Entries are appended in observation order within each sequence; nothing is
/// ever removed except by [`Diff::revert_last`] (used to undo a single staged
/// mutation) or by clearing the whole diff on commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    added: Vec<String>,
    modified: Vec<String>,
    removed: Vec<String>,
}

impl Diff {
    /// Creates a diff with all three sequences empty.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff none of the three sequences have any entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    /// Appends `relative_path` to the sequence named by `kind`.
    pub fn push(&mut self, kind: DiffKind, relative_path: impl Into<String>) {
        let relative_path = relative_path.into();
        match kind {
            DiffKind::Added => self.added.push(relative_path),
            DiffKind::Modified => self.modified.push(relative_path),
            DiffKind::Removed => self.removed.push(relative_path),
        }
    }

    /// Removes the most recent occurrence of `relative_path` from the sequence
    /// named by `kind`. Used to cancel the diff entry a staged write
    /// contributed when that write is reverted.
    ///
    /// Relies on the invariant that a staging region performs at most one
    /// `push` per region, so there is at most one matching entry to remove,
    /// and it is always the last one pushed.
    pub fn revert_last(&mut self, kind: DiffKind, relative_path: &str) {
        let sequence = match kind {
            DiffKind::Added => &mut self.added,
            DiffKind::Modified => &mut self.modified,
            DiffKind::Removed => &mut self.removed,
        };
        if let Some(position) = sequence.iter().rposition(|entry| entry == relative_path) {
            sequence.remove(position);
        }
    }

    /// The relative paths added since the last commit.
    #[must_use]
    pub fn added(&self) -> &[String] {
        &self.added
    }

    /// The relative paths modified since the last commit.
    #[must_use]
    pub fn modified(&self) -> &[String] {
        &self.modified
    }

    /// The relative paths removed since the last commit.
    #[must_use]
    pub fn removed(&self) -> &[String] {
        &self.removed
    }
}
