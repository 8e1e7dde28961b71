#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! A *source* is the read-only side of a synchronization run: something that
//! enumerates a fixed set of objects and hands back a streamed, restartable
//! byte reader for each one. The device enumeration layer that talks to a
//! phone's camera storage lives outside this crate; what lives here is the
//! [`SourceFile`] handle contract every such layer must satisfy, plus
//! [`FsSource`], a filesystem-backed implementation used for local-to-local
//! and local-to-remote runs and exercised directly by the synchronizer's own
//! test suite in place of a real device enumeration backend.
//!
//! # Design
//!
//! [`SourceFile`] exposes a restartable byte stream
//! ([`SourceFile::read_chunk`]), a [`SourceFile::reset_seek`] that rewinds the
//! logical cursor, and a [`SourceFile::reopen`] that re-establishes the
//! underlying stream for backends that cannot seek after a failed read. Its
//! boolean return drives the synchronizer's retry policy rather than
//! propagating a second error type.
//!
//! [`Source`] is the enumeration capability: `list_files` yields `SourceFile`
//! handles in a fixed order, `count_files` reports an exact total used for
//! progress pacing.

mod error;
mod fs_source;
mod handle;

pub use error::SourceError;
pub use fs_source::FsSource;
pub use handle::SourceFile;

/// Enumeration capability exposed by a read-only object store.
///
/// Implementors yield [`SourceFile`] handles in the order the synchronizer
/// will copy them in; destination writes happen strictly in that order.
pub trait Source {
    /// Concrete handle type yielded by [`list_files`](Self::list_files).
    type File: SourceFile;

    /// Returns every object as a streamed, restartable handle.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the underlying enumeration fails (e.g. the
    /// device disconnected before the listing completed).
    fn list_files(&mut self) -> Result<Vec<Self::File>, SourceError>;

    /// Returns the exact number of objects [`list_files`](Self::list_files)
    /// would yield, used to size progress bars ahead of the copy loop.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] under the same conditions as
    /// [`list_files`](Self::list_files).
    fn count_files(&mut self) -> Result<usize, SourceError>;
}
