#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! The persistent manifest of every file a destination folder's synchronizer
//! considers managed: a gzipped CSV mapping each relative path to its
//! recorded MD5, mtime, and size, plus the backup-rename protocol that keeps
//! a write crash-safe and the diff bookkeeping a run reports back.
//!
//! - [`Indexer`] owns the in-memory manifest and every operation on it
//!   ([`Indexer::get`], [`Indexer::update`], [`Indexer::destroy`],
//!   [`Indexer::reindex`], [`Indexer::find_duplicates`]).
//! - [`Indexer::stage`] opens a [`StagingRegion`], the RAII guard around a
//!   single in-progress write: rename the existing file aside, write the new
//!   content, then [`StagingRegion::finish`] or [`StagingRegion::revert`].
//! - [`INDEX_FILE_NAME`] names the manifest file within a managed base
//!   folder, for callers that need to recognize or exclude it directly.
//!
//! # Design
//!
//! Every method that touches disk takes `fs: &mut dyn FileSystem` rather
//! than the `Indexer` owning a filesystem instance. A
//! [`RemoteFileSystem`](fs::RemoteFileSystem) caches its directory listing;
//! if the indexer held a second instance pointed at the same host, the two
//! caches could drift out of sync the moment one of them wrote a file the
//! other didn't know to invalidate. Sharing one instance, owned by whichever
//! caller (typically a synchronizer) drives both the file copy and the
//! index update, makes that class of bug impossible rather than merely
//! unlikely.

mod error;
mod persist;
mod staging;
mod store;

pub use error::{IndexError, ReindexError};
pub use persist::INDEX_FILE_NAME;
pub use staging::StagingRegion;
pub use store::Indexer;
