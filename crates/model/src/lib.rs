#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `model` holds the plain data types shared across the synchronizer: the
//! persisted [`IndexRow`], the accumulated [`Diff`] of changes since the last
//! commit, the immutable [`Config`] assembled once at program entry, and the
//! result types ([`SyncDetails`], [`SyncResult`]) returned by a run.
//!
//! None of these types know how to read or write a filesystem; they are pure
//! value types so every other crate in the workspace can depend on them
//! without pulling in I/O.

mod config;
mod diff;
mod duplicates;
mod index_row;
mod result;

pub use config::{Config, DEFAULT_BUFFER_SIZE, DEFAULT_RETRIES};
pub use diff::{Diff, DiffKind};
pub use duplicates::DuplicateMode;
pub use index_row::IndexRow;
pub use result::{SyncDetails, SyncResult};
