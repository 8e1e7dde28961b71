#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `checksums` provides the MD5 content digest used to fingerprint every file
//! the indexer manages.
//!
//! # Design
//!
//! [`strong`] exposes the streaming [`strong::Md5`] hasher behind the
//! [`strong::StrongDigest`] trait, so callers never depend on the concrete
//! hasher type. Streaming a file through it in fixed-size chunks (rather than
//! reading it whole) is the caller's job, since that requires the
//! [`FileSystem`](../fs/trait.FileSystem.html) abstraction this crate does not
//! depend on — see `index::Indexer::hash_file`.
//!
//! # Examples
//!
//! ```
//! use checksums::strong::{Md5, StrongDigest, to_hex};
//!
//! let mut md5 = Md5::new();
//! md5.update(b"hello");
//! let digest = md5.finalize();
//! assert_eq!(to_hex(&digest), "5d41402abc4b2a76b9719d911017c592");
//! ```

pub mod strong;
