use std::io;

use thiserror::Error;

/// Errors raised by a [`Source`](crate::Source) or [`SourceFile`](crate::SourceFile).
#[derive(Debug, Error)]
pub enum SourceError {
    /// The underlying stream failed mid-read. Mapped from any backend error
    /// encountered while [`SourceFile::read_chunk`](crate::SourceFile::read_chunk)
    /// is draining the object.
    #[error("source stream read failed: {0}")]
    StreamRead(#[source] io::Error),

    /// [`SourceFile::reset_seek`](crate::SourceFile::reset_seek) could not
    /// rewind the logical cursor to zero.
    #[error("source stream seek failed: {0}")]
    StreamSeek(#[source] io::Error),

    /// Enumerating the source's objects failed outright (not a per-file
    /// condition the retry policy can recover from).
    #[error("source enumeration failed: {0}")]
    Enumeration(#[source] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_render_their_underlying_io_error() {
        let err = SourceError::StreamRead(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        assert!(err.to_string().contains("gone"));
    }
}
