use std::fs::File;
use std::io::{self, Read, Write};
use std::process::Child;

use crate::error::FsError;

/// A handle returned by [`FileSystem::open_read`](crate::FileSystem::open_read).
///
/// A blanket marker over [`Read`] so `Box<dyn ReadStream>` can name any
/// backend's concrete reader without each one opting in explicitly.
pub trait ReadStream: Read {}
impl<T: Read> ReadStream for T {}

/// A handle returned by [`FileSystem::open_write`](crate::FileSystem::open_write).
///
/// Implements [`Write`] for streaming bytes, plus a consuming [`finish`]
/// that surfaces errors the destructor could not (a remote shell exiting
/// non-zero, for instance). Callers must call `finish` once the last byte
/// has been written; simply dropping the handle best-effort closes the
/// underlying resource but swallows any failure.
///
/// [`finish`]: WriteStream::finish
pub trait WriteStream: Write {
    /// Finalizes the write, surfacing any error the backend only detects on
    /// close (a non-zero remote shell exit status, for example).
    fn finish(self: Box<Self>) -> Result<(), FsError>;
}

/// A plain local file opened for writing.
pub struct LocalWriteStream(pub(crate) File);

impl Write for LocalWriteStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl WriteStream for LocalWriteStream {
    fn finish(self: Box<Self>) -> Result<(), FsError> {
        self.0.sync_all()?;
        Ok(())
    }
}

/// A local file opened for reading.
pub struct LocalReadStream(pub(crate) File);

impl Read for LocalReadStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

/// A remote read stream backed by a `ssh host "cat path"` child process.
///
/// Bytes are read from the child's stdout as they arrive; the child is
/// reaped when the stream is dropped.
pub struct RemoteReadStream {
    child: Child,
}

impl RemoteReadStream {
    pub(crate) fn new(child: Child) -> Self {
        Self { child }
    }
}

impl Read for RemoteReadStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.child
            .stdout
            .as_mut()
            .expect("remote read child spawned with piped stdout")
            .read(buf)
    }
}

impl Drop for RemoteReadStream {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// A remote write stream backed by a `ssh host "cat > path"` child process.
///
/// Bytes are written to the child's stdin; [`WriteStream::finish`] closes
/// stdin and waits for the remote shell to exit, surfacing a non-zero exit
/// status as [`FsError::RemoteCommand`].
pub struct RemoteWriteStream {
    child: Child,
    command: String,
}

impl RemoteWriteStream {
    pub(crate) fn new(child: Child, command: String) -> Self {
        Self { child, command }
    }
}

impl Write for RemoteWriteStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.child
            .stdin
            .as_mut()
            .expect("remote write child spawned with piped stdin")
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.child
            .stdin
            .as_mut()
            .expect("remote write child spawned with piped stdin")
            .flush()
    }
}

impl WriteStream for RemoteWriteStream {
    fn finish(mut self: Box<Self>) -> Result<(), FsError> {
        drop(self.child.stdin.take());
        let status = self.child.wait()?;
        if status.success() {
            Ok(())
        } else {
            Err(FsError::RemoteCommand {
                command: self.command.clone(),
                status: status.code().unwrap_or(-1),
            })
        }
    }
}

impl Drop for RemoteWriteStream {
    fn drop(&mut self) {
        drop(self.child.stdin.take());
        let _ = self.child.wait();
    }
}
