use std::collections::HashMap;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::FsError;
use crate::stat::FileStat;
use crate::stream::{ReadStream, RemoteReadStream, RemoteWriteStream, WriteStream};
use crate::FileSystem;

/// Wraps `value` in single quotes for safe interpolation into a shell
/// command line, escaping any embedded single quote.
///
/// Every command this module builds goes through this function rather than
/// raw string interpolation; a path containing `; rm -rf /` must stay inert.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// SSH-backed filesystem backend.
///
/// Every operation shells out to the system `ssh` binary rather than
/// embedding an SSH client library, mirroring how a local `rsync`-style tool
/// delegates transport to the user's configured `ssh`. The remote directory
/// listing is cached on first use and refreshed incrementally, so
/// `isfile`/`stat`/`rglob_files` do not each pay a round trip.
pub struct RemoteFileSystem {
    ssh_program: String,
    host: String,
    base_folder: String,
    cache: Option<HashMap<String, FileStat>>,
}

impl RemoteFileSystem {
    /// Connects to `host` (an SSH destination, e.g. `user@example.com`) and
    /// resolves `base_folder` to its canonical absolute path.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::BaseFolderNotFound`] if the remote `realpath`
    /// lookup fails or the path does not exist, and [`FsError::Io`] if the
    /// `ssh` binary cannot be spawned.
    pub fn connect(host: impl Into<String>, base_folder: impl Into<String>) -> Result<Self, FsError> {
        Self::connect_with_program("ssh", host, base_folder)
    }

    /// Like [`connect`](Self::connect), but spawning `ssh_program` instead of
    /// the `ssh` binary on `PATH`. Exists so tests can substitute a stub
    /// executable instead of a real SSH connection.
    pub fn connect_with_program(
        ssh_program: impl Into<String>,
        host: impl Into<String>,
        base_folder: impl Into<String>,
    ) -> Result<Self, FsError> {
        let ssh_program = ssh_program.into();
        let host = host.into();
        let requested = base_folder.into();

        let probe = Self {
            ssh_program,
            host,
            base_folder: String::new(),
            cache: None,
        };

        let lines = probe.exec_command(&format!("realpath {}", shell_quote(&requested)))?;
        let resolved = lines
            .first()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .ok_or_else(|| FsError::BaseFolderNotFound(requested.clone()))?;

        Ok(Self {
            base_folder: resolved,
            ..probe
        })
    }

    fn exec_command(&self, command: &str) -> Result<Vec<String>, FsError> {
        debug!(host = %self.host, command, "executing remote command");
        let output = Command::new(&self.ssh_program)
            .arg(&self.host)
            .arg(command)
            .output()?;

        if !output.status.success() {
            return Err(FsError::RemoteCommand {
                command: command.to_string(),
                status: output.status.code().unwrap_or(-1),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect())
    }

    fn build_cache_if_needed(&mut self) -> Result<(), FsError> {
        if self.cache.is_none() {
            let mut cache = HashMap::new();
            let base_folder = self.base_folder.clone();
            self.scan_into(&mut cache, &base_folder)?;
            self.cache = Some(cache);
        }
        Ok(())
    }

    fn invalidate_cache(&mut self) {
        self.cache = None;
    }

    fn scan_into(&self, cache: &mut HashMap<String, FileStat>, target_path: &str) -> Result<(), FsError> {
        let command = format!(
            "find {} -type f -printf '%p|%s|%T@|%A@\\n'",
            shell_quote(target_path)
        );
        for line in self.exec_command(&command)? {
            let mut fields = line.splitn(4, '|');
            let (Some(path), Some(size), Some(mtime), Some(atime)) =
                (fields.next(), fields.next(), fields.next(), fields.next())
            else {
                continue;
            };
            let name = Path::new(path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            cache.insert(
                path.to_string(),
                FileStat {
                    name,
                    size: size.parse().unwrap_or(0),
                    last_modified: mtime.parse().unwrap_or(0.0),
                    last_accessed: atime.parse().unwrap_or(0.0),
                    created_time: None,
                },
            );
        }
        Ok(())
    }

    fn cached_stat(&mut self, path: &str) -> Option<FileStat> {
        self.cache.as_ref().and_then(|cache| cache.get(path).cloned())
    }
}

impl FileSystem for RemoteFileSystem {
    fn isfile(&mut self, path: &str) -> bool {
        if self.build_cache_if_needed().is_err() {
            return false;
        }
        self.cache
            .as_ref()
            .is_some_and(|cache| cache.contains_key(path))
    }

    fn rename(&mut self, src: &str, dst: &str) -> Result<(), FsError> {
        if !self.isfile(src) || self.isfile(dst) {
            return Err(FsError::NotAFile(src.to_string()));
        }
        self.exec_command(&format!(
            "mv {} {}",
            shell_quote(src),
            shell_quote(dst)
        ))?;
        if let Some(cache) = self.cache.as_mut() {
            if let Some(stat) = cache.remove(src) {
                cache.insert(dst.to_string(), stat);
            }
        }
        Ok(())
    }

    fn unlink(&mut self, path: &str) -> Result<(), FsError> {
        if !self.isfile(path) {
            return Err(FsError::NotAFile(path.to_string()));
        }
        self.exec_command(&format!("rm {}", shell_quote(path)))?;
        if let Some(cache) = self.cache.as_mut() {
            cache.remove(path);
        }
        Ok(())
    }

    fn stat(&mut self, path: &str) -> Result<FileStat, FsError> {
        if !self.isfile(path) {
            return Err(FsError::NotAFile(path.to_string()));
        }
        self.cached_stat(path).ok_or_else(|| FsError::NotAFile(path.to_string()))
    }

    fn join(&self, path: &str, more: &str) -> String {
        format!("{}/{}", path.trim_end_matches('/'), more.trim_start_matches('/'))
    }

    fn dirname(&self, path: &str) -> String {
        match path.rsplit_once('/') {
            Some((parent, _)) if !parent.is_empty() => parent.to_string(),
            Some(_) => "/".to_string(),
            None => String::new(),
        }
    }

    fn relpath(&self, path: &str, start: &str) -> String {
        path.strip_prefix(start)
            .map(|rest| rest.trim_start_matches('/').to_string())
            .unwrap_or_else(|| path.to_string())
    }

    fn mkdir(&mut self, path: &str) -> Result<(), FsError> {
        self.exec_command(&format!("mkdir -p {}", shell_quote(path)))?;
        Ok(())
    }

    fn rglob_files(&mut self) -> Result<Vec<String>, FsError> {
        self.build_cache_if_needed()?;
        Ok(self
            .cache
            .as_ref()
            .map(|cache| cache.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn remove_empty_folders(&mut self, base_folder: &str) -> Result<(), FsError> {
        self.exec_command(&format!(
            "find {} -depth -type d -empty -delete",
            shell_quote(base_folder)
        ))?;
        Ok(())
    }

    fn utime(&mut self, path: &str, atime: f64, mtime: f64) -> Result<(), FsError> {
        if !self.isfile(path) {
            return Err(FsError::NotAFile(path.to_string()));
        }
        self.exec_command(&format!(
            "touch -d @{mtime} {path_quoted} && touch -a -d @{atime} {path_quoted}",
            mtime = mtime as i64,
            atime = atime as i64,
            path_quoted = shell_quote(path),
        ))?;
        if let Some(cache) = self.cache.as_mut() {
            if let Some(stat) = cache.get_mut(path) {
                stat.last_modified = mtime;
                stat.last_accessed = atime;
            }
        }
        Ok(())
    }

    fn ctime(&mut self, _path: &str, _time: Option<f64>) {
        // No portable remote equivalent; consistent with the local backend.
    }

    fn set_hidden(&mut self, _path: &str) {
        // The remote shell has no notion of a hidden-file bit beyond the
        // leading-dot convention the index file name already uses.
    }

    fn open_read(&mut self, path: &str) -> Result<Box<dyn ReadStream>, FsError> {
        let command = format!("cat {}", shell_quote(path));
        let child = Command::new(&self.ssh_program)
            .arg(&self.host)
            .arg(&command)
            .stdout(Stdio::piped())
            .spawn()?;
        Ok(Box::new(RemoteReadStream::new(child)))
    }

    fn open_write(&mut self, path: &str) -> Result<Box<dyn WriteStream>, FsError> {
        let command = format!("cat > {}", shell_quote(path));
        let child = Command::new(&self.ssh_program)
            .arg(&self.host)
            .arg(&command)
            .stdin(Stdio::piped())
            .spawn()?;
        // The write invalidates whatever the cache believes about `path`;
        // rebuilt lazily on the next call that needs it.
        self.invalidate_cache();
        Ok(Box::new(RemoteWriteStream::new(child, command)))
    }

    fn base_folder(&self) -> &str {
        &self.base_folder
    }
}
