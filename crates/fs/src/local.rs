use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use filetime::FileTime;

use crate::error::FsError;
use crate::stat::FileStat;
use crate::stream::{LocalReadStream, LocalWriteStream, ReadStream, WriteStream};
use crate::FileSystem;

fn system_time_to_f64(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_secs_f64(),
        Err(err) => -err.duration().as_secs_f64(),
    }
}

/// Direct-OS-call filesystem backend rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    base_folder: String,
}

impl LocalFileSystem {
    /// Creates a filesystem rooted at `base_folder`. The folder is not
    /// required to exist yet; callers typically `mkdir` it immediately
    /// after construction.
    #[must_use]
    pub fn new(base_folder: impl Into<String>) -> Self {
        Self {
            base_folder: base_folder.into(),
        }
    }
}

impl FileSystem for LocalFileSystem {
    fn isfile(&mut self, path: &str) -> bool {
        Path::new(path).is_file()
    }

    fn rename(&mut self, src: &str, dst: &str) -> Result<(), FsError> {
        fs::rename(src, dst)?;
        Ok(())
    }

    fn unlink(&mut self, path: &str) -> Result<(), FsError> {
        fs::remove_file(path)?;
        Ok(())
    }

    fn stat(&mut self, path: &str) -> Result<FileStat, FsError> {
        let metadata = fs::metadata(path)?;
        let name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let created_time = metadata.created().ok().map(system_time_to_f64);
        Ok(FileStat {
            name,
            size: metadata.len(),
            last_modified: system_time_to_f64(metadata.modified()?),
            last_accessed: system_time_to_f64(metadata.accessed()?),
            created_time,
        })
    }

    fn join(&self, path: &str, more: &str) -> String {
        Path::new(path).join(more).to_string_lossy().into_owned()
    }

    fn dirname(&self, path: &str) -> String {
        Path::new(path)
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn relpath(&self, path: &str, start: &str) -> String {
        pathdiff(Path::new(path), Path::new(start))
    }

    fn mkdir(&mut self, path: &str) -> Result<(), FsError> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn rglob_files(&mut self) -> Result<Vec<String>, FsError> {
        let mut files = Vec::new();
        for entry in jwalk::WalkDir::new(&self.base_folder) {
            let entry = entry.map_err(|err| {
                FsError::Io(std::io::Error::other(err.to_string()))
            })?;
            if entry.file_type().is_file() {
                files.push(entry.path().to_string_lossy().into_owned());
            }
        }
        Ok(files)
    }

    fn remove_empty_folders(&mut self, base_folder: &str) -> Result<(), FsError> {
        remove_empty_folders_recursive(Path::new(base_folder))?;
        Ok(())
    }

    fn utime(&mut self, path: &str, atime: f64, mtime: f64) -> Result<(), FsError> {
        filetime::set_file_times(
            path,
            FileTime::from_unix_time(atime.trunc() as i64, 0),
            FileTime::from_unix_time(mtime.trunc() as i64, 0),
        )?;
        Ok(())
    }

    fn ctime(&mut self, _path: &str, _time: Option<f64>) {
        // No portable way to set file creation time from stable std or
        // filetime; the capability set allows this to be a silent no-op.
    }

    fn set_hidden(&mut self, path: &str) {
        set_hidden_best_effort(path);
    }

    fn open_read(&mut self, path: &str) -> Result<Box<dyn ReadStream>, FsError> {
        Ok(Box::new(LocalReadStream(File::open(path)?)))
    }

    fn open_write(&mut self, path: &str) -> Result<Box<dyn WriteStream>, FsError> {
        Ok(Box::new(LocalWriteStream(File::create(path)?)))
    }

    fn base_folder(&self) -> &str {
        &self.base_folder
    }
}

/// Returns `dirs::is_empty` style recursive removal of empty directories,
/// deepest first, mirroring `os.walk` + `rmdir` on every directory that
/// ends up with neither files nor subdirectories.
fn remove_empty_folders_recursive(dir: &Path) -> std::io::Result<bool> {
    if !dir.is_dir() {
        return Ok(false);
    }

    let mut has_children = false;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            if remove_empty_folders_recursive(&path)? {
                has_children = true;
            }
        } else {
            has_children = true;
        }
    }

    if has_children {
        Ok(true)
    } else {
        fs::remove_dir(dir)?;
        Ok(false)
    }
}

#[cfg(windows)]
fn set_hidden_best_effort(path: &str) {
    use std::os::windows::ffi::OsStrExt;
    use windows::Win32::Storage::FileSystem::{
        FILE_ATTRIBUTE_HIDDEN, GetFileAttributesW, SetFileAttributesW,
    };
    use windows::core::PCWSTR;

    let wide: Vec<u16> = std::ffi::OsStr::new(path)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();
    let pcwstr = PCWSTR(wide.as_ptr());
    // Safety: `wide` is a valid NUL-terminated UTF-16 buffer kept alive for
    // the duration of both calls; failures are ignored per this method's
    // best-effort contract.
    unsafe {
        let attrs = GetFileAttributesW(pcwstr);
        if attrs != u32::MAX {
            let _ = SetFileAttributesW(pcwstr, windows::Win32::Storage::FileSystem::FILE_FLAGS_AND_ATTRIBUTES(attrs | FILE_ATTRIBUTE_HIDDEN.0));
        }
    }
}

#[cfg(not(windows))]
fn set_hidden_best_effort(_path: &str) {
    // Mainstream Unix filesystems (ext4, APFS, etc.) have no hidden-file bit;
    // the leading dot in `.iku_index` is the platform convention there.
}

fn pathdiff(path: &Path, start: &Path) -> String {
    let path_components: Vec<_> = path.components().collect();
    let start_components: Vec<_> = start.components().collect();

    let common = path_components
        .iter()
        .zip(start_components.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut result = PathBuf::new();
    for _ in common..start_components.len() {
        result.push("..");
    }
    for component in &path_components[common..] {
        result.push(component.as_os_str());
    }

    if result.as_os_str().is_empty() {
        ".".to_string()
    } else {
        result.to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write as _};
    use tempfile::tempdir;

    #[test]
    fn isfile_distinguishes_files_from_directories_and_missing_paths() {
        let dir = tempdir().expect("tempdir");
        let file_path = dir.path().join("a.txt");
        fs::write(&file_path, b"hi").expect("write");

        let mut fs_impl = LocalFileSystem::new(dir.path().to_string_lossy().into_owned());
        assert!(fs_impl.isfile(&file_path.to_string_lossy()));
        assert!(!fs_impl.isfile(&dir.path().to_string_lossy()));
        assert!(!fs_impl.isfile(&dir.path().join("missing").to_string_lossy()));
    }

    #[test]
    fn write_then_read_round_trips_bytes() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("a.bin");
        let mut fs_impl = LocalFileSystem::new(dir.path().to_string_lossy().into_owned());

        let mut writer = fs_impl.open_write(&path.to_string_lossy()).expect("open_write");
        writer.write_all(b"hello world").expect("write_all");
        writer.finish().expect("finish");

        let mut reader = fs_impl.open_read(&path.to_string_lossy()).expect("open_read");
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).expect("read_to_end");
        assert_eq!(buf, b"hello world");
    }

    #[test]
    fn rglob_files_finds_nested_regular_files_only() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("sub")).expect("mkdir");
        fs::write(dir.path().join("a.txt"), b"a").expect("write");
        fs::write(dir.path().join("sub/b.txt"), b"b").expect("write");

        let mut fs_impl = LocalFileSystem::new(dir.path().to_string_lossy().into_owned());
        let mut files = fs_impl.rglob_files().expect("rglob_files");
        files.sort();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn remove_empty_folders_deletes_only_folders_with_no_descendants() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("empty")).expect("mkdir");
        fs::create_dir_all(dir.path().join("has_file")).expect("mkdir");
        fs::write(dir.path().join("has_file/x.txt"), b"x").expect("write");

        let mut fs_impl = LocalFileSystem::new(dir.path().to_string_lossy().into_owned());
        fs_impl
            .remove_empty_folders(&dir.path().to_string_lossy())
            .expect("remove_empty_folders");

        assert!(!dir.path().join("empty").exists());
        assert!(dir.path().join("has_file").exists());
    }

    #[test]
    fn relpath_strips_the_shared_prefix() {
        let fs_impl = LocalFileSystem::new("/base".to_string());
        assert_eq!(fs_impl.relpath("/base/sub/a.jpg", "/base"), "sub/a.jpg");
    }
}
