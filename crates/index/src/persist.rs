use std::collections::HashMap;
use std::io::{Read, Write};

use flate2::write::GzEncoder;
use flate2::read::GzDecoder;
use flate2::Compression;
use fs::FileSystem;
use model::IndexRow;
use tracing::warn;

/// Fixed file name of the persisted index within the managed base folder.
pub const INDEX_FILE_NAME: &str = ".iku_index";

/// Loads the persisted index from `index_path`, if one exists.
///
/// Tolerant of corruption: any decompression, CSV, or I/O failure causes the
/// index to be treated as empty and the offending file unlinked, rather than
/// surfacing an error to the caller. A missing file is simply an empty
/// index, not a failure.
pub fn load(fs: &mut dyn FileSystem, index_path: &str) -> HashMap<String, IndexRow> {
    if !fs.isfile(index_path) {
        return HashMap::new();
    }

    match try_load(fs, index_path) {
        Ok(index) => index,
        Err(err) => {
            warn!(path = index_path, error = %err, "discarding corrupt index");
            let _ = fs.unlink(index_path);
            HashMap::new()
        }
    }
}

fn try_load(fs: &mut dyn FileSystem, index_path: &str) -> Result<HashMap<String, IndexRow>, String> {
    let reader = fs.open_read(index_path).map_err(|err| err.to_string())?;
    let decoder = GzDecoder::new(reader);
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(false)
        .from_reader(decoder);

    let mut index = HashMap::new();
    for record in csv_reader.records() {
        let record = record.map_err(|err| err.to_string())?;
        if record.len() != 4 {
            return Err(format!("expected 4 columns, found {}", record.len()));
        }
        let path = record.get(0).ok_or("missing path column")?.to_string();
        let file_hash = record.get(1).ok_or("missing hash column")?.to_string();
        let last_modified: f64 = record
            .get(2)
            .ok_or("missing mtime column")?
            .parse()
            .map_err(|_| "malformed mtime column".to_string())?;
        let size: u64 = record
            .get(3)
            .ok_or("missing size column")?
            .parse()
            .map_err(|_| "malformed size column".to_string())?;
        index.insert(path, IndexRow::new(file_hash, last_modified, size));
    }
    Ok(index)
}

/// Writes `index` to `index_path` as a gzipped, unquoted-unless-necessary CSV
/// file, then best-effort marks it hidden.
///
/// The previous file at `index_path`, if any, is unlinked first so the write
/// never appends to stale content.
pub fn save(
    fs: &mut dyn FileSystem,
    index_path: &str,
    index: &HashMap<String, IndexRow>,
) -> Result<(), fs::FsError> {
    if fs.isfile(index_path) {
        fs.unlink(index_path)?;
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut encoder);
        for (path, row) in index {
            csv_writer
                .write_record([path.as_str(), &row.file_hash, &row.last_modified.to_string(), &row.size.to_string()])
                .map_err(|err| fs::FsError::Io(std::io::Error::other(err.to_string())))?;
        }
        csv_writer
            .flush()
            .map_err(|err| fs::FsError::Io(std::io::Error::other(err.to_string())))?;
    }
    let compressed = encoder
        .finish()
        .map_err(|err| fs::FsError::Io(std::io::Error::other(err.to_string())))?;

    let mut writer = fs.open_write(index_path)?;
    writer.write_all(&compressed)?;
    writer.finish()?;

    fs.set_hidden(index_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fs::LocalFileSystem;
    use std::fs as stdfs;

    #[test]
    fn save_then_load_round_trips_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut backend = LocalFileSystem::new(dir.path().to_string_lossy().into_owned());
        let index_path = dir.path().join(INDEX_FILE_NAME).to_string_lossy().into_owned();

        let mut index = HashMap::new();
        index.insert("a.jpg".to_string(), IndexRow::new("abc123", 1000.5, 100));
        index.insert("sub/b,c.jpg".to_string(), IndexRow::new("def456", 2000.0, 200));

        save(&mut backend, &index_path, &index).expect("save");
        let loaded = load(&mut backend, &index_path);

        assert_eq!(loaded, index);
    }

    #[test]
    fn load_of_missing_file_is_an_empty_index() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut backend = LocalFileSystem::new(dir.path().to_string_lossy().into_owned());
        let index_path = dir.path().join(INDEX_FILE_NAME).to_string_lossy().into_owned();

        assert!(load(&mut backend, &index_path).is_empty());
    }

    #[test]
    fn load_of_corrupt_file_returns_empty_and_unlinks_it() {
        let dir = tempfile::tempdir().expect("tempdir");
        let index_path = dir.path().join(INDEX_FILE_NAME);
        stdfs::write(&index_path, b"not actually gzip data").expect("write garbage");

        let mut backend = LocalFileSystem::new(dir.path().to_string_lossy().into_owned());
        let index_path_str = index_path.to_string_lossy().into_owned();

        let loaded = load(&mut backend, &index_path_str);
        assert!(loaded.is_empty());
        assert!(!index_path.exists());
    }
}
