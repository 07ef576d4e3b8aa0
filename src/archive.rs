use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use std::collections::HashSet;
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Entry name of the index document. Garmin devices only look for this
/// exact name.
pub const DOC_ENTRY: &str = "doc.kml";

/// Archive entry name for a tile image, keyed by the tile's grid index.
pub fn tile_entry_name(index: usize) -> String {
    format!("tiles/tile-{}.jpg", index)
}

#[derive(Debug)]
pub enum ArchiveError {
    AlreadyExists(PathBuf),
    DuplicateEntry(String),
    Io(std::io::Error),
    Zip(zip::result::ZipError),
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveError::AlreadyExists(path) => {
                write!(f, "Archive {} already exists", path.display())
            }
            ArchiveError::DuplicateEntry(name) => {
                write!(f, "Archive already contains an entry named {}", name)
            }
            ArchiveError::Io(e) => write!(f, "Archive I/O error: {}", e),
            ArchiveError::Zip(e) => write!(f, "Archive write error: {}", e),
        }
    }
}

impl std::error::Error for ArchiveError {}

impl From<std::io::Error> for ArchiveError {
    fn from(err: std::io::Error) -> ArchiveError {
        ArchiveError::Io(err)
    }
}

impl From<zip::result::ZipError> for ArchiveError {
    fn from(err: zip::result::ZipError) -> ArchiveError {
        ArchiveError::Zip(err)
    }
}

/// KMZ output container. Entries accumulate in a staging file next to the
/// final path; the staging file is renamed onto the final path only when
/// the archive is complete, so the destination never holds a partial
/// archive.
pub struct KmzArchive {
    writer: ZipWriter<File>,
    staging: PathBuf,
    path: PathBuf,
    entries: HashSet<String>,
}

impl KmzArchive {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            return Err(ArchiveError::AlreadyExists(path));
        }

        let mut staging = path.clone().into_os_string();
        staging.push(".partial");
        let staging = PathBuf::from(staging);

        let file = File::create(&staging)?;

        Ok(KmzArchive {
            writer: ZipWriter::new(file),
            staging,
            path,
            entries: HashSet::new(),
        })
    }

    fn start_entry(&mut self, name: &str, method: CompressionMethod) -> Result<(), ArchiveError> {
        if !self.entries.insert(name.to_string()) {
            return Err(ArchiveError::DuplicateEntry(name.to_string()));
        }

        let options = SimpleFileOptions::default().compression_method(method);
        self.writer.start_file(name, options)?;
        Ok(())
    }

    /// JPEG data is already compressed; store it as-is.
    pub fn write_image(&mut self, name: &str, data: &[u8]) -> Result<(), ArchiveError> {
        self.start_entry(name, CompressionMethod::Stored)?;
        self.writer.write_all(data)?;
        Ok(())
    }

    pub fn write_document(&mut self, name: &str, text: &str) -> Result<(), ArchiveError> {
        self.start_entry(name, CompressionMethod::Deflated)?;
        self.writer.write_all(text.as_bytes())?;
        Ok(())
    }

    /// Finish the zip and move it onto the final path.
    pub fn close(mut self) -> Result<(), ArchiveError> {
        self.writer.finish()?;
        fs::rename(&self.staging, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    #[test]
    fn test_entries_come_back_in_write_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.kmz");

        let mut archive = KmzArchive::create(&path).unwrap();
        archive
            .write_image(&tile_entry_name(0), b"jpeg-bytes-0")
            .unwrap();
        archive
            .write_image(&tile_entry_name(1), b"jpeg-bytes-1")
            .unwrap();
        archive.write_document(DOC_ENTRY, "<kml/>").unwrap();
        archive.close().unwrap();

        let mut zip = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let names: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, ["tiles/tile-0.jpg", "tiles/tile-1.jpg", "doc.kml"]);

        let mut doc = String::new();
        zip.by_name("doc.kml")
            .unwrap()
            .read_to_string(&mut doc)
            .unwrap();
        assert_eq!(doc, "<kml/>");

        let mut image = Vec::new();
        zip.by_name("tiles/tile-1.jpg")
            .unwrap()
            .read_to_end(&mut image)
            .unwrap();
        assert_eq!(image, b"jpeg-bytes-1");
    }

    #[test]
    fn test_create_refuses_existing_archive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.kmz");
        fs::write(&path, b"stale").unwrap();

        let result = KmzArchive::create(&path);
        assert!(matches!(result, Err(ArchiveError::AlreadyExists(_))));
    }

    #[test]
    fn test_duplicate_entry_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.kmz");

        let mut archive = KmzArchive::create(&path).unwrap();
        archive.write_image("tiles/tile-0.jpg", b"a").unwrap();
        let result = archive.write_image("tiles/tile-0.jpg", b"b");
        assert!(matches!(result, Err(ArchiveError::DuplicateEntry(_))));
    }

    #[test]
    fn test_final_path_appears_only_on_close() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.kmz");

        let mut archive = KmzArchive::create(&path).unwrap();
        archive.write_image("tiles/tile-0.jpg", b"a").unwrap();
        assert!(!path.exists());

        archive.close().unwrap();
        assert!(path.exists());
    }
}
