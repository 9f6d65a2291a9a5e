//! Deployment archive packaging.
//!
//! A function's source directory is zipped into a named temporary file. The
//! file lives exactly as long as the [`Archive`] value, so it is removed
//! whether the upload that uses it succeeds or fails.

use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Errors raised while building an archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Source directory '{}' does not exist", .0.display())]
    MissingSource(PathBuf),

    #[error("Source directory '{}' contains no files", .0.display())]
    EmptySource(PathBuf),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A zip archive backed by a temporary file.
#[derive(Debug)]
pub struct Archive {
    file: NamedTempFile,
    entries: Vec<String>,
}

impl Archive {
    /// Zips every file under `source_dir`, with paths relative to it, into a
    /// temporary file created in `archive_dir`.
    pub fn from_dir(source_dir: &Path, archive_dir: &Path) -> Result<Self, ArchiveError> {
        if !source_dir.is_dir() {
            return Err(ArchiveError::MissingSource(source_dir.to_path_buf()));
        }

        let mut files = Vec::new();
        collect_files(source_dir, &mut files)?;
        files.sort();
        if files.is_empty() {
            return Err(ArchiveError::EmptySource(source_dir.to_path_buf()));
        }

        let file = tempfile::Builder::new()
            .prefix("explorespeak-")
            .suffix(".zip")
            .tempfile_in(archive_dir)?;
        let mut zip = ZipWriter::new(file.reopen()?);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut entries = Vec::with_capacity(files.len());
        for path in &files {
            let name = entry_name(source_dir, path);
            zip.start_file(name.as_str(), options)?;
            zip.write_all(&fs::read(path)?)?;
            entries.push(name);
        }
        zip.finish()?;

        tracing::debug!(
            source = %source_dir.display(),
            files = entries.len(),
            archive = %file.path().display(),
            "Built deployment archive"
        );

        Ok(Self { file, entries })
    }

    /// Location of the temporary archive on disk.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Entry names, relative to the source directory, `/`-separated.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Reads the full archive into memory for upload.
    pub fn bytes(&self) -> Result<Vec<u8>, ArchiveError> {
        let mut file = self.file.reopen()?;
        file.seek(SeekFrom::Start(0))?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        Ok(buffer)
    }
}

/// Walks `dir` without following directory symlinks. Symlinked files are
/// archived with their target's contents.
fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();
        if file_type.is_dir() {
            collect_files(&path, files)?;
        } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
            files.push(path);
        } else if file_type.is_symlink() {
            tracing::debug!(path = %path.display(), "Skipping symlinked directory");
        }
    }
    Ok(())
}

fn entry_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn source_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.js"), "exports.handler = async () => ({});").unwrap();
        fs::create_dir_all(dir.path().join("lib/srs")).unwrap();
        fs::write(dir.path().join("lib/srs/schedule.js"), "module.exports = {};").unwrap();
        dir
    }

    #[test]
    fn test_archive_contains_relative_entries() {
        let dir = source_tree();

        let archive = Archive::from_dir(dir.path(), &std::env::temp_dir()).unwrap();

        assert_eq!(
            archive.entries(),
            &["index.js".to_string(), "lib/srs/schedule.js".to_string()]
        );
    }

    #[test]
    fn test_archive_bytes_are_a_readable_zip() {
        let dir = source_tree();
        let archive = Archive::from_dir(dir.path(), &std::env::temp_dir()).unwrap();

        let bytes = archive.bytes().unwrap();
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();

        assert_eq!(zip.len(), 2);
        let mut contents = String::new();
        zip.by_name("index.js")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "exports.handler = async () => ({});");
    }

    #[test]
    fn test_archive_file_is_removed_on_drop() {
        let dir = source_tree();
        let archive = Archive::from_dir(dir.path(), &std::env::temp_dir()).unwrap();
        let path = archive.path().to_path_buf();
        assert!(path.exists());

        drop(archive);

        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directories_are_not_followed() {
        let source = source_tree();
        let archives = TempDir::new().unwrap();
        std::os::unix::fs::symlink(source.path(), source.path().join("lib/loop")).unwrap();
        std::os::unix::fs::symlink(
            source.path().join("index.js"),
            source.path().join("alias.js"),
        )
        .unwrap();

        let archive = Archive::from_dir(source.path(), archives.path()).unwrap();

        assert!(archive.entries().contains(&"alias.js".to_string()));
        assert!(archive.entries().iter().all(|e| !e.starts_with("lib/loop")));
    }

    #[test]
    fn test_missing_source_dir_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");

        let err = Archive::from_dir(&missing, &std::env::temp_dir()).unwrap_err();

        assert!(matches!(err, ArchiveError::MissingSource(p) if p == missing));
    }

    #[test]
    fn test_empty_source_dir_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();

        let err = Archive::from_dir(dir.path(), &std::env::temp_dir()).unwrap_err();

        assert!(matches!(err, ArchiveError::EmptySource(_)));
    }
}
