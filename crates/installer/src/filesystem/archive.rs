//! Zip archive-backed filesystem
//!
//! Entries are flat; directories are implied by entry name prefixes. Writes are
//! buffered in the handle and committed by rewriting the container into a
//! temporary file next to it, which then replaces the original. Other entries
//! are copied raw, without recompression.

use std::fmt;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::error::{FileOperation, FsError, Result};
use super::path::{archive_entry_name, normalize_package_path};
use super::{FileHandle, Filesystem, FilesystemKind, OpenMode};

/// Filesystem stored inside a single zip container
#[derive(Debug, Clone)]
pub struct ArchiveFs {
    path: PathBuf,
}

impl ArchiveFs {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let resolved = fs::canonicalize(path)
            .or_else(|_| std::path::absolute(path))
            .unwrap_or_else(|_| path.to_path_buf());

        Self { path: resolved }
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }

    fn open_archive(&self) -> Result<Option<ZipArchive<File>>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(FsError::io(self.display(), FileOperation::Read, e)),
        };

        // A zero-length container is treated as empty rather than corrupt
        let len = file
            .metadata()
            .map_err(|e| FsError::io(self.display(), FileOperation::Metadata, e))?
            .len();
        if len == 0 {
            return Ok(None);
        }

        ZipArchive::new(file)
            .map(Some)
            .map_err(|e| FsError::archive(self.display(), FileOperation::Read, e))
    }

    /// Names of every entry in the container
    pub fn entry_names(&self) -> Result<Vec<String>> {
        Ok(self
            .open_archive()?
            .map(|archive| archive.file_names().map(str::to_string).collect())
            .unwrap_or_default())
    }

    fn read_entry(&self, entry: &str, path: &str) -> Result<Vec<u8>> {
        let not_found = || FsError::NotFound {
            root: self.display(),
            path: normalize_package_path(path),
        };

        let mut archive = self.open_archive()?.ok_or_else(not_found)?;
        let mut file = match archive.by_name(entry) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Err(not_found()),
            Err(e) => return Err(FsError::archive(self.absolute_path(path), FileOperation::Read, e)),
        };

        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)
            .map_err(|e| FsError::io(self.absolute_path(path), FileOperation::Read, e))?;
        Ok(data)
    }

    /// Rewrite the container, dropping `skip` and optionally appending a replacement
    fn rewrite(&self, skip: &str, replacement: Option<&[u8]>) -> Result<()> {
        let archive_error = |e: ZipError| FsError::archive(self.display(), FileOperation::Write, e);
        let io_error = |e: std::io::Error| FsError::io(self.display(), FileOperation::Write, e);

        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(parent).map_err(io_error)?;

        {
            let mut writer = ZipWriter::new(temp.as_file_mut());

            if let Some(mut archive) = self.open_archive()? {
                for index in 0..archive.len() {
                    let entry = archive.by_index_raw(index).map_err(archive_error)?;
                    if entry.name() == skip {
                        continue;
                    }
                    writer.raw_copy_file(entry).map_err(archive_error)?;
                }
            }

            if let Some(data) = replacement {
                let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
                writer.start_file(skip, options).map_err(archive_error)?;
                writer.write_all(data).map_err(io_error)?;
            }

            writer.finish().map_err(archive_error)?;
        }

        temp.persist(&self.path).map_err(|e| io_error(e.error))?;
        Ok(())
    }

    /// Store a fully-buffered entry, replacing any existing entry of the same name
    pub(crate) fn commit_entry(&self, entry: &str, data: Vec<u8>) -> Result<()> {
        debug!("Committing {} ({} bytes) into {}", entry, data.len(), self.display());
        self.rewrite(entry, Some(&data))
    }
}

impl Filesystem for ArchiveFs {
    fn kind(&self) -> FilesystemKind {
        FilesystemKind::Archive
    }

    fn root(&self) -> &Path {
        &self.path
    }

    fn name(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Create an empty container, truncating any existing one
    fn create(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                FsError::io(parent.display().to_string(), FileOperation::CreateDir, e)
            })?;
        }

        let file = File::create(&self.path)
            .map_err(|e| FsError::io(self.display(), FileOperation::Create, e))?;
        ZipWriter::new(file)
            .finish()
            .map_err(|e| FsError::archive(self.display(), FileOperation::Create, e))?;
        Ok(())
    }

    fn open(&self, path: &str, mode: OpenMode) -> Result<FileHandle<'_>> {
        let entry = archive_entry_name(path);
        let display = self.absolute_path(path);

        match mode {
            OpenMode::Read => {
                let data = self.read_entry(&entry, path)?;
                Ok(FileHandle::memory(display, data))
            }
            OpenMode::Write => Ok(FileHandle::archive_entry(display, mode, self, entry, Vec::new())),
            OpenMode::Append => {
                let existing = match self.read_entry(&entry, path) {
                    Ok(data) => data,
                    Err(e) if e.is_not_found() => Vec::new(),
                    Err(e) => return Err(e),
                };
                Ok(FileHandle::archive_entry(display, mode, self, entry, existing))
            }
        }
    }

    fn file_exists(&self, path: &str) -> bool {
        self.is_file(path) || self.is_dir(path)
    }

    fn is_file(&self, path: &str) -> bool {
        let entry = archive_entry_name(path);
        if entry.is_empty() {
            return false;
        }
        self.entry_names()
            .map(|names| names.iter().any(|name| *name == entry))
            .unwrap_or(false)
    }

    fn is_dir(&self, path: &str) -> bool {
        let entry = archive_entry_name(path);
        if entry.is_empty() {
            return self.exists();
        }

        let prefix = format!("{}/", entry);
        self.entry_names()
            .map(|names| names.iter().any(|name| name.starts_with(&prefix)))
            .unwrap_or(false)
    }

    fn absolute_path(&self, path: &str) -> String {
        format!("{}${}", self.display(), normalize_package_path(path))
    }

    fn remove_file(&self, path: &str) -> Result<()> {
        let entry = archive_entry_name(path);
        if !self.is_file(path) {
            return Err(FsError::NotFound {
                root: self.display(),
                path: normalize_package_path(path),
            });
        }
        self.rewrite(&entry, None)
    }
}

impl fmt::Display for ArchiveFs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArchiveFs [path: {}]", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn archive_in(dir: &Path) -> ArchiveFs {
        let fs = ArchiveFs::new(dir.join("packages").join("cool_mod.zip"));
        fs.create().unwrap();
        fs
    }

    #[test]
    fn test_create_makes_empty_container() {
        let temp = tempdir().unwrap();
        let fs = ArchiveFs::new(temp.path().join("packages").join("cool_mod.zip"));

        assert!(!fs.exists());
        fs.create().unwrap();
        assert!(fs.exists());
        assert!(fs.entry_names().unwrap().is_empty());
        assert!(fs.is_dir("/"));
        assert_eq!(fs.name(), "cool_mod");
    }

    #[test]
    fn test_create_truncates_existing_container() {
        let temp = tempdir().unwrap();
        let fs = archive_in(temp.path());
        fs.write("a.txt", b"a").unwrap();

        fs.create().unwrap();
        assert!(!fs.file_exists("a.txt"));
    }

    #[test]
    fn test_read_after_scoped_write() {
        let temp = tempdir().unwrap();
        let fs = archive_in(temp.path());

        {
            let mut handle = fs.open("/ui/icon.png", OpenMode::Write).unwrap();
            handle.write_all(b"first").unwrap();
        }

        assert_eq!(fs.read("ui/icon.png").unwrap(), b"first");
        assert_eq!(fs.entry_names().unwrap(), vec!["ui/icon.png".to_string()]);
    }

    #[test]
    fn test_replacing_entry_keeps_others() {
        let temp = tempdir().unwrap();
        let fs = archive_in(temp.path());

        fs.write("manifest_v1.yaml", b"name: test").unwrap();
        fs.write("ui/icon.png", b"old").unwrap();
        fs.write("ui/icon.png", b"new").unwrap();

        let mut names = fs.entry_names().unwrap();
        names.sort();
        assert_eq!(names, vec!["manifest_v1.yaml".to_string(), "ui/icon.png".to_string()]);
        assert_eq!(fs.read("ui/icon.png").unwrap(), b"new");
        assert_eq!(fs.read_to_string("manifest_v1.yaml").unwrap(), "name: test");
    }

    #[test]
    fn test_append_extends_entry() {
        let temp = tempdir().unwrap();
        let fs = archive_in(temp.path());
        fs.write("notes.txt", b"one\n").unwrap();

        let mut handle = fs.open("notes.txt", OpenMode::Append).unwrap();
        handle.write_all(b"two\n").unwrap();
        handle.finish().unwrap();

        assert_eq!(fs.read_to_string("notes.txt").unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_directories_are_implicit() {
        let temp = tempdir().unwrap();
        let fs = archive_in(temp.path());
        fs.write("sprites/player/idle.png", b"x").unwrap();

        assert!(fs.is_dir("sprites"));
        assert!(fs.is_dir("/sprites/player"));
        assert!(!fs.is_file("sprites"));
        assert!(fs.file_exists("sprites"));
        assert!(fs.is_file("sprites/player/idle.png"));
        assert!(!fs.is_dir("sprites/player/idle.png"));
        assert!(!fs.file_exists("sprites/enemy"));
    }

    #[test]
    fn test_missing_entry_is_not_found() {
        let temp = tempdir().unwrap();
        let fs = archive_in(temp.path());

        let err = fs.open("missing.png", OpenMode::Read).unwrap_err();
        assert!(matches!(err, FsError::NotFound { .. }));

        let missing = ArchiveFs::new(temp.path().join("absent.zip"));
        assert!(missing.open("a.txt", OpenMode::Read).unwrap_err().is_not_found());
        assert!(!missing.file_exists("a.txt"));
    }

    #[test]
    fn test_absolute_path_embeds_separator() {
        let temp = tempdir().unwrap();
        let fs = archive_in(temp.path());

        let rendered = fs.absolute_path("ui\\icon.png");
        assert!(rendered.ends_with("cool_mod.zip$/ui/icon.png"));
    }

    #[test]
    fn test_remove_entry() {
        let temp = tempdir().unwrap();
        let fs = archive_in(temp.path());
        fs.write("a.txt", b"a").unwrap();
        fs.write("b.txt", b"b").unwrap();

        fs.remove_file("/a.txt").unwrap();
        assert_eq!(fs.entry_names().unwrap(), vec!["b.txt".to_string()]);
        assert!(fs.remove_file("a.txt").unwrap_err().is_not_found());
    }
}
