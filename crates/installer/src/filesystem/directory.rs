//! Directory-backed filesystem

use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use super::error::{FileOperation, FsError, Result};
use super::path::normalize_package_path;
use super::{FileHandle, Filesystem, FilesystemKind, OpenMode};

/// Filesystem rooted at a directory on the host
#[derive(Debug, Clone)]
pub struct DirectoryFs {
    root: PathBuf,
}

impl DirectoryFs {
    /// Create a filesystem for the given directory
    ///
    /// The root is resolved to an absolute path up front. Symlinks are only
    /// resolved when the directory already exists.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let resolved = fs::canonicalize(root)
            .or_else(|_| std::path::absolute(root))
            .unwrap_or_else(|_| root.to_path_buf());

        Self { root: resolved }
    }

    /// Host path for a package path, always beneath the root
    pub fn host_path(&self, path: &str) -> PathBuf {
        let normalized = normalize_package_path(path);
        let relative = normalized.trim_start_matches('/');

        if relative.is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        }
    }
}

impl Filesystem for DirectoryFs {
    fn kind(&self) -> FilesystemKind {
        FilesystemKind::Directory
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn create(&self) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| {
            FsError::io(self.root.display().to_string(), FileOperation::CreateDir, e)
        })
    }

    fn open(&self, path: &str, mode: OpenMode) -> Result<FileHandle<'_>> {
        let host_path = self.host_path(path);
        let display = host_path.display().to_string();

        if mode != OpenMode::Read {
            if let Some(parent) = host_path.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    FsError::io(parent.display().to_string(), FileOperation::CreateDir, e)
                })?;
            }
        }

        let mut options = OpenOptions::new();
        match mode {
            OpenMode::Read => options.read(true),
            OpenMode::Write => options.write(true).create(true).truncate(true),
            OpenMode::Append => options.append(true).create(true),
        };

        let file = options.open(&host_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FsError::NotFound {
                    root: self.root.display().to_string(),
                    path: normalize_package_path(path),
                }
            } else {
                let operation = match mode {
                    OpenMode::Read => FileOperation::Read,
                    _ => FileOperation::Write,
                };
                FsError::io(display.clone(), operation, e)
            }
        })?;

        Ok(FileHandle::disk(display, mode, file))
    }

    fn file_exists(&self, path: &str) -> bool {
        self.host_path(path).exists()
    }

    fn is_file(&self, path: &str) -> bool {
        self.host_path(path).is_file()
    }

    fn is_dir(&self, path: &str) -> bool {
        self.host_path(path).is_dir()
    }

    fn absolute_path(&self, path: &str) -> String {
        self.host_path(path).display().to_string()
    }

    fn remove_file(&self, path: &str) -> Result<()> {
        let host_path = self.host_path(path);
        fs::remove_file(&host_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FsError::NotFound {
                    root: self.root.display().to_string(),
                    path: normalize_package_path(path),
                }
            } else {
                FsError::io(host_path.display().to_string(), FileOperation::Delete, e)
            }
        })
    }
}

impl fmt::Display for DirectoryFs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DirectoryFs [path: {}]", self.root.display())
    }
}
