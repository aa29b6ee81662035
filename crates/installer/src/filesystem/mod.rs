//! Virtual filesystem
//!
//! A [`Filesystem`] is a root (a plain directory or a zip archive) plus a
//! uniform set of scoped operations over paths beneath it. Tasks never touch
//! the host filesystem directly; they go through the source and target
//! filesystems bound to their [`Context`](crate::manifest::Context).
//!
//! All paths are normalized with [`normalize_package_path`] before use, so
//! `ui\icon.png`, `/ui/icon.png` and `ui/./icon.png` address the same entry on
//! either backend.

pub mod archive;
pub mod directory;
pub mod error;
pub mod path;

pub use archive::ArchiveFs;
pub use directory::DirectoryFs;
pub use error::{FileOperation, FsError, Result};
pub use path::{archive_entry_name, normalize_package_path};

use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read, Write};
use std::path::Path;

use tracing::warn;

/// How a path is opened through [`Filesystem::open`]
///
/// There is no separate text mode: handles are byte streams and callers use
/// [`Filesystem::read_to_string`] when they want text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    /// Create or truncate
    Write,
    /// Create or extend
    Append,
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenMode::Read => write!(f, "reading"),
            OpenMode::Write => write!(f, "writing"),
            OpenMode::Append => write!(f, "appending"),
        }
    }
}

/// Backend behind a filesystem root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilesystemKind {
    Directory,
    Archive,
}

/// Uniform interface over a directory tree or an archive container
pub trait Filesystem: fmt::Debug + fmt::Display + Send + Sync {
    fn kind(&self) -> FilesystemKind;

    /// Resolved root of this filesystem on the host
    fn root(&self) -> &Path;

    /// Short human-readable name derived from the root
    fn name(&self) -> String;

    /// Whether the root storage exists
    fn exists(&self) -> bool {
        self.root().exists()
    }

    /// Create the root storage if absent
    fn create(&self) -> Result<()>;

    /// Open a path beneath the root
    ///
    /// The returned handle releases its underlying resources when dropped, on
    /// every exit path. Writes to archives become visible once the handle is
    /// finished or dropped.
    fn open(&self, path: &str, mode: OpenMode) -> Result<FileHandle<'_>>;

    /// Whether the path exists as either a file or a directory
    fn file_exists(&self, path: &str) -> bool;

    fn is_file(&self, path: &str) -> bool;

    fn is_dir(&self, path: &str) -> bool;

    /// Render a path for diagnostics; not guaranteed to be unique
    fn absolute_path(&self, path: &str) -> String;

    fn remove_file(&self, path: &str) -> Result<()>;

    /// Read a whole file into memory
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let mut handle = self.open(path, OpenMode::Read)?;
        let mut data = Vec::new();
        handle
            .read_to_end(&mut data)
            .map_err(|e| FsError::io(self.absolute_path(path), FileOperation::Read, e))?;
        Ok(data)
    }

    fn read_to_string(&self, path: &str) -> Result<String> {
        let data = self.read(path)?;
        String::from_utf8(data).map_err(|e| {
            FsError::io(
                self.absolute_path(path),
                FileOperation::Read,
                io::Error::new(io::ErrorKind::InvalidData, e),
            )
        })
    }

    /// Replace the contents of a file, creating it if needed
    fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut handle = self.open(path, OpenMode::Write)?;
        handle
            .write_all(data)
            .map_err(|e| FsError::io(self.absolute_path(path), FileOperation::Write, e))?;
        handle.finish()
    }
}

/// Copy one file between (possibly different) filesystems, returning the byte count
pub fn copy_file(
    source: &dyn Filesystem,
    source_path: &str,
    target: &dyn Filesystem,
    target_path: &str,
) -> Result<u64> {
    let mut reader = source.open(source_path, OpenMode::Read)?;
    let mut writer = target.open(target_path, OpenMode::Write)?;

    let copied = match io::copy(&mut reader, &mut writer) {
        Ok(copied) => copied,
        Err(e) => {
            writer.discard();
            return Err(FsError::io(target.absolute_path(target_path), FileOperation::Write, e));
        }
    };
    writer.finish()?;

    Ok(copied)
}

/// Build the appropriate filesystem for a package or game root
///
/// - `*.zip` is an archive package
/// - `*.yml` / `*.yaml` refers to a manifest; its directory is the root
/// - anything else is treated as a directory
pub fn filesystem_for_root(root: impl AsRef<Path>) -> Box<dyn Filesystem> {
    let root = root.as_ref();
    let extension = root
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("zip") => Box::new(ArchiveFs::new(root)),
        Some("yml") | Some("yaml") => {
            let parent = root
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            Box::new(DirectoryFs::new(parent))
        }
        _ => Box::new(DirectoryFs::new(root)),
    }
}

/// Scoped stream returned by [`Filesystem::open`]
///
/// A handle whose read or write has failed, or that is dropped while the
/// thread unwinds, is released without committing buffered archive data.
pub struct FileHandle<'a> {
    display_path: String,
    mode: OpenMode,
    inner: HandleInner<'a>,
    poisoned: bool,
}

enum HandleInner<'a> {
    /// Host file from the directory backend
    Disk(File),
    /// Archive entry loaded for reading
    Memory(Cursor<Vec<u8>>),
    /// Archive entry being written; committed into the container on finish/drop
    ArchiveEntry {
        archive: &'a ArchiveFs,
        entry: String,
        buffer: Vec<u8>,
        committed: bool,
    },
}

impl<'a> FileHandle<'a> {
    pub(crate) fn disk(display_path: String, mode: OpenMode, file: File) -> Self {
        Self {
            display_path,
            mode,
            inner: HandleInner::Disk(file),
            poisoned: false,
        }
    }

    pub(crate) fn memory(display_path: String, data: Vec<u8>) -> Self {
        Self {
            display_path,
            mode: OpenMode::Read,
            inner: HandleInner::Memory(Cursor::new(data)),
            poisoned: false,
        }
    }

    pub(crate) fn archive_entry(
        display_path: String,
        mode: OpenMode,
        archive: &'a ArchiveFs,
        entry: String,
        buffer: Vec<u8>,
    ) -> Self {
        Self {
            display_path,
            mode,
            inner: HandleInner::ArchiveEntry {
                archive,
                entry,
                buffer,
                committed: false,
            },
            poisoned: false,
        }
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn path(&self) -> &str {
        &self.display_path
    }

    /// Flush and release the handle, surfacing any error from the final write
    ///
    /// Dropping a handle does the same work but can only log failures.
    pub fn finish(mut self) -> Result<()> {
        self.commit()
    }

    /// Release the handle without committing buffered archive data
    ///
    /// Bytes already written to a host file stay where they are.
    pub fn discard(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let HandleInner::ArchiveEntry {
            buffer, committed, ..
        } = &mut self.inner
        {
            *committed = true;
            buffer.clear();
        }
    }

    fn commit(&mut self) -> Result<()> {
        match &mut self.inner {
            HandleInner::Disk(file) => {
                if self.mode != OpenMode::Read {
                    file.flush().map_err(|e| {
                        FsError::io(self.display_path.clone(), FileOperation::Write, e)
                    })?;
                }
                Ok(())
            }
            HandleInner::Memory(_) => Ok(()),
            HandleInner::ArchiveEntry {
                archive,
                entry,
                buffer,
                committed,
            } => {
                if *committed {
                    return Ok(());
                }
                *committed = true;
                archive.commit_entry(entry, std::mem::take(buffer))
            }
        }
    }
}

fn mode_error(path: &str, mode: OpenMode) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        FsError::ModeMismatch {
            path: path.to_string(),
            mode,
        },
    )
}

impl Read for FileHandle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.mode != OpenMode::Read {
            self.poisoned = true;
            return Err(mode_error(&self.display_path, self.mode));
        }
        let result = match &mut self.inner {
            HandleInner::Disk(file) => file.read(buf),
            HandleInner::Memory(cursor) => cursor.read(buf),
            HandleInner::ArchiveEntry { .. } => Err(mode_error(&self.display_path, self.mode)),
        };
        self.poisoned |= result.is_err();
        result
    }
}

impl Write for FileHandle<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.mode == OpenMode::Read {
            self.poisoned = true;
            return Err(mode_error(&self.display_path, self.mode));
        }
        let result = match &mut self.inner {
            HandleInner::Disk(file) => file.write(buf),
            HandleInner::ArchiveEntry { buffer, .. } => {
                buffer.extend_from_slice(buf);
                Ok(buf.len())
            }
            HandleInner::Memory(_) => Err(mode_error(&self.display_path, self.mode)),
        };
        self.poisoned |= result.is_err();
        result
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            HandleInner::Disk(file) => file.flush(),
            _ => Ok(()),
        }
    }
}

impl Drop for FileHandle<'_> {
    fn drop(&mut self) {
        if self.poisoned || std::thread::panicking() {
            self.release();
            return;
        }
        if let Err(e) = self.commit() {
            warn!("Failed to release handle for {}: {}", self.display_path, e);
        }
    }
}

impl fmt::Debug for FileHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("path", &self.display_path)
            .field("mode", &self.mode)
            .finish()
    }
}
