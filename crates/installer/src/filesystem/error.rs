//! Error types for the virtual filesystem layer

use thiserror::Error;

/// Errors raised by filesystem backends, carrying the path and operation that failed
#[derive(Error, Debug)]
pub enum FsError {
    /// The requested entry does not exist under the filesystem root
    #[error("No such file '{path}' in '{root}'")]
    NotFound { root: String, path: String },

    /// Host I/O errors with file context
    #[error("File operation failed while {operation} '{path}'")]
    FileSystem {
        path: String,
        operation: FileOperation,
        #[source]
        source: std::io::Error,
    },

    /// Archive container errors with file context
    #[error("Archive operation failed while {operation} '{path}'")]
    Archive {
        path: String,
        operation: FileOperation,
        #[source]
        source: zip::result::ZipError,
    },

    /// A handle was used against the mode it was opened with
    #[error("Handle for '{path}' was opened for {mode}")]
    ModeMismatch { path: String, mode: super::OpenMode },
}

/// Types of file operations for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    Read,
    Write,
    Create,
    Delete,
    Metadata,
    CreateDir,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOperation::Read => write!(f, "reading"),
            FileOperation::Write => write!(f, "writing"),
            FileOperation::Create => write!(f, "creating"),
            FileOperation::Delete => write!(f, "deleting"),
            FileOperation::Metadata => write!(f, "reading metadata"),
            FileOperation::CreateDir => write!(f, "creating directory"),
        }
    }
}

impl FsError {
    pub(crate) fn io(path: impl Into<String>, operation: FileOperation, source: std::io::Error) -> Self {
        FsError::FileSystem {
            path: path.into(),
            operation,
            source,
        }
    }

    pub(crate) fn archive(
        path: impl Into<String>,
        operation: FileOperation,
        source: zip::result::ZipError,
    ) -> Self {
        FsError::Archive {
            path: path.into(),
            operation,
            source,
        }
    }

    /// Whether this error means the entry simply isn't there
    pub fn is_not_found(&self) -> bool {
        match self {
            FsError::NotFound { .. } => true,
            FsError::FileSystem { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            FsError::Archive { source, .. } => {
                matches!(source, zip::result::ZipError::FileNotFound)
            }
            FsError::ModeMismatch { .. } => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
