//! Error types for manifests, tasks and packages
//!
//! Rule violations found while validating are not errors; they are collected
//! as messages in the [`Context`](crate::manifest::Context). The enums here
//! cover structural problems with a manifest, failures while applying a task,
//! and orchestration failures.

use thiserror::Error;

pub use crate::filesystem::FsError;

/// Malformed or incomplete manifest data, raised while parsing
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("{what} node is not a mapping")]
    NotAMapping { what: &'static str },

    #[error("Invalid task node: {0}")]
    InvalidTaskNode(String),

    #[error("No such task type defined: {0}")]
    UnknownTaskType(String),

    #[error("Task type must be a non-empty string")]
    EmptyTaskType,

    #[error("Constructor registered for '{tag}' produced a '{produced}' task")]
    ConstructorMismatch { tag: String, produced: String },

    #[error("Populate source type mismatch: {found} != {expected}")]
    TypeMismatch { expected: String, found: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("'tasks' is not a sequence")]
    TasksNotSequence,

    #[error("Manifest is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Failures while applying a task to the target filesystem
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Applying '{task_type}' tasks is not supported")]
    Unsupported { task_type: String },

    #[error(transparent)]
    Filesystem(#[from] FsError),
}

/// Failures of the package orchestrator
#[derive(Error, Debug)]
pub enum PackageError {
    #[error("Cannot read package from non-existent filesystem: {0}")]
    SourceMissing(String),

    #[error("Cannot import manifest: {0} does not exist")]
    ManifestMissing(String),

    #[error("No manifest has been read for this package")]
    ManifestNotLoaded,

    #[error("Invalid manifest: {0}")]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Filesystem(#[from] FsError),

    #[error("Failed to serialize manifest: {0}")]
    Serialize(#[source] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, PackageError>;

/// Broad classes of failure, for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The manifest itself is malformed; nothing was constructed or touched
    Structural,
    /// A task failed while mutating the target; the target may be inconsistent
    Apply,
    /// A task type does not implement the requested phase
    Unsupported,
    /// Host or archive I/O outside of a task
    Io,
    /// An operation was called out of order
    Usage,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Structural => write!(f, "structural"),
            ErrorCategory::Apply => write!(f, "apply"),
            ErrorCategory::Unsupported => write!(f, "unsupported"),
            ErrorCategory::Io => write!(f, "io"),
            ErrorCategory::Usage => write!(f, "usage"),
        }
    }
}

impl ManifestError {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Structural
    }
}

impl TaskError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TaskError::Unsupported { .. } => ErrorCategory::Unsupported,
            TaskError::Filesystem(_) => ErrorCategory::Apply,
        }
    }
}

impl PackageError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PackageError::SourceMissing(_)
            | PackageError::ManifestMissing(_)
            | PackageError::Manifest(_) => ErrorCategory::Structural,
            PackageError::ManifestNotLoaded => ErrorCategory::Usage,
            PackageError::Filesystem(_) | PackageError::Serialize(_) => ErrorCategory::Io,
        }
    }
}
