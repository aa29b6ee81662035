//! Mod Installer Library
//!
//! This library validates, installs and packages content modifications for
//! the game. A mod is a package (a directory or a zip archive) holding a
//! declarative manifest of tasks plus the resources those tasks reference.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use mod_installer::{
//!     DirectoryFs, ModPackage, TaskRegistry, filesystem_for_root, report_validation,
//! };
//! use std::sync::Arc;
//!
//! # fn example() -> mod_installer::Result<()> {
//! let registry = Arc::new(TaskRegistry::default());
//! let game = DirectoryFs::new("/games/30XX");
//!
//! let mut package = ModPackage::new(registry, filesystem_for_root("mods/better_icons.zip"));
//! package.read_from_filesystem()?;
//!
//! // Validation is read-only and reports every problem at once
//! let context = package.validate(&game)?;
//! if !report_validation(&context) {
//!     return Ok(());
//! }
//!
//! let context = package.apply(&game)?;
//! for report in context.task_reports() {
//!     println!("task {}: {:?}", report.index, report.status);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Two-phase protocol**: validate collects every error before apply touches the game
//! - **Extensible tasks**: task variants are registered by type tag at runtime
//! - **Virtual filesystem**: the same paths work against directories and zip archives
//! - **Change journal**: every write during apply is recorded and can be rolled back
//! - **Packaging**: turn a mod project directory into a distributable archive

pub mod config;
pub mod error;
pub mod filesystem;
pub mod logging;
pub mod manifest;
pub mod package;
pub mod progress;
pub mod util;

// Re-export commonly used types for convenience
pub use config::{DEFAULT_MANIFEST_FILENAME, PackageConfig};
pub use error::{ErrorCategory, ManifestError, PackageError, Result, TaskError};
pub use filesystem::{
    ArchiveFs, DirectoryFs, FileHandle, Filesystem, FilesystemKind, FsError, OpenMode, copy_file,
    filesystem_for_root, normalize_package_path,
};
pub use manifest::{
    Change, ChangeJournal, ChangeState, Context, FileCopyTask, Manifest, Node, SpriteCheckTask, Task,
    TaskConstructor, TaskHeader, TaskRegistry, TaskReport,
};
pub use package::ModPackage;
pub use progress::{
    ConsoleProgressReporter, IntoProgressCallback, NullProgressReporter, ProgressCallback,
    ProgressEvent, ProgressReporter, TaskStatus,
};
pub use util::{default_game_directory, output_filename, report_validation, sanitize_filename};
