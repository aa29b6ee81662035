//! Package orchestration
//!
//! A [`ModPackage`] binds a task registry to a source filesystem. It reads the
//! manifest on request and drives the validate, apply and write cycles against
//! a target filesystem.
//!
//! ```ignore
//! let mut package = ModPackage::new(registry, filesystem_for_root("mods/better_icons"));
//! package.read_from_filesystem()?;
//!
//! let context = package.validate(&game)?;
//! if !report_validation(&context) {
//!     return Ok(());
//! }
//! let context = package.apply(&game)?;
//! ```


use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::PackageConfig;
use crate::error::{ManifestError, PackageError, Result};
use crate::filesystem::{Filesystem, copy_file};
use crate::manifest::{Context, Manifest, Node, TaskRegistry};
use crate::progress::{ProgressCallback, ProgressEvent};

/// A mod package rooted at a source filesystem
pub struct ModPackage {
    registry: Arc<TaskRegistry>,
    source: Box<dyn Filesystem>,
    manifest: Option<Manifest>,
    config: PackageConfig,
    progress: Option<ProgressCallback>,
}

impl ModPackage {
    /// Bind a registry and a source filesystem; the manifest is not read yet
    pub fn new(registry: Arc<TaskRegistry>, source: Box<dyn Filesystem>) -> Self {
        Self {
            registry,
            source,
            manifest: None,
            config: PackageConfig::default(),
            progress: None,
        }
    }

    pub fn with_config(mut self, config: PackageConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// The manifest's declared name, or the source filesystem's name
    pub fn name(&self) -> String {
        self.manifest
            .as_ref()
            .and_then(Manifest::name)
            .map(str::to_string)
            .unwrap_or_else(|| self.source.name())
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    pub fn source_filesystem(&self) -> &dyn Filesystem {
        self.source.as_ref()
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn config(&self) -> &PackageConfig {
        &self.config
    }

    /// Read and parse the manifest from the source filesystem
    ///
    /// Replaces any manifest read earlier. On failure the previous manifest,
    /// if any, is kept.
    pub fn read_from_filesystem(&mut self) -> Result<&Manifest> {
        if !self.source.exists() {
            return Err(PackageError::SourceMissing(self.source.root().display().to_string()));
        }

        let filename = self.config.manifest_filename.as_str();
        if !self.source.is_file(filename) {
            return Err(PackageError::ManifestMissing(self.source.absolute_path(filename)));
        }

        debug!("Reading manifest {}", self.source.absolute_path(filename));
        let text = self.source.read_to_string(filename)?;
        let node: Node = serde_yaml::from_str(&text).map_err(ManifestError::from)?;
        let manifest = Manifest::from_node(&node, &self.registry)?;

        info!("Loaded {} from {}", manifest, self.source);
        self.emit(ProgressEvent::ManifestLoaded {
            name: manifest.name().map(str::to_string),
            tasks: manifest.tasks().len(),
        });

        Ok(&*self.manifest.insert(manifest))
    }

    /// Check every task against a target without modifying anything
    pub fn validate<'a>(&'a self, target: &'a dyn Filesystem) -> Result<Context<'a>> {
        let manifest = self.loaded()?;
        let mut context = self.context(target);

        let valid = manifest.validate(&mut context);
        debug!(
            "Validated {} against {}: {}",
            manifest,
            target,
            if valid { "ok" } else { "failed" }
        );
        Ok(context)
    }

    /// Apply every task to a target
    ///
    /// Apply is not atomic. When any task fails the target may hold a mixture
    /// of old and new files; the returned context records which tasks were
    /// applied and journals every write so the run can be inspected or
    /// rolled back.
    pub fn apply<'a>(&'a self, target: &'a dyn Filesystem) -> Result<Context<'a>> {
        let manifest = self.loaded()?;
        let mut context = self.context(target);

        info!("Applying {} to {}", manifest, target);
        let applied = manifest.apply(&mut context, self.config.halt_on_apply_error);

        if !applied && !context.journal().is_empty() {
            warn!(
                "Apply did not complete; {} file(s) were written to {} and the installation may be in an undefined state",
                context.journal().len(),
                target
            );
        }
        Ok(context)
    }

    /// Package this mod into a target filesystem
    ///
    /// Creates the target, writes the manifest and copies every resource the
    /// manifest references to the same relative path. Returns the number of
    /// resources copied.
    pub fn write_to_filesystem(&self, target: &dyn Filesystem) -> Result<usize> {
        let manifest = self.loaded()?;

        target.create()?;

        let yaml = serde_yaml::to_string(&manifest.export()).map_err(PackageError::Serialize)?;
        target.write(&self.config.manifest_filename, yaml.as_bytes())?;
        debug!("Wrote manifest to {}", target.absolute_path(&self.config.manifest_filename));

        let mut seen = HashSet::new();
        let mut copied = 0;
        for resource in manifest.list_resources() {
            if !seen.insert(resource.clone()) {
                continue;
            }

            debug!(
                "Copying {} to {}",
                self.source.absolute_path(&resource),
                target.absolute_path(&resource)
            );
            let bytes = copy_file(self.source.as_ref(), &resource, target, &resource)?;
            self.emit(ProgressEvent::ResourceWritten { path: resource, bytes });
            copied += 1;
        }

        info!("Built package {} with {} resource(s) at {}", self.name(), copied, target);
        self.emit(ProgressEvent::PackageWritten {
            target: target.to_string(),
            resources: copied,
        });
        Ok(copied)
    }

    fn loaded(&self) -> Result<&Manifest> {
        self.manifest.as_ref().ok_or(PackageError::ManifestNotLoaded)
    }

    fn context<'a>(&'a self, target: &'a dyn Filesystem) -> Context<'a> {
        Context::new(self.source.as_ref(), target)
            .with_backups(self.config.backup_overwritten)
            .with_progress_callback(self.progress.clone())
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(callback) = &self.progress {
            callback(event);
        }
    }
}

impl fmt::Debug for ModPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModPackage")
            .field("source", &self.source)
            .field("manifest", &self.manifest.as_ref().map(|m| m.to_string()))
            .field("config", &self.config)
            .finish()
    }
}
