//! Execution context for a single validate or apply call

use std::fmt;

use tracing::{error, info, warn};
use xxhash_rust::xxh64::xxh64;

use crate::filesystem::{Filesystem, FsError, normalize_package_path};
use crate::manifest::journal::{ChangeJournal, ChangeState};
use crate::progress::{ProgressCallback, ProgressEvent, TaskStatus};

/// What happened to one task during an apply run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub index: usize,
    pub task_type: String,
    pub name: Option<String>,
    pub status: TaskStatus,
}

/// Per-run accumulator of diagnostics bound to a source and target filesystem
///
/// A fresh context is created for every validate or apply call so results
/// never leak between runs.
pub struct Context<'a> {
    source: &'a dyn Filesystem,
    target: &'a dyn Filesystem,
    errors: Vec<String>,
    warnings: Vec<String>,
    backups: bool,
    progress: Option<ProgressCallback>,
    journal: ChangeJournal,
    reports: Vec<TaskReport>,
    current_index: usize,
    current_name: Option<String>,
}

impl<'a> Context<'a> {
    pub fn new(source: &'a dyn Filesystem, target: &'a dyn Filesystem) -> Self {
        Self {
            source,
            target,
            errors: Vec::new(),
            warnings: Vec::new(),
            backups: true,
            progress: None,
            journal: ChangeJournal::new(),
            reports: Vec::new(),
            current_index: 0,
            current_name: None,
        }
    }

    /// Keep previous contents of overwritten files for [`Context::rollback`]
    pub fn with_backups(mut self, backups: bool) -> Self {
        self.backups = backups;
        self
    }

    pub fn with_progress_callback(mut self, callback: Option<ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    pub fn source_filesystem(&self) -> &'a dyn Filesystem {
        self.source
    }

    pub fn target_filesystem(&self) -> &'a dyn Filesystem {
        self.target
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(callback) = &self.progress {
            callback(event);
        }
    }

    pub(crate) fn begin_task(&mut self, index: usize, name: Option<&str>) {
        self.current_index = index;
        self.current_name = name.map(str::to_string);
    }

    pub(crate) fn record_report(&mut self, report: TaskReport) {
        self.reports.push(report);
    }

    /// Outcome of every task attempted by an apply run, in manifest order
    pub fn task_reports(&self) -> &[TaskReport] {
        &self.reports
    }

    pub fn journal(&self) -> &ChangeJournal {
        &self.journal
    }

    /// Write to the target filesystem through the change journal
    ///
    /// The new contents must already be fully staged in memory. The write is
    /// journaled before the target is touched and marked written afterwards, so
    /// a failure leaves a `Staged` entry naming the path that was in flight.
    pub fn write_target(&mut self, path: &str, contents: &[u8]) -> Result<(), FsError> {
        let path = normalize_package_path(path);
        let existed = self.target.is_file(&path);
        let backup = if existed && self.backups {
            Some(self.target.read(&path)?)
        } else {
            None
        };

        let position = self.journal.stage(
            self.current_index,
            self.current_name.clone(),
            &path,
            existed,
            backup,
            contents,
        );
        self.target.write(&path, contents)?;
        self.journal.mark(position, ChangeState::Written);

        self.emit(ProgressEvent::ResourceWritten {
            path,
            bytes: contents.len() as u64,
        });
        Ok(())
    }

    /// Undo every written change, newest first, returning how many were undone
    ///
    /// Files that did not exist before the run are removed. Overwritten files
    /// without a backup cannot be restored; they are reported as warnings and
    /// left as they are.
    pub fn rollback(&mut self) -> Result<usize, FsError> {
        let mut undone = 0;

        for position in self.journal.written_positions_rev() {
            let Some(change) = self.journal.get(position).cloned() else {
                continue;
            };

            match (&change.backup, change.existed) {
                (Some(previous), _) => self.target.write(&change.path, previous)?,
                (None, false) => match self.target.remove_file(&change.path) {
                    Ok(()) => {}
                    Err(e) if e.is_not_found() => {}
                    Err(e) => return Err(e),
                },
                (None, true) => {
                    self.add_warning(format!(
                        "cannot restore {}: no backup was kept",
                        self.target.absolute_path(&change.path)
                    ));
                    continue;
                }
            }

            self.journal.mark(position, ChangeState::RolledBack);
            undone += 1;
        }

        info!("Rolled back {} change(s) on {}", undone, self.target);
        Ok(undone)
    }

    /// Re-read every written path and return those whose contents no longer match
    pub fn verify_written(&self) -> Result<Vec<String>, FsError> {
        let mut mismatched = Vec::new();

        for change in self.journal.changes() {
            if change.state != ChangeState::Written {
                continue;
            }
            // Only the latest write to a path describes its current contents
            let latest = self
                .journal
                .changes_for(&change.path)
                .into_iter()
                .filter(|c| c.state == ChangeState::Written)
                .last()
                .map(|c| std::ptr::eq(c, change))
                .unwrap_or(false);
            if !latest {
                continue;
            }

            let contents = self.target.read(&change.path)?;
            if xxh64(&contents, 0) != change.digest {
                mismatched.push(change.path.clone());
            }
        }

        Ok(mismatched)
    }

    /// Log every accumulated error and warning, then the totals
    pub fn log_diagnostics(&self) {
        for message in &self.errors {
            error!("{}", message);
        }
        for message in &self.warnings {
            warn!("{}", message);
        }
        info!("{} error(s), {} warning(s)", self.errors.len(), self.warnings.len());
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("source", &self.source.to_string())
            .field("target", &self.target.to_string())
            .field("errors", &self.errors)
            .field("warnings", &self.warnings)
            .field("changes", &self.journal.len())
            .field("reports", &self.reports)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::DirectoryFs;
    use tempfile::tempdir;

    #[test]
    fn test_diagnostics_accumulate_in_order() {
        let temp = tempdir().unwrap();
        let fs = DirectoryFs::new(temp.path());
        let mut context = Context::new(&fs, &fs);

        context.add_error("first");
        context.add_warning("careful");
        context.add_error(String::from("second"));

        assert_eq!(context.errors(), ["first", "second"]);
        assert_eq!(context.warnings(), ["careful"]);
        assert!(context.has_errors());
    }

    #[test]
    fn test_write_target_journals_and_rolls_back() {
        let temp = tempdir().unwrap();
        let source = DirectoryFs::new(temp.path().join("mod"));
        let target = DirectoryFs::new(temp.path().join("game"));
        target.write("ui/icon.png", b"original").unwrap();

        let mut context = Context::new(&source, &target);
        context.begin_task(0, Some("icon"));
        context.write_target("ui/icon.png", b"modded").unwrap();
        context.begin_task(1, None);
        context.write_target("ui/new.png", b"added").unwrap();

        assert_eq!(target.read("ui/icon.png").unwrap(), b"modded");
        let changes = context.journal().changes();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].path, "/ui/icon.png");
        assert_eq!(changes[0].task_name.as_deref(), Some("icon"));
        assert!(changes[0].existed);
        assert!(!changes[1].existed);
        assert!(changes.iter().all(|c| c.state == ChangeState::Written));
        assert!(context.verify_written().unwrap().is_empty());

        let undone = context.rollback().unwrap();
        assert_eq!(undone, 2);
        assert_eq!(target.read("ui/icon.png").unwrap(), b"original");
        assert!(!target.file_exists("ui/new.png"));
        assert!(context
            .journal()
            .changes()
            .iter()
            .all(|c| c.state == ChangeState::RolledBack));
    }

    #[test]
    fn test_rollback_without_backups_warns() {
        let temp = tempdir().unwrap();
        let target = DirectoryFs::new(temp.path());
        target.write("a.txt", b"original").unwrap();

        let mut context = Context::new(&target, &target).with_backups(false);
        context.write_target("a.txt", b"changed").unwrap();

        assert_eq!(context.rollback().unwrap(), 0);
        assert_eq!(context.warnings().len(), 1);
        assert_eq!(target.read("a.txt").unwrap(), b"changed");
    }

    #[test]
    fn test_verify_detects_later_tampering() {
        let temp = tempdir().unwrap();
        let target = DirectoryFs::new(temp.path());

        let mut context = Context::new(&target, &target);
        context.write_target("a.txt", b"one").unwrap();
        context.write_target("a.txt", b"two").unwrap();
        assert!(context.verify_written().unwrap().is_empty());

        target.write("a.txt", b"tampered").unwrap();
        assert_eq!(context.verify_written().unwrap(), vec!["/a.txt".to_string()]);
    }
}
