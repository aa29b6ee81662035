//! Progress tracking and reporting for package operations
//!
//! Operations report through an explicit callback carried by the
//! [`Context`](crate::manifest::Context) or the
//! [`ModPackage`](crate::package::ModPackage) rather than through global state.

use std::sync::Arc;

/// Progress callback for package operations
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Outcome of applying a single task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// The task validated and its changes were written
    Applied,
    /// The task failed validation, so nothing was written
    Skipped,
    /// The task raised an error part way through
    Failed(String),
}

/// Events emitted during package operations
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    ManifestLoaded {
        name: Option<String>,
        tasks: usize,
    },
    TaskValidated {
        index: usize,
        total: usize,
        task_type: String,
        valid: bool,
    },
    TaskApplied {
        index: usize,
        total: usize,
        task_type: String,
        status: TaskStatus,
    },
    ResourceWritten {
        path: String,
        bytes: u64,
    },
    PackageWritten {
        target: String,
        resources: usize,
    },
}

/// Trait for progress reporting with more granular control
pub trait ProgressReporter: Send + Sync {
    fn on_manifest_loaded(&self, _name: Option<&str>, _tasks: usize) {}
    fn on_task_validated(&self, _index: usize, _total: usize, _task_type: &str, _valid: bool) {}
    fn on_task_applied(&self, _index: usize, _total: usize, _task_type: &str, _status: &TaskStatus) {}
    fn on_resource_written(&self, _path: &str, _bytes: u64) {}
    fn on_package_written(&self, _target: &str, _resources: usize) {}
}

/// Extension trait to convert ProgressReporter to ProgressCallback
pub trait IntoProgressCallback {
    fn into_callback(self) -> ProgressCallback;
}

impl<T: ProgressReporter + 'static> IntoProgressCallback for T {
    fn into_callback(self) -> ProgressCallback {
        Arc::new(move |event| match event {
            ProgressEvent::ManifestLoaded { name, tasks } => {
                self.on_manifest_loaded(name.as_deref(), tasks);
            }
            ProgressEvent::TaskValidated { index, total, task_type, valid } => {
                self.on_task_validated(index, total, &task_type, valid);
            }
            ProgressEvent::TaskApplied { index, total, task_type, status } => {
                self.on_task_applied(index, total, &task_type, &status);
            }
            ProgressEvent::ResourceWritten { path, bytes } => {
                self.on_resource_written(&path, bytes);
            }
            ProgressEvent::PackageWritten { target, resources } => {
                self.on_package_written(&target, resources);
            }
        })
    }
}

/// Simple console progress reporter implementation
#[derive(Debug, Default)]
pub struct ConsoleProgressReporter {
    pub verbose: bool,
}

impl ConsoleProgressReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn on_manifest_loaded(&self, name: Option<&str>, tasks: usize) {
        println!("Loaded manifest {} ({} tasks)", name.unwrap_or("<unnamed>"), tasks);
    }

    fn on_task_validated(&self, index: usize, total: usize, task_type: &str, valid: bool) {
        if self.verbose || !valid {
            let verdict = if valid { "ok" } else { "FAILED" };
            println!("[{}/{}] validate {}: {}", index + 1, total, task_type, verdict);
        }
    }

    fn on_task_applied(&self, index: usize, total: usize, task_type: &str, status: &TaskStatus) {
        match status {
            TaskStatus::Applied => {
                if self.verbose {
                    println!("[{}/{}] applied {}", index + 1, total, task_type);
                }
            }
            TaskStatus::Skipped => println!("[{}/{}] skipped {}", index + 1, total, task_type),
            TaskStatus::Failed(error) => {
                eprintln!("[{}/{}] {} failed: {}", index + 1, total, task_type, error)
            }
        }
    }

    fn on_resource_written(&self, path: &str, bytes: u64) {
        if self.verbose {
            println!("wrote {} ({} bytes)", path, bytes);
        }
    }

    fn on_package_written(&self, target: &str, resources: usize) {
        println!("Package written to {} ({} resources)", target, resources);
    }
}

/// Null progress reporter that does nothing
#[derive(Debug, Default)]
pub struct NullProgressReporter;

impl ProgressReporter for NullProgressReporter {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl ProgressReporter for Recorder {
        fn on_task_applied(&self, index: usize, _total: usize, task_type: &str, status: &TaskStatus) {
            self.seen
                .lock()
                .unwrap()
                .push(format!("{}:{}:{:?}", index, task_type, status));
        }
    }

    #[test]
    fn test_reporter_receives_events() {
        let recorder = Recorder::default();
        let seen = recorder.seen.clone();
        let callback = recorder.into_callback();

        callback(ProgressEvent::TaskApplied {
            index: 0,
            total: 1,
            task_type: "file".into(),
            status: TaskStatus::Applied,
        });
        callback(ProgressEvent::ResourceWritten { path: "/a".into(), bytes: 1 });

        assert_eq!(*seen.lock().unwrap(), vec!["0:file:Applied".to_string()]);
    }

    #[test]
    fn test_null_reporter_accepts_everything() {
        let callback = NullProgressReporter.into_callback();
        callback(ProgressEvent::ManifestLoaded { name: None, tasks: 0 });
    }
}
