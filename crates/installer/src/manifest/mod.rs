//! Manifest model and execution
//!
//! A [`Manifest`] is mod metadata plus an ordered list of tasks. Order is
//! significant: it is both the validation and the execution order.

pub mod context;
pub mod journal;
pub mod node;
pub mod registry;
pub mod tasks;

pub use context::{Context, TaskReport};
pub use journal::{Change, ChangeJournal, ChangeState};
pub use node::Node;
pub use registry::{TaskConstructor, TaskRegistry};
pub use tasks::{FileCopyTask, SpriteCheckTask, Task, TaskHeader};

use std::fmt;

use serde_yaml::{Mapping, Value};
use tracing::{debug, error, info};

use crate::error::{ManifestError, TaskError};
use crate::progress::{ProgressEvent, TaskStatus};
use tasks::{DESC_KEY, MAX_DESC_LENGTH, MAX_NAME_LENGTH, NAME_KEY};

pub const AUTHOR_KEY: &str = "author";
pub const TASKS_KEY: &str = "tasks";

pub const DEFAULT_AUTHOR: &str = "unknown";
pub const MAX_AUTHOR_LENGTH: usize = 512;

/// Mod metadata and its ordered task list
#[derive(Debug)]
pub struct Manifest {
    name: Option<String>,
    description: Option<String>,
    author: String,
    tasks: Vec<Box<dyn Task>>,
}

impl Manifest {
    pub fn new() -> Self {
        Self {
            name: None,
            description: None,
            author: DEFAULT_AUTHOR.to_string(),
            tasks: Vec::new(),
        }
    }

    /// Build a manifest from its node
    pub fn from_node(node: &Node, registry: &TaskRegistry) -> Result<Self, ManifestError> {
        let mut manifest = Self::new();
        manifest.populate(node, registry)?;
        Ok(manifest)
    }

    /// Replace this manifest's contents with those read from a node
    ///
    /// Every task is built before anything is assigned, so on failure the
    /// manifest is left untouched.
    pub fn populate(&mut self, node: &Node, registry: &TaskRegistry) -> Result<(), ManifestError> {
        let map = node::as_mapping(node, "manifest")?;

        let name = node::optional_str(map, NAME_KEY, MAX_NAME_LENGTH)?;
        let description = node::optional_str(map, DESC_KEY, MAX_DESC_LENGTH)?;
        let author = node::optional_str(map, AUTHOR_KEY, MAX_AUTHOR_LENGTH)?
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string());

        let tasks = match node::field(map, TASKS_KEY) {
            None => Vec::new(),
            Some(Value::Sequence(nodes)) => nodes
                .iter()
                .map(|task_node| registry.build_from_node(task_node))
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(ManifestError::TasksNotSequence),
        };

        debug!("Populated manifest {:?} with {} task(s)", name, tasks.len());
        *self = Self {
            name,
            description,
            author,
            tasks,
        };
        Ok(())
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn tasks(&self) -> &[Box<dyn Task>] {
        &self.tasks
    }

    /// Append an already built task
    pub fn add_task(&mut self, task: Box<dyn Task>) {
        self.tasks.push(task);
    }

    pub fn export(&self) -> Node {
        let mut map = Mapping::new();
        node::insert_str(&mut map, NAME_KEY, self.name.as_deref());
        node::insert_str(&mut map, DESC_KEY, self.description.as_deref());
        map.insert(Value::from(AUTHOR_KEY), Value::from(self.author.as_str()));
        map.insert(
            Value::from(TASKS_KEY),
            Value::Sequence(self.tasks.iter().map(|task| task.export()).collect()),
        );
        Value::Mapping(map)
    }

    /// Every source resource in task order, duplicates included
    pub fn list_resources(&self) -> Vec<String> {
        self.tasks.iter().flat_map(|task| task.list_resources()).collect()
    }

    /// Validate every task, even after a failure, and return the combined verdict
    pub fn validate(&self, context: &mut Context<'_>) -> bool {
        let total = self.tasks.len();
        let mut result = true;

        for (index, task) in self.tasks.iter().enumerate() {
            let valid = task.validate(context);
            context.emit(ProgressEvent::TaskValidated {
                index,
                total,
                task_type: task.task_type().to_string(),
                valid,
            });
            result &= valid;
        }

        result
    }

    /// Apply every task in order and return whether all of them were applied
    ///
    /// Every task is attempted unless `halt_on_error` is set, in which case the
    /// run stops after the first task that fails with an error. Failures are
    /// added to the context and each task's outcome is recorded as a
    /// [`TaskReport`].
    pub fn apply(&self, context: &mut Context<'_>, halt_on_error: bool) -> bool {
        let total = self.tasks.len();
        let mut result = true;

        for (index, task) in self.tasks.iter().enumerate() {
            context.begin_task(index, task.name());

            let status = match task.apply(context) {
                Ok(true) => TaskStatus::Applied,
                Ok(false) => TaskStatus::Skipped,
                Err(e) => {
                    error!("Task {} ({}) failed: {}", index, task.header(), e);
                    context.add_error(task_error_message(index, task.as_ref(), &e));
                    TaskStatus::Failed(e.to_string())
                }
            };

            let failed = matches!(status, TaskStatus::Failed(_));
            result &= status == TaskStatus::Applied;

            context.emit(ProgressEvent::TaskApplied {
                index,
                total,
                task_type: task.task_type().to_string(),
                status: status.clone(),
            });
            context.record_report(TaskReport {
                index,
                task_type: task.task_type().to_string(),
                name: task.name().map(str::to_string),
                status,
            });

            if failed && halt_on_error {
                info!("Halting apply after task {} of {}", index + 1, total);
                break;
            }
        }

        result
    }
}

fn task_error_message(index: usize, task: &dyn Task, error: &TaskError) -> String {
    match task.name() {
        Some(name) => format!("task {} \"{}\" ({}): {}", index, name, task.task_type(), error),
        None => format!("task {} ({}): {}", index, task.task_type(), error),
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Manifest [name: {}, author: {}, tasks: {}]",
            self.name.as_deref().unwrap_or("<unnamed>"),
            self.author,
            self.tasks.len()
        )
    }
}
