//! Task registry mapping type tags to task constructors
//!
//! The registry is independent of any manifest and can be shared across
//! packages. Built-in variants are registered by [`TaskRegistry::with_builtin_tasks`];
//! integrators add their own with [`TaskRegistry::register`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_yaml::Value;
use tracing::debug;

use crate::error::ManifestError;
use crate::manifest::node::{self, Node};
use crate::manifest::tasks::{FileCopyTask, SpriteCheckTask, TYPE_KEY, Task};

/// Constructor for an empty task of one variant
pub type TaskConstructor = Arc<dyn Fn() -> Box<dyn Task> + Send + Sync>;

/// Registry of constructible task variants keyed by type tag
#[derive(Clone)]
pub struct TaskRegistry {
    constructors: HashMap<String, TaskConstructor>,
}

impl TaskRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Create a registry holding the `file` and `sprite` variants
    pub fn with_builtin_tasks() -> Self {
        let mut registry = Self::new();
        registry.constructors.insert(
            FileCopyTask::TYPE.to_string(),
            Arc::new(|| Box::new(FileCopyTask::new()) as Box<dyn Task>),
        );
        registry.constructors.insert(
            SpriteCheckTask::TYPE.to_string(),
            Arc::new(|| Box::new(SpriteCheckTask::new()) as Box<dyn Task>),
        );
        registry
    }

    /// Register a constructor for a type tag, replacing any previous one
    ///
    /// The tag must be non-empty and the constructor must build tasks whose
    /// own type tag is `tag`.
    pub fn register<F>(&mut self, tag: &str, constructor: F) -> Result<(), ManifestError>
    where
        F: Fn() -> Box<dyn Task> + Send + Sync + 'static,
    {
        if tag.is_empty() {
            return Err(ManifestError::EmptyTaskType);
        }

        let produced = constructor();
        if produced.task_type() != tag {
            return Err(ManifestError::ConstructorMismatch {
                tag: tag.to_string(),
                produced: produced.task_type().to_string(),
            });
        }

        if self.constructors.insert(tag.to_string(), Arc::new(constructor)).is_some() {
            debug!("Replaced task constructor for '{}'", tag);
        }
        Ok(())
    }

    /// Remove a type tag; fails if the tag is not registered
    pub fn remove(&mut self, tag: &str) -> Result<(), ManifestError> {
        self.constructors
            .remove(tag)
            .map(|_| ())
            .ok_or_else(|| ManifestError::UnknownTaskType(tag.to_string()))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
    }

    /// Registered tags in sorted order
    pub fn task_types(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Construct an empty task for a tag
    pub fn construct(&self, tag: &str) -> Result<Box<dyn Task>, ManifestError> {
        self.constructors
            .get(tag)
            .map(|constructor| constructor())
            .ok_or_else(|| ManifestError::UnknownTaskType(tag.to_string()))
    }

    /// Construct and populate a task from its node
    pub fn build_from_node(&self, node: &Node) -> Result<Box<dyn Task>, ManifestError> {
        let map = node
            .as_mapping()
            .ok_or_else(|| ManifestError::InvalidTaskNode("task node is not a mapping".to_string()))?;

        let tag = match node::field(map, TYPE_KEY) {
            Some(Value::String(tag)) => tag.as_str(),
            Some(_) => {
                return Err(ManifestError::InvalidTaskNode(
                    "task type is not a string".to_string(),
                ));
            }
            None => {
                return Err(ManifestError::InvalidTaskNode(
                    "task node lacks a type field".to_string(),
                ));
            }
        };

        let mut task = self.construct(tag)?;
        task.populate(node)?;
        Ok(task)
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::with_builtin_tasks()
    }
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("task_types", &self.task_types())
            .finish()
    }
}
