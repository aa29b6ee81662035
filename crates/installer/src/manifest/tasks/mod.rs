//! Task variants
//!
//! A task is one declarative unit of a manifest. Every variant shares a
//! [`TaskHeader`] (name, description and tags) and implements the [`Task`]
//! capability interface; the [`TaskRegistry`](crate::manifest::TaskRegistry)
//! maps each type tag to a constructor.

pub mod file_copy;
pub mod sprite_check;
pub mod sprite_map;

pub use file_copy::FileCopyTask;
pub use sprite_check::SpriteCheckTask;
pub use sprite_map::sprite_exists_in_map;

use std::collections::BTreeSet;
use std::fmt;

use serde_yaml::{Mapping, Value};

use crate::error::{ManifestError, TaskError};
use crate::manifest::context::Context;
use crate::manifest::node::{self, Node};

pub const NAME_KEY: &str = "name";
pub const DESC_KEY: &str = "desc";
pub const TAGS_KEY: &str = "tags";
pub const TYPE_KEY: &str = "type";

pub const MAX_NAME_LENGTH: usize = 64;
pub const MAX_DESC_LENGTH: usize = 1024;
pub const MAX_TAG_LENGTH: usize = 255;

/// Capability interface shared by every task variant
pub trait Task: fmt::Debug + Send + Sync {
    /// Type tag fixed at construction
    fn task_type(&self) -> &str;

    fn header(&self) -> &TaskHeader;

    /// Reset the task, then read its fields from a node
    ///
    /// Fails if the node's `type` does not match [`Task::task_type`].
    fn populate(&mut self, node: &Node) -> Result<(), ManifestError>;

    /// Serialize the task into a node that [`Task::populate`] accepts
    fn export(&self) -> Node;

    /// Source-relative paths this task reads, for packaging
    fn list_resources(&self) -> Vec<String>;

    /// Check every precondition without touching either filesystem
    ///
    /// Rule violations are added to the context; the return value is the
    /// overall verdict.
    fn validate(&self, context: &mut Context<'_>) -> bool;

    /// Re-validate, then perform the mutation
    ///
    /// Returns `Ok(false)` when validation failed and nothing was written.
    fn apply(&self, context: &mut Context<'_>) -> Result<bool, TaskError>;

    fn name(&self) -> Option<&str> {
        self.header().name.as_deref()
    }
}

/// Fields common to every task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskHeader {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tags: BTreeSet<String>,
}

impl TaskHeader {
    /// Reset and read the common fields, checking the node's type tag
    ///
    /// Returns the node as a mapping so variants can read their own fields.
    pub fn populate<'n>(&mut self, task_type: &str, node: &'n Node) -> Result<&'n Mapping, ManifestError> {
        let map = node::as_mapping(node, "task")?;
        *self = Self::default();

        let found = node::field(map, TYPE_KEY).and_then(Value::as_str);
        if found != Some(task_type) {
            return Err(ManifestError::TypeMismatch {
                expected: task_type.to_string(),
                found: found.unwrap_or("<none>").to_string(),
            });
        }

        self.name = node::optional_str(map, NAME_KEY, MAX_NAME_LENGTH)?;
        self.description = node::optional_str(map, DESC_KEY, MAX_DESC_LENGTH)?;

        match node::field(map, TAGS_KEY) {
            None => {}
            Some(Value::Sequence(tags)) => {
                for tag in tags {
                    self.add_tag(node::normalize_str(TAGS_KEY, tag, MAX_TAG_LENGTH)?);
                }
            }
            Some(tag) => self.add_tag(node::normalize_str(TAGS_KEY, tag, MAX_TAG_LENGTH)?),
        }

        Ok(map)
    }

    fn add_tag(&mut self, tag: String) {
        if !tag.is_empty() {
            self.tags.insert(tag);
        }
    }

    /// Export the common fields plus the type tag
    pub fn export(&self, task_type: &str) -> Mapping {
        let mut map = Mapping::new();
        node::insert_str(&mut map, NAME_KEY, self.name.as_deref());
        node::insert_str(&mut map, DESC_KEY, self.description.as_deref());
        if !self.tags.is_empty() {
            let tags = self.tags.iter().map(|t| Value::from(t.as_str())).collect();
            map.insert(Value::from(TAGS_KEY), Value::Sequence(tags));
        }
        map.insert(Value::from(TYPE_KEY), Value::from(task_type));
        map
    }
}

impl fmt::Display for TaskHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name.as_deref().unwrap_or("<unnamed>"))?;
        if !self.tags.is_empty() {
            let tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
            write!(f, " [{}]", tags.join(", "))?;
        }
        Ok(())
    }
}
