//! Replace a file in the target with one from the package

use serde_yaml::Value;
use tracing::debug;

use super::{Task, TaskHeader};
use crate::error::{ManifestError, TaskError};
use crate::manifest::context::Context;
use crate::manifest::node::{self, Node};

pub const SOURCE_KEY: &str = "source";
pub const TARGET_KEY: &str = "target";
pub const REQUIRE_TARGET_KEY: &str = "require_target";

/// Copies a source file verbatim over a target path
///
/// By default the target must already exist: the task replaces game files
/// rather than adding new ones unless `require_target` is turned off.
#[derive(Debug, Clone)]
pub struct FileCopyTask {
    header: TaskHeader,
    source: Option<String>,
    target: Option<String>,
    require_target: bool,
}

impl FileCopyTask {
    pub const TYPE: &'static str = "file";

    pub fn new() -> Self {
        Self {
            header: TaskHeader::default(),
            source: None,
            target: None,
            require_target: true,
        }
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn require_target(&self) -> bool {
        self.require_target
    }
}

impl Default for FileCopyTask {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for FileCopyTask {
    fn task_type(&self) -> &str {
        Self::TYPE
    }

    fn header(&self) -> &TaskHeader {
        &self.header
    }

    fn populate(&mut self, node: &Node) -> Result<(), ManifestError> {
        *self = Self::new();
        let map = self.header.populate(Self::TYPE, node)?;

        self.source = node::optional_path(map, SOURCE_KEY)?;
        self.target = node::optional_path(map, TARGET_KEY)?;
        if let Some(value) = node::field(map, REQUIRE_TARGET_KEY) {
            self.require_target = node::boolean(value);
        }
        Ok(())
    }

    fn export(&self) -> Node {
        let mut map = self.header.export(Self::TYPE);
        node::insert_str(&mut map, SOURCE_KEY, self.source.as_deref());
        node::insert_str(&mut map, TARGET_KEY, self.target.as_deref());
        map.insert(Value::from(REQUIRE_TARGET_KEY), Value::Bool(self.require_target));
        Value::Mapping(map)
    }

    fn list_resources(&self) -> Vec<String> {
        self.source.iter().cloned().collect()
    }

    fn validate(&self, context: &mut Context<'_>) -> bool {
        let mut result = true;
        let source_fs = context.source_filesystem();
        let target_fs = context.target_filesystem();

        match self.source.as_deref() {
            Some(source) if source_fs.is_file(source) => {}
            Some(source) => {
                context.add_error(format!(
                    "source file not present in source filesystem: {}, {}",
                    source, source_fs
                ));
                result = false;
            }
            None => {
                context.add_error("file task has no source path");
                result = false;
            }
        }

        match self.target.as_deref() {
            Some(target) if target_fs.is_dir(target) => {
                context.add_error(format!(
                    "target path is a directory in target filesystem: {}, {}",
                    target, target_fs
                ));
                result = false;
            }
            Some(target) => {
                if self.require_target && !target_fs.is_file(target) {
                    context.add_error(format!(
                        "target file not present in target filesystem: {}, {}",
                        target, target_fs
                    ));
                    result = false;
                }
            }
            None => {
                context.add_error("file task has no target path");
                result = false;
            }
        }

        result
    }

    fn apply(&self, context: &mut Context<'_>) -> Result<bool, TaskError> {
        if !self.validate(context) {
            return Ok(false);
        }
        // Both paths are present once validation passes
        let (Some(source), Some(target)) = (self.source.as_deref(), self.target.as_deref()) else {
            return Ok(false);
        };

        debug!("Running task \"{}\"", self.header);
        debug!(
            "  copying file {} to {}",
            context.source_filesystem().absolute_path(source),
            context.target_filesystem().absolute_path(target)
        );

        let contents = context.source_filesystem().read(source)?;
        context.write_target(target, &contents)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::{DirectoryFs, Filesystem};
    use tempfile::{TempDir, tempdir};

    fn task(text: &str) -> FileCopyTask {
        let mut task = FileCopyTask::new();
        task.populate(&serde_yaml::from_str(text).unwrap()).unwrap();
        task
    }

    fn roots() -> (TempDir, DirectoryFs, DirectoryFs) {
        let temp = tempdir().unwrap();
        let source = DirectoryFs::new(temp.path().join("mod"));
        let target = DirectoryFs::new(temp.path().join("game"));
        source.create().unwrap();
        target.create().unwrap();
        (temp, source, target)
    }

    #[test]
    fn test_populate_reads_fields() {
        let task = task("type: file\nsource: icon.png\ntarget: 'ui\\icon.png'\nrequire_target: No\n");
        assert_eq!(task.source(), Some("/icon.png"));
        assert_eq!(task.target(), Some("/ui/icon.png"));
        assert!(!task.require_target());
        assert_eq!(task.list_resources(), vec!["/icon.png".to_string()]);
    }

    #[test]
    fn test_require_target_defaults_to_true() {
        assert!(task("type: file\nsource: a\ntarget: b\n").require_target());
        assert!(task("type: file\nsource: a\ntarget: b\nrequire_target: YES\n").require_target());
    }

    #[test]
    fn test_missing_target_is_one_error() {
        let (_temp, source, target) = roots();
        source.write("icon.png", b"X").unwrap();

        let task = task("type: file\nsource: icon.png\ntarget: ui/icon.png\nrequire_target: true\n");
        let mut context = Context::new(&source, &target);

        assert!(!task.validate(&mut context));
        assert_eq!(context.errors().len(), 1);
        assert!(context.errors()[0].contains("/ui/icon.png"));
        assert!(context.errors()[0].starts_with("target file not present"));
    }

    #[test]
    fn test_optional_target_may_be_absent() {
        let (_temp, source, target) = roots();
        source.write("icon.png", b"X").unwrap();

        let task = task("type: file\nsource: icon.png\ntarget: ui/icon.png\nrequire_target: false\n");
        let mut context = Context::new(&source, &target);

        assert!(task.validate(&mut context));
        assert!(context.errors().is_empty());
    }

    #[test]
    fn test_missing_source_and_target_both_reported() {
        let (_temp, source, target) = roots();
        let task = task("type: file\nsource: icon.png\ntarget: ui/icon.png\n");
        let mut context = Context::new(&source, &target);

        assert!(!task.validate(&mut context));
        assert_eq!(context.errors().len(), 2);
    }

    #[test]
    fn test_directory_source_is_rejected() {
        let (_temp, source, target) = roots();
        source.write("art/inner.png", b"X").unwrap();
        target.write("ui/icon.png", b"original").unwrap();

        let task = task("type: file\nsource: art\ntarget: ui/icon.png\n");
        let mut context = Context::new(&source, &target);

        assert!(!task.validate(&mut context));
        assert_eq!(context.errors().len(), 1);
        assert!(context.errors()[0].starts_with("source file not present"));

        let mut context = Context::new(&source, &target);
        assert!(!task.apply(&mut context).unwrap());
        assert_eq!(target.read("ui/icon.png").unwrap(), b"original");
    }

    #[test]
    fn test_directory_target_is_rejected() {
        let (_temp, source, target) = roots();
        source.write("icon.png", b"X").unwrap();
        target.write("ui/icon.png/nested.png", b"original").unwrap();

        for require_target in ["true", "false"] {
            let task = task(&format!(
                "type: file\nsource: icon.png\ntarget: ui/icon.png\nrequire_target: {}\n",
                require_target
            ));
            let mut context = Context::new(&source, &target);

            assert!(!task.validate(&mut context));
            assert_eq!(context.errors().len(), 1);
            assert!(context.errors()[0].starts_with("target path is a directory"));
        }
    }

    #[test]
    fn test_apply_overwrites_target() {
        let (_temp, source, target) = roots();
        source.write("icon.png", b"X").unwrap();
        target.write("ui/icon.png", b"original").unwrap();

        let task = task("type: file\nsource: icon.png\ntarget: ui/icon.png\n");
        let mut context = Context::new(&source, &target);

        assert!(task.apply(&mut context).unwrap());
        assert!(context.errors().is_empty());
        assert_eq!(target.read("ui/icon.png").unwrap(), b"X");
        assert_eq!(context.journal().len(), 1);
    }

    #[test]
    fn test_apply_skips_when_invalid() {
        let (_temp, source, target) = roots();
        source.write("icon.png", b"X").unwrap();

        let task = task("type: file\nsource: icon.png\ntarget: ui/icon.png\n");
        let mut context = Context::new(&source, &target);

        assert!(!task.apply(&mut context).unwrap());
        assert!(!target.file_exists("ui/icon.png"));
        assert!(context.journal().is_empty());
        assert_eq!(context.errors().len(), 1);
    }
}
