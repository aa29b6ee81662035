//! Check that a sprite exists in the game's texture atlas

use serde_yaml::Value;
use tracing::warn;

use super::sprite_map::sprite_exists_in_map;
use super::{Task, TaskHeader};
use crate::error::{ManifestError, TaskError};
use crate::manifest::context::Context;
use crate::manifest::node::{self, Node};

pub const SOURCE_KEY: &str = "source";
pub const SPRITE_SHEET_KEY: &str = "sprite_sheet";
pub const SPRITE_MAP_KEY: &str = "sprite_map";
pub const SPRITE_KEY: &str = "sprite";

pub const MAX_SPRITE_LENGTH: usize = 128;

/// Validate-only task for sprite replacement
///
/// Validation checks the replacement asset and the target sprite sheet, then
/// looks the sprite up in the sprite map. Merging into the sheet is not
/// implemented, so apply always fails with [`TaskError::Unsupported`].
#[derive(Debug, Clone, Default)]
pub struct SpriteCheckTask {
    header: TaskHeader,
    source: Option<String>,
    sprite_sheet: Option<String>,
    sprite_map: Option<String>,
    sprite: Option<String>,
}

impl SpriteCheckTask {
    pub const TYPE: &'static str = "sprite";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn sprite_sheet(&self) -> Option<&str> {
        self.sprite_sheet.as_deref()
    }

    pub fn sprite_map(&self) -> Option<&str> {
        self.sprite_map.as_deref()
    }

    pub fn sprite(&self) -> Option<&str> {
        self.sprite.as_deref()
    }

    /// Look the sprite up, recording an error if it is missing or the map is unreadable
    fn check_sprite(&self, context: &mut Context<'_>, sprite_map: &str) -> bool {
        let Some(sprite) = self.sprite.as_deref() else {
            context.add_error("sprite task has no sprite name");
            return false;
        };

        let target_fs = context.target_filesystem();
        let contents = match target_fs.read(sprite_map) {
            Ok(contents) => contents,
            Err(e) => {
                context.add_error(format!("cannot read target sprite map: {}", e));
                return false;
            }
        };

        match sprite_exists_in_map(&contents, sprite) {
            Ok(true) => true,
            Ok(false) => {
                context.add_error(format!(
                    "target sprite map does not contain the target sprite: {}, {}",
                    sprite_map, sprite
                ));
                false
            }
            Err(e) => {
                context.add_error(format!(
                    "target sprite map is not valid XML: {}: {}",
                    target_fs.absolute_path(sprite_map),
                    e
                ));
                false
            }
        }
    }
}

impl Task for SpriteCheckTask {
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
        self.sprite_sheet = node::optional_path(map, SPRITE_SHEET_KEY)?;
        self.sprite_map = node::optional_path(map, SPRITE_MAP_KEY)?;
        self.sprite = node::optional_str(map, SPRITE_KEY, MAX_SPRITE_LENGTH)?;
        Ok(())
    }

    fn export(&self) -> Node {
        let mut map = self.header.export(Self::TYPE);
        node::insert_str(&mut map, SOURCE_KEY, self.source.as_deref());
        node::insert_str(&mut map, SPRITE_SHEET_KEY, self.sprite_sheet.as_deref());
        node::insert_str(&mut map, SPRITE_MAP_KEY, self.sprite_map.as_deref());
        node::insert_str(&mut map, SPRITE_KEY, self.sprite.as_deref());
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
                context.add_error("sprite task has no source path");
                result = false;
            }
        }

        match self.sprite_sheet.as_deref() {
            Some(sheet) if target_fs.is_file(sheet) => {}
            Some(sheet) => {
                context.add_error(format!(
                    "target sprite sheet not present in target filesystem: {}, {}",
                    sheet, target_fs
                ));
                result = false;
            }
            None => {
                context.add_error("sprite task has no sprite sheet path");
                result = false;
            }
        }

        match self.sprite_map.as_deref() {
            Some(sprite_map) if target_fs.is_file(sprite_map) => {
                result &= self.check_sprite(context, sprite_map);
            }
            Some(sprite_map) => {
                context.add_error(format!(
                    "target sprite map not present in target filesystem: {}, {}",
                    sprite_map, target_fs
                ));
                result = false;
            }
            None => {
                context.add_error("sprite task has no sprite map path");
                result = false;
            }
        }

        result
    }

    fn apply(&self, _context: &mut Context<'_>) -> Result<bool, TaskError> {
        warn!("Sprite task \"{}\" cannot be applied; sprite sheet merging is not implemented", self.header);
        Err(TaskError::Unsupported {
            task_type: Self::TYPE.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::{DirectoryFs, Filesystem};
    use tempfile::tempdir;

    const SPRITE_NODE: &str = "type: sprite\nsource: sprites/idle.png\nsprite_sheet: gfx/sheet.png\nsprite_map: gfx/sheet.xml\nsprite: Idle_0\n";

    fn task(text: &str) -> SpriteCheckTask {
        let mut task = SpriteCheckTask::new();
        task.populate(&serde_yaml::from_str(text).unwrap()).unwrap();
        task
    }

    fn setup(atlas: &str) -> (tempfile::TempDir, DirectoryFs, DirectoryFs) {
        let temp = tempdir().unwrap();
        let source = DirectoryFs::new(temp.path().join("mod"));
        let target = DirectoryFs::new(temp.path().join("game"));
        source.write("sprites/idle.png", b"png").unwrap();
        target.write("gfx/sheet.png", b"sheet").unwrap();
        target.write("gfx/sheet.xml", atlas.as_bytes()).unwrap();
        (temp, source, target)
    }

    #[test]
    fn test_populate_reads_fields() {
        let task = task(SPRITE_NODE);
        assert_eq!(task.source(), Some("/sprites/idle.png"));
        assert_eq!(task.sprite_sheet(), Some("/gfx/sheet.png"));
        assert_eq!(task.sprite_map(), Some("/gfx/sheet.xml"));
        assert_eq!(task.sprite(), Some("Idle_0"));
        assert_eq!(task.list_resources(), vec!["/sprites/idle.png".to_string()]);
    }

    #[test]
    fn test_validate_finds_sprite() {
        let (_temp, source, target) = setup(r#"<TextureAtlas><SubTexture name="Idle_0"/></TextureAtlas>"#);
        let mut context = Context::new(&source, &target);

        assert!(task(SPRITE_NODE).validate(&mut context));
        assert!(context.errors().is_empty());
    }

    #[test]
    fn test_validate_sprite_name_case_matters() {
        let (_temp, source, target) = setup(r#"<TextureAtlas><SubTexture name="Idle_0"/></TextureAtlas>"#);
        let mut context = Context::new(&source, &target);

        let task = task(&SPRITE_NODE.replace("Idle_0", "idle_0"));
        assert!(!task.validate(&mut context));
        assert_eq!(context.errors().len(), 1);
        assert!(context.errors()[0].contains("idle_0"));
    }

    #[test]
    fn test_validate_reports_every_missing_file() {
        let temp = tempdir().unwrap();
        let source = DirectoryFs::new(temp.path().join("mod"));
        let target = DirectoryFs::new(temp.path().join("game"));
        let mut context = Context::new(&source, &target);

        assert!(!task(SPRITE_NODE).validate(&mut context));
        assert_eq!(context.errors().len(), 3);
    }

    #[test]
    fn test_directories_do_not_count_as_files() {
        let (_temp, source, target) = setup(r#"<TextureAtlas><SubTexture name="Idle_0"/></TextureAtlas>"#);
        let mut context = Context::new(&source, &target);

        let task = task(&SPRITE_NODE
            .replace("sprites/idle.png", "sprites")
            .replace("sprite_sheet: gfx/sheet.png", "sprite_sheet: gfx"));
        assert!(!task.validate(&mut context));
        assert_eq!(context.errors().len(), 2);
        assert!(context.errors()[0].starts_with("source file not present"));
        assert!(context.errors()[1].starts_with("target sprite sheet not present"));
    }

    #[test]
    fn test_malformed_map_is_an_error_message() {
        let (_temp, source, target) = setup("<TextureAtlas><SubTexture name=\"x\"/></Oops>");
        let mut context = Context::new(&source, &target);

        assert!(!task(SPRITE_NODE).validate(&mut context));
        assert_eq!(context.errors().len(), 1);
        assert!(context.errors()[0].contains("not valid XML"));
    }

    #[test]
    fn test_apply_is_unsupported() {
        let (_temp, source, target) = setup(r#"<TextureAtlas><SubTexture name="Idle_0"/></TextureAtlas>"#);
        let mut context = Context::new(&source, &target);

        let err = task(SPRITE_NODE).apply(&mut context).unwrap_err();
        assert!(matches!(err, TaskError::Unsupported { ref task_type } if task_type == "sprite"));
        assert!(context.journal().is_empty());
    }
}
