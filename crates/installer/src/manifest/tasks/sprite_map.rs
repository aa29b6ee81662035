//! Sprite lookup in texture atlas descriptors

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Element chain of a sprite entry, leaf first
const SPRITE_PATH: [&str; 2] = ["subtexture", "textureatlas"];

const NAME_ATTRIBUTE: &str = "name";

/// Whether a sprite map declares a sprite with exactly this name
///
/// Sprites are `<SubTexture name="...">` elements directly under a root
/// `<TextureAtlas>`. Element names match in any case; the sprite name must
/// match exactly. The document is scanned once and the scan stops at the first
/// match.
pub fn sprite_exists_in_map(xml: &[u8], sprite: &str) -> Result<bool, quick_xml::Error> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut ancestors: Vec<String> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) => {
                if is_sprite(&ancestors, &element, sprite)? {
                    return Ok(true);
                }
                ancestors.push(element_name(&element));
            }
            Event::Empty(element) => {
                if is_sprite(&ancestors, &element, sprite)? {
                    return Ok(true);
                }
            }
            Event::End(_) => {
                ancestors.pop();
            }
            Event::Eof => return Ok(false),
            _ => {}
        }
        buf.clear();
    }
}

fn element_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.name().as_ref()).to_lowercase()
}

fn is_sprite(ancestors: &[String], element: &BytesStart<'_>, sprite: &str) -> Result<bool, quick_xml::Error> {
    if ancestors.len() + 1 != SPRITE_PATH.len() || element_name(element) != SPRITE_PATH[0] {
        return Ok(false);
    }
    if !ancestors.iter().rev().zip(&SPRITE_PATH[1..]).all(|(a, b)| a == b) {
        return Ok(false);
    }

    match element.try_get_attribute(NAME_ATTRIBUTE)? {
        Some(attribute) => Ok(attribute.unescape_value()? == sprite),
        None => Ok(false),
    }
}
