//! Helpers for reading and building structured manifest nodes
//!
//! Manifests are deserialized into a generic [`Node`] tree before any task is
//! built, so the task registry never deals with document syntax.

use serde_yaml::{Mapping, Value};

use crate::error::ManifestError;
use crate::filesystem::normalize_package_path;

/// Structured manifest node
pub type Node = Value;

/// Borrow a node as a mapping
pub fn as_mapping<'a>(node: &'a Node, what: &'static str) -> Result<&'a Mapping, ManifestError> {
    node.as_mapping().ok_or(ManifestError::NotAMapping { what })
}

/// Look up a key, treating an explicit null the same as a missing key
pub fn field<'a>(map: &'a Mapping, key: &str) -> Option<&'a Node> {
    map.get(key).filter(|value| !value.is_null())
}

/// String form of a scalar node; `None` for sequences and mappings
fn scalar_string(value: &Node) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_string(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// Trim a scalar and cap it at `max_len` characters
///
/// The result is trimmed again after truncation so normalizing is idempotent.
pub fn normalize_str(key: &str, value: &Node, max_len: usize) -> Result<String, ManifestError> {
    let text = scalar_string(value).ok_or_else(|| ManifestError::InvalidField {
        field: key.to_string(),
        reason: "expected a string".to_string(),
    })?;

    let truncated: String = text.trim().chars().take(max_len).collect();
    Ok(truncated.trim_end().to_string())
}

/// Read an optional string field
pub fn optional_str(map: &Mapping, key: &str, max_len: usize) -> Result<Option<String>, ManifestError> {
    field(map, key)
        .map(|value| normalize_str(key, value, max_len))
        .transpose()
}

/// Read an optional package path field
pub fn optional_path(map: &Mapping, key: &str) -> Result<Option<String>, ManifestError> {
    field(map, key)
        .map(|value| {
            scalar_string(value)
                .map(|text| normalize_package_path(&text))
                .ok_or_else(|| ManifestError::InvalidField {
                    field: key.to_string(),
                    reason: "expected a path".to_string(),
                })
        })
        .transpose()
}

/// Interpret a node as a boolean: "true" or "yes" in any case, anything else is false
pub fn boolean(value: &Node) -> bool {
    scalar_string(value)
        .map(|text| matches!(text.trim().to_ascii_lowercase().as_str(), "true" | "yes"))
        .unwrap_or(false)
}

/// Insert a string value if present
pub fn insert_str(map: &mut Mapping, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        map.insert(Value::from(key), Value::from(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(text: &str) -> Mapping {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_normalize_str_trims_and_truncates() {
        let map = mapping("name: '   a very long name   '\n");
        let name = optional_str(&map, "name", 6).unwrap();
        assert_eq!(name.as_deref(), Some("a very"));

        let map = mapping("name: 'abc   def'\n");
        assert_eq!(optional_str(&map, "name", 5).unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn test_scalars_are_stringified() {
        let map = mapping("version: 3\nflag: false\n");
        assert_eq!(optional_str(&map, "version", 64).unwrap().as_deref(), Some("3"));
        assert_eq!(optional_str(&map, "flag", 64).unwrap().as_deref(), Some("false"));
    }

    #[test]
    fn test_null_and_missing_are_absent() {
        let map = mapping("name: ~\n");
        assert_eq!(optional_str(&map, "name", 64).unwrap(), None);
        assert_eq!(optional_str(&map, "desc", 64).unwrap(), None);
    }

    #[test]
    fn test_non_scalar_is_rejected() {
        let map = mapping("name: [a, b]\n");
        let err = optional_str(&map, "name", 64).unwrap_err();
        assert!(matches!(err, ManifestError::InvalidField { ref field, .. } if field == "name"));
    }

    #[test]
    fn test_paths_are_normalized() {
        let map = mapping("source: 'ui\\icon.png'\n");
        assert_eq!(optional_path(&map, "source").unwrap().as_deref(), Some("/ui/icon.png"));
    }

    #[test]
    fn test_boolean_like_values() {
        for truthy in ["true", "TRUE", "yes", "Yes"] {
            assert!(boolean(&Value::from(truthy)), "{truthy} should be true");
        }
        assert!(boolean(&Value::Bool(true)));

        for falsy in ["false", "no", "1", "on", ""] {
            assert!(!boolean(&Value::from(falsy)), "{falsy} should be false");
        }
        assert!(!boolean(&Value::Bool(false)));
        assert!(!boolean(&Value::Null));
    }
}
