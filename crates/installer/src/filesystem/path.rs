//! Package path normalization
//!
//! Every path handed to a [`Filesystem`](super::Filesystem) goes through
//! [`normalize_package_path`] first, so both backends address entries
//! identically. Normalized paths are POSIX-style and rooted at `/`; `..`
//! never climbs above that root, which gives packages chroot-like semantics.

/// Paths longer than this (in characters) are truncated before normalization
pub const MAX_PATH_LENGTH: usize = 256;

/// Normalize a Windows or POSIX path into the rooted form used inside packages
///
/// Backslashes, forward slashes and drive/device separators (`:`) all count as
/// separators. Leading whitespace inside a component is part of the name;
/// trailing whitespace is dropped, as Windows does for file names. Empty and
/// `.` components are dropped and `..` pops the previous component, clamping
/// at the root.
pub fn normalize_package_path(path: &str) -> String {
    let truncated: String = path.trim().chars().take(MAX_PATH_LENGTH).collect();

    let mut parts: Vec<&str> = Vec::new();
    for component in truncated.split(['/', '\\', ':']) {
        match component.trim_end() {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    format!("/{}", parts.join("/"))
}

/// Address of a normalized path inside an archive container
///
/// Some archive readers synthesize a bogus root directory for entries with a
/// leading separator, so entries are always stored without one.
pub fn archive_entry_name(path: &str) -> String {
    normalize_package_path(path)
        .trim_start_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mixed_separators_and_parent_components() {
        assert_eq!(normalize_package_path("a\\b/../c"), "/a/c");
    }

    #[test]
    fn test_leading_slash_is_preserved() {
        assert_eq!(normalize_package_path("/ui/icon.png"), "/ui/icon.png");
        assert_eq!(normalize_package_path("ui/icon.png"), "/ui/icon.png");
    }

    #[test]
    fn test_drive_separator_collapses() {
        assert_eq!(normalize_package_path("C:\\Games\\30XX\\data.xml"), "/C/Games/30XX/data.xml");
    }

    #[test]
    fn test_parent_cannot_escape_root() {
        assert_eq!(normalize_package_path("../../etc/passwd"), "/etc/passwd");
        assert_eq!(normalize_package_path(".."), "/");
        assert_eq!(normalize_package_path(""), "/");
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        assert_eq!(normalize_package_path("  sprites/idle.png \n"), "/sprites/idle.png");
    }

    #[test]
    fn test_leading_space_in_component_is_kept() {
        assert_eq!(normalize_package_path("ui/ icon.png"), "/ui/ icon.png");
        assert_ne!(normalize_package_path("ui/ icon.png"), normalize_package_path("ui/icon.png"));
        assert_eq!(normalize_package_path("a/ b /c"), "/a/ b/c");
        assert_eq!(normalize_package_path("a/ /b"), "/a/b");
        assert_eq!(normalize_package_path("a/ ../b"), "/a/ ../b");
        assert_eq!(normalize_package_path("a/.. /b"), "/b");
    }

    #[test]
    fn test_overlong_paths_are_truncated() {
        let long = "a".repeat(MAX_PATH_LENGTH + 50);
        let normalized = normalize_package_path(&long);
        assert_eq!(normalized.len(), MAX_PATH_LENGTH + 1);
    }

    #[test]
    fn test_archive_entry_strips_root() {
        assert_eq!(archive_entry_name("/ui/icon.png"), "ui/icon.png");
        assert_eq!(archive_entry_name("ui\\icon.png"), "ui/icon.png");
        assert_eq!(archive_entry_name("/"), "");
    }

    proptest! {
        #[test]
        fn prop_normalized_paths_are_rooted_and_clean(path in "[a-zA-Z0-9./\\\\: _-]{0,80}") {
            let normalized = normalize_package_path(&path);
            prop_assert!(normalized.starts_with('/'));
            for component in normalized.split('/').skip(1) {
                prop_assert!(component != "..");
                prop_assert!(component != ".");
            }
        }

        #[test]
        fn prop_normalization_is_idempotent(path in "[a-zA-Z0-9./\\\\: _-]{0,80}") {
            let once = normalize_package_path(&path);
            prop_assert_eq!(normalize_package_path(&once), once.clone());
        }
    }
}
