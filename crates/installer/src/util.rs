//! Helpers shared by the packaging and apply front ends

use std::path::PathBuf;

use tracing::{error, info};

use crate::manifest::Context;
use crate::package::ModPackage;

/// Steam install directory name of the game
pub const GAME_DIRECTORY_NAME: &str = "30XX";

const UNSAFE_FILENAME_CHARS: &[char] = &['\'', '"', '%', ':', '/', ',', '.', '\\', '[', ']', '<', '>', '*', '?'];

/// Turn a mod name into something safe to use as a file name
///
/// Lowercases, replaces spaces with underscores and drops non-ASCII and
/// punctuation that is unsafe on common filesystems.
pub fn sanitize_filename(name: &str) -> String {
    name.to_lowercase()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii() && !UNSAFE_FILENAME_CHARS.contains(c))
        .collect()
}

/// Default archive name for a package built from `package`
pub fn output_filename(package: &ModPackage) -> String {
    format!("{}.zip", sanitize_filename(&package.name()))
}

/// Default Steam location of the game on this platform, if known
pub fn default_game_directory() -> Option<PathBuf> {
    if cfg!(windows) {
        Some(PathBuf::from(r"C:\Program Files (x86)\Steam\steamapps\common").join(GAME_DIRECTORY_NAME))
    } else if cfg!(target_os = "linux") {
        dirs::home_dir().map(|home| {
            home.join(".local/share/Steam/SteamApps/common")
                .join(GAME_DIRECTORY_NAME)
        })
    } else {
        None
    }
}

/// Log the outcome of a validation run and return whether it was clean
pub fn report_validation(context: &Context<'_>) -> bool {
    if context.has_errors() {
        error!("Mod package has {} error(s) which require resolution:", context.errors().len());
        context.log_diagnostics();
        return false;
    }

    for warning in context.warnings() {
        tracing::warn!("{}", warning);
    }
    info!("Package appears to be valid");
    true
}
