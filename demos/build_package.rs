//! Validate a mod project against a game install and build a distributable package
//!
//! Usage:
//!   cargo run --example build_package -- [--debug] [--validate-only]
//!       [--game-dir DIR] [--out PACKAGE.zip] SOURCE
//!
//! SOURCE is a mod directory, a manifest file inside one, or a zip package.

use anyhow::{Context as _, bail};
use clap::Parser;
use mod_installer::{
    ArchiveFs, ConsoleProgressReporter, DirectoryFs, Filesystem, IntoProgressCallback, ModPackage,
    TaskRegistry, default_game_directory, filesystem_for_root, logging, output_filename,
    report_validation,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "build_package")]
#[command(about = "Validates and builds 30XX mod packages")]
struct Options {
    /// Enable debug output
    #[arg(long)]
    debug: bool,
    /// Only validate the manifest; do not build a package
    #[arg(long)]
    validate_only: bool,
    /// Game directory to validate against; defaults to the Steam install location
    #[arg(long)]
    game_dir: Option<PathBuf>,
    /// Location of the generated package; defaults to the mod's name
    #[arg(long)]
    out: Option<PathBuf>,
    /// Mod directory, manifest file inside one, or zip package
    source: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let options = Options::parse();
    logging::init_tracing(options.debug);

    let source = options.source;
    if !source.exists() {
        bail!("source path does not exist: {}", source.display());
    }

    let game_dir = options
        .game_dir
        .or_else(default_game_directory)
        .context("unable to determine the game directory; pass --game-dir")?;
    if !game_dir.exists() {
        bail!("game directory does not exist: {}", game_dir.display());
    }
    let game = DirectoryFs::new(&game_dir);

    let source_fs = filesystem_for_root(&source);
    info!("Reading mod package @ {}", source_fs.root().display());

    let mut package = ModPackage::new(Arc::new(TaskRegistry::default()), source_fs)
        .with_progress_callback(ConsoleProgressReporter::new(options.debug).into_callback());
    package.read_from_filesystem()?;

    info!("Validating package against install @ {}", game.root().display());
    let context = package.validate(&game)?;
    if !report_validation(&context) {
        std::process::exit(1);
    }

    if options.validate_only {
        return Ok(());
    }

    let out = options
        .out
        .unwrap_or_else(|| PathBuf::from(output_filename(&package)));
    let target = ArchiveFs::new(&out);
    info!("Building mod package {} @ {}", package.name(), target.root().display());

    if let Err(e) = package.write_to_filesystem(&target) {
        error!("Failed to build package: {}", e);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition() {
        Options::command().debug_assert();
    }

    #[test]
    fn test_flags_parse() {
        let options = Options::try_parse_from([
            "build_package",
            "--debug",
            "--validate-only",
            "--game-dir",
            "/games/30XX",
            "--out",
            "better_icons.zip",
            "mods/better_icons",
        ])
        .unwrap();

        assert!(options.debug);
        assert!(options.validate_only);
        assert_eq!(options.game_dir, Some(PathBuf::from("/games/30XX")));
        assert_eq!(options.out, Some(PathBuf::from("better_icons.zip")));
        assert_eq!(options.source, PathBuf::from("mods/better_icons"));
    }

    #[test]
    fn test_source_is_required() {
        assert!(Options::try_parse_from(["build_package", "--debug"]).is_err());
    }
}
