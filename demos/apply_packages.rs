//! Validate and apply one or more mod packages to a game install
//!
//! Usage:
//!   cargo run --example apply_packages -- [--debug] [--validate-only]
//!       [--game-dir DIR] PACKAGE...

use anyhow::{Context as _, bail};
use clap::Parser;
use mod_installer::{
    ConsoleProgressReporter, DirectoryFs, Filesystem, IntoProgressCallback, ModPackage,
    TaskRegistry, TaskStatus, default_game_directory, filesystem_for_root, logging,
    report_validation,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "apply_packages")]
#[command(about = "Validates and applies 30XX mod packages")]
struct Options {
    /// Enable debug output
    #[arg(long)]
    debug: bool,
    /// Only validate the packages; do not apply them
    #[arg(long)]
    validate_only: bool,
    /// Game directory to apply to; defaults to the Steam install location
    #[arg(long)]
    game_dir: Option<PathBuf>,
    /// Mod packages to apply, in order
    #[arg(required = true)]
    packages: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let options = Options::parse();
    logging::init_tracing(options.debug);
    let debug = options.debug;
    let validate_only = options.validate_only;
    let packages = options.packages;

    let game_dir = options
        .game_dir
        .or_else(default_game_directory)
        .context("unable to determine the game directory; pass --game-dir")?;
    if !game_dir.exists() {
        bail!("game directory does not exist: {}", game_dir.display());
    }
    let game = DirectoryFs::new(&game_dir);

    // One registry serves every package
    let registry = Arc::new(TaskRegistry::default());
    let reporter = ConsoleProgressReporter::new(debug).into_callback();

    let mut loaded = Vec::with_capacity(packages.len());
    for path in &packages {
        if !path.exists() {
            bail!("package does not exist: {}", path.display());
        }

        let mut package = ModPackage::new(registry.clone(), filesystem_for_root(path))
            .with_progress_callback(reporter.clone());
        package.read_from_filesystem()?;

        info!("Validating {} against install @ {}", package.name(), game.root().display());
        let context = package.validate(&game)?;
        if !report_validation(&context) {
            std::process::exit(1);
        }
        drop(context);
        loaded.push(package);
    }

    if validate_only {
        return Ok(());
    }

    for package in &loaded {
        info!("Applying {}", package.name());
        let context = package.apply(&game)?;

        if context.has_errors() {
            context.log_diagnostics();
            error!("Failed to apply {}", package.name());
            warn!(
                "The game installation may be in an undefined state; verify the game files before playing"
            );
            let committed: Vec<String> = context
                .task_reports()
                .iter()
                .filter(|r| r.status == TaskStatus::Applied)
                .map(|r| r.name.clone().unwrap_or_else(|| format!("#{}", r.index)))
                .collect();
            if !committed.is_empty() {
                warn!("Tasks already applied: {}", committed.join(", "));
            }
            std::process::exit(1);
        }
    }

    info!("Applied {} package(s)", loaded.len());
    Ok(())
}
