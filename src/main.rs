//! Yuno OS stage3 CLI
//!
//! Runs the stage3 step outside the graphical installer.
//!
//! # Usage
//!
//! ```bash
//! # Check host tools, disk space and mirror reachability
//! yuno-stage3 --root /mnt/gentoo preflight
//!
//! # Show which tarball would be installed, without downloading
//! yuno-stage3 --init-system systemd resolve
//!
//! # Download, verify and extract onto /mnt/gentoo
//! yuno-stage3 --root /mnt/gentoo --init-system openrc install
//!
//! # Same, with settings from the installer's storage file
//! yuno-stage3 --config /tmp/yuno/storage.toml install
//!
//! # List cached tarballs
//! yuno-stage3 status
//!
//! # Known Gentoo mirrors
//! yuno-stage3 mirrors
//! ```

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use yuno_stage3::config::{
    self, CACHE_DIR_KEY, DESKTOP_TYPE_KEY, INIT_SYSTEM_KEY, KNOWN_MIRRORS, MIRROR_KEY,
    ROOT_MOUNT_POINT_KEY,
};
use yuno_stage3::download::cache_path;
use yuno_stage3::fetch::HttpFetcher;
use yuno_stage3::locate::{self, SourceLocator};
use yuno_stage3::preflight::{CacheStatus, PreflightChecker};
use yuno_stage3::progress::BarProgress;
use yuno_stage3::{variant, GlobalStorage, InstallConfig, Pipeline, Stage3Error, StageSettings};

#[derive(Parser)]
#[command(name = "yuno-stage3")]
#[command(author, version, about = "Yuno OS stage3 installer step", long_about = None)]
struct Cli {
    #[command(flatten)]
    storage: StorageArgs,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Installer settings. Flags override values from `--config`.
#[derive(Args)]
struct StorageArgs {
    /// Flat TOML file of installer storage keys (initSystem, rootMountPoint, ...)
    #[arg(long, env = "YUNO_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Target root to extract onto
    #[arg(long, env = "YUNO_ROOT", global = true)]
    root: Option<PathBuf>,

    /// Init system (systemd or openrc)
    #[arg(long, env = "YUNO_INIT_SYSTEM", global = true)]
    init_system: Option<String>,

    /// Desktop type
    #[arg(long, global = true)]
    desktop_type: Option<String>,

    /// Gentoo mirror base URL
    #[arg(long, env = "YUNO_MIRROR", global = true)]
    mirror: Option<String>,

    /// Directory for cached tarballs
    #[arg(long, env = "YUNO_CACHE_DIR", global = true)]
    cache_dir: Option<PathBuf>,
}

impl StorageArgs {
    fn load(&self) -> Result<GlobalStorage> {
        let mut storage = match &self.config {
            Some(path) => GlobalStorage::from_toml_file(path)?,
            None => GlobalStorage::new(),
        };

        if let Some(root) = &self.root {
            storage.insert(ROOT_MOUNT_POINT_KEY, root.display().to_string());
        }
        if let Some(init) = &self.init_system {
            storage.insert(INIT_SYSTEM_KEY, init.as_str());
        }
        if let Some(desktop) = &self.desktop_type {
            storage.insert(DESKTOP_TYPE_KEY, desktop.as_str());
        }
        if let Some(mirror) = &self.mirror {
            storage.insert(MIRROR_KEY, mirror.as_str());
        }
        if let Some(cache_dir) = &self.cache_dir {
            storage.insert(CACHE_DIR_KEY, cache_dir.display().to_string());
        }

        Ok(storage)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Download, verify and extract the stage3 onto the root
    Install,

    /// Show the tarball that would be installed (no download)
    Resolve,

    /// Check host tools, disk space and mirror reachability
    Preflight,

    /// Show configuration and cached tarballs
    Status,

    /// List well-known Gentoo mirrors
    Mirrors,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = cli.storage.load().and_then(|storage| match cli.command {
        Commands::Install => cmd_install(&storage),
        Commands::Resolve => cmd_resolve(&storage),
        Commands::Preflight => cmd_preflight(&storage),
        Commands::Status => cmd_status(&storage),
        Commands::Mirrors => cmd_mirrors(&storage),
    });

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_install(storage: &GlobalStorage) -> Result<()> {
    let progress = BarProgress::new();
    let pipeline = Pipeline::new(storage, &progress)?;

    match pipeline.run() {
        Ok(()) => {
            progress.finish("done");
            println!("\n=== Stage3 installed ===");
            Ok(())
        }
        Err(e) => {
            progress.abandon("failed");
            Err(install_failure(&e))
        }
    }
}

/// The {title, detail} pair as a CLI error.
fn install_failure(e: &Stage3Error) -> anyhow::Error {
    anyhow!("{}\n  {}", e.title(), e.detail())
}

fn cmd_resolve(storage: &GlobalStorage) -> Result<()> {
    let install = InstallConfig::from_provider(storage);
    let settings = StageSettings::from_provider(storage);
    let fetcher = HttpFetcher::new()?;

    let variant = variant::resolve(&install);
    let reference = SourceLocator::new(&fetcher, &settings).locate(&variant);
    let cached = cache_path(&reference, &settings.cache_dir);

    println!("Variant:   {}", variant);
    println!("Index:     {}", locate::index_url(&settings));
    println!("Archive:   {}", reference.url);
    println!("Checksum:  {}", reference.checksum_url());
    println!("Signature: {}", reference.signature_url());
    if cached.exists() {
        println!("Cache:     {} (cached)", cached.display());
    } else {
        println!("Cache:     {} (not downloaded)", cached.display());
    }

    Ok(())
}

fn cmd_preflight(storage: &GlobalStorage) -> Result<()> {
    let settings = StageSettings::from_provider(storage);
    let mut checker = PreflightChecker::new(settings);
    if let Some(root) = config::root_mount_point(storage) {
        checker = checker.with_root(root);
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let report = runtime.block_on(checker.run_all());
    report.print_summary();

    if !report.is_ok() {
        bail!("{} preflight check(s) failed", report.errors().len());
    }
    Ok(())
}

fn cmd_status(storage: &GlobalStorage) -> Result<()> {
    let install = InstallConfig::from_provider(storage);
    let settings = StageSettings::from_provider(storage);

    println!("Yuno OS Stage3 Status");
    println!("=====================");
    println!();
    println!("Configuration:");
    println!("  Init System:  {}", install.init_system);
    println!("  Desktop:      {}", install.desktop_type);
    println!("  Variant:      {}", variant::resolve(&install));
    println!("  Mirror:       {}", settings.mirror);
    match config::root_mount_point(storage) {
        Some(root) => println!("  Root:         {}", root.display()),
        None => println!("  Root:         NOT SET (install will fail)"),
    }
    println!();

    CacheStatus::scan(&settings.cache_dir).print();

    Ok(())
}

fn cmd_mirrors(storage: &GlobalStorage) -> Result<()> {
    let settings = StageSettings::from_provider(storage);

    for mirror in KNOWN_MIRRORS {
        let marker = if *mirror == settings.mirror { "*" } else { " " };
        println!("{} {}", marker, mirror);
    }
    if !KNOWN_MIRRORS.contains(&settings.mirror.as_str()) {
        println!("* {} (custom)", settings.mirror);
    }

    Ok(())
}
