//! Preflight checks for the stage3 step.
//!
//! Validates the host BEFORE the installer commits to a multi-gigabyte
//! download. Advisory only: [`crate::pipeline::Pipeline`] never runs these.
//!
//! # Checks Performed
//!
//! - **Host tools**: wget, GNU tar (xattrs) and xz are usable; gpg is optional
//! - **Disk space**: room for the tarball in the cache and the unpacked root
//! - **Network**: the mirror's stage3 index can be fetched
//! - **Cache status**: reports stage3 tarballs already downloaded
//!
//! # Usage
//!
//! ```rust,ignore
//! use yuno_stage3::preflight::PreflightChecker;
//!
//! let checker = PreflightChecker::new(settings).with_root("/mnt/gentoo");
//! let report = runtime.block_on(checker.run_all());
//!
//! if !report.is_ok() {
//!     report.print_summary();
//!     std::process::exit(1);
//! }
//! ```

mod disk_space;
mod host_tools;
mod network;

pub use disk_space::{
    available_space, check_disk_space, MIN_CACHE_SPACE_BYTES, MIN_ROOT_SPACE_BYTES,
};
pub use host_tools::{check_host_tools, has_tool};
pub use network::{check_network, check_network_with};

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::StageSettings;
use crate::locate;

/// Result of a single preflight check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Name of the check
    pub name: String,
    /// Whether the check passed
    pub passed: bool,
    /// Human-readable message
    pub message: String,
    /// Optional suggestion for fixing the issue
    pub suggestion: Option<String>,
}

impl CheckResult {
    /// Create a passing check result.
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            message: message.into(),
            suggestion: None,
        }
    }

    /// Create a failing check result.
    pub fn fail(
        name: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            passed: false,
            message: message.into(),
            suggestion: Some(suggestion.into()),
        }
    }
}

/// Comprehensive preflight report.
#[derive(Debug, Default)]
pub struct PreflightReport {
    pub checks: Vec<CheckResult>,
    pub cache_status: CacheStatus,
}

impl PreflightReport {
    /// Check if all preflight checks passed.
    pub fn is_ok(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// Get all failing checks.
    pub fn errors(&self) -> Vec<&CheckResult> {
        self.checks.iter().filter(|c| !c.passed).collect()
    }

    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    pub fn total_count(&self) -> usize {
        self.checks.len()
    }

    pub fn print_summary(&self) {
        println!("=== Preflight Check Results ===\n");

        for check in &self.checks {
            let status = if check.passed { "[OK]" } else { "[FAIL]" };
            println!("{} {}: {}", status, check.name, check.message);
            if let Some(suggestion) = &check.suggestion {
                println!("     Suggestion: {}", suggestion);
            }
        }

        println!();
        println!("=== Cache Status ===\n");
        self.cache_status.print();

        println!();
        if self.is_ok() {
            println!(
                "All preflight checks passed ({}/{})",
                self.passed_count(),
                self.total_count()
            );
        } else {
            println!(
                "Preflight checks failed: {} of {} passed",
                self.passed_count(),
                self.total_count()
            );
        }
    }
}

/// A stage3 tarball found in the cache directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedTarball {
    pub name: String,
    pub size: u64,
}

/// Stage3 tarballs already in the cache.
#[derive(Debug, Default)]
pub struct CacheStatus {
    pub cache_dir: PathBuf,
    pub tarballs: Vec<CachedTarball>,
}

impl CacheStatus {
    /// Scan `cache_dir` for `stage3-*` files. A missing directory is empty.
    pub fn scan(cache_dir: &Path) -> Self {
        let mut tarballs: Vec<CachedTarball> = fs::read_dir(cache_dir)
            .into_iter()
            .flatten()
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                let meta = entry.metadata().ok()?;
                (name.starts_with("stage3-") && meta.is_file()).then(|| CachedTarball {
                    name,
                    size: meta.len(),
                })
            })
            .collect();
        tarballs.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            cache_dir: cache_dir.to_path_buf(),
            tarballs,
        }
    }

    pub fn print(&self) {
        println!("Cache: {}", self.cache_dir.display());
        if self.tarballs.is_empty() {
            println!("[missing]  no stage3 tarballs cached");
            return;
        }
        for tarball in &self.tarballs {
            println!(
                "[cached]  {} ({} MB)",
                tarball.name,
                tarball.size / 1024 / 1024
            );
        }
    }
}

/// Preflight checker for the stage3 step.
pub struct PreflightChecker {
    settings: StageSettings,
    root: Option<PathBuf>,
}

impl PreflightChecker {
    pub fn new(settings: StageSettings) -> Self {
        Self {
            settings,
            root: None,
        }
    }

    /// Also check free space on the target root.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Run all preflight checks and return a comprehensive report.
    pub async fn run_all(&self) -> PreflightReport {
        let mut report = PreflightReport::default();

        report.checks.extend(check_host_tools());

        report.checks.push(check_disk_space(
            "cache",
            &self.settings.cache_dir,
            MIN_CACHE_SPACE_BYTES,
        ));
        if let Some(root) = &self.root {
            report
                .checks
                .push(check_disk_space("root", root, MIN_ROOT_SPACE_BYTES));
        }

        report
            .checks
            .push(check_network(&locate::index_url(&self.settings)).await);

        report.cache_status = CacheStatus::scan(&self.settings.cache_dir);

        report
    }

    pub fn settings(&self) -> &StageSettings {
        &self.settings
    }
}
