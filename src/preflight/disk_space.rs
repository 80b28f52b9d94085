//! Disk space checks for the cache directory and the target root.

use super::CheckResult;
use crate::process::Cmd;
use std::path::Path;

const GIB: u64 = 1024 * 1024 * 1024;

/// A desktop stage3 tarball is ~1.5 GB compressed.
pub const MIN_CACHE_SPACE_BYTES: u64 = 3 * GIB;

/// Unpacked desktop stage3 plus room for the first emerge.
pub const MIN_ROOT_SPACE_BYTES: u64 = 10 * GIB;

/// Check that `path` has at least `min_bytes` free.
pub fn check_disk_space(label: &str, path: &Path, min_bytes: u64) -> CheckResult {
    let name = format!("Disk space ({})", label);
    let required_gb = min_bytes as f64 / GIB as f64;

    match available_space(path) {
        Some(available) => {
            let available_gb = available as f64 / GIB as f64;
            if available >= min_bytes {
                CheckResult::pass(
                    name,
                    format!(
                        "{:.1} GB available at {} (need {:.1} GB)",
                        available_gb,
                        path.display(),
                        required_gb
                    ),
                )
            } else {
                CheckResult::fail(
                    name,
                    format!(
                        "Only {:.1} GB available at {}, need {:.1} GB",
                        available_gb,
                        path.display(),
                        required_gb
                    ),
                    "Free up disk space or point the cache/root at a larger filesystem",
                )
            }
        }
        None => CheckResult::fail(
            name,
            format!("Failed to check available disk space at {}", path.display()),
            "Ensure df is available and the path exists",
        ),
    }
}

/// Available bytes on the filesystem holding `path`.
///
/// A path that doesn't exist yet (a cache directory on first run) is measured
/// at its nearest existing ancestor.
pub fn available_space(path: &Path) -> Option<u64> {
    let existing = path.ancestors().find(|p| p.exists())?;

    Cmd::new("df")
        .args(["--output=avail", "-B1"])
        .arg_path(existing)
        .allow_fail()
        .run()
        .ok()
        .filter(|r| r.success())
        .and_then(|r| {
            // Skip header line, get first number
            r.stdout
                .lines()
                .nth(1)
                .and_then(|line| line.trim().parse::<u64>().ok())
        })
}
