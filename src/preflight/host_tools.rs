//! Host tool validation for the stage3 step.
//!
//! Presence on `PATH` is not enough for tar: the extraction flags
//! (`--xattrs-include`, `--numeric-owner`) are GNU tar options that busybox
//! tar rejects. Each tool is run once and its output checked.

use super::CheckResult;
use crate::process::{exists, which, Cmd};

/// A tool the stage3 step runs, and how to query it.
struct HostTool {
    name: &'static str,
    purpose: &'static str,
    install: &'static str,
    query: &'static [&'static str],
    /// Text the query output must contain
    requires: Option<&'static str>,
}

const REQUIRED_TOOLS: &[HostTool] = &[
    HostTool {
        name: "wget",
        purpose: "download stage3 tarball",
        install: "emerge net-misc/wget",
        query: &["--version"],
        requires: None,
    },
    HostTool {
        name: "tar",
        purpose: "extract with xattrs and numeric owners",
        install: "emerge app-arch/tar (GNU tar)",
        query: &["--help"],
        requires: Some("--xattrs-include"),
    },
    HostTool {
        name: "xz",
        purpose: "decompress .tar.xz",
        install: "emerge app-arch/xz-utils",
        query: &["--version"],
        requires: Some("xz (XZ Utils)"),
    },
];

/// Check that all required host tools are installed and usable, plus gpg.
pub fn check_host_tools() -> Vec<CheckResult> {
    let mut results: Vec<CheckResult> = REQUIRED_TOOLS.iter().map(check_tool).collect();
    results.push(check_gpg());
    results
}

fn check_tool(tool: &HostTool) -> CheckResult {
    let name = format!("{} tool", tool.name);
    let Some(path) = which(tool.name) else {
        return CheckResult::fail(
            name,
            format!("Not found (needed to {})", tool.purpose),
            tool.install,
        );
    };

    let output = Cmd::new(tool.name)
        .args(tool.query)
        .allow_fail()
        .run()
        .map(|r| format!("{}{}", r.stdout, r.stderr))
        .unwrap_or_default();

    evaluate_output(tool, &path, &output)
}

fn evaluate_output(tool: &HostTool, path: &str, output: &str) -> CheckResult {
    let name = format!("{} tool", tool.name);
    if let Some(required) = tool.requires {
        if !output.contains(required) {
            return CheckResult::fail(
                name,
                format!("{} cannot {} (no {})", path, tool.purpose, required),
                tool.install,
            );
        }
    }

    match first_line(output) {
        Some(version) => CheckResult::pass(name, format!("{} ({})", path, version)),
        None => CheckResult::pass(name, format!("Found at {}", path)),
    }
}

/// gpg is optional: without it the signature check is skipped.
fn check_gpg() -> CheckResult {
    match which("gpg") {
        Some(path) => CheckResult::pass("gpg tool", format!("Found at {}", path)),
        None => CheckResult::pass(
            "gpg tool",
            "Not found, signature check will be skipped",
        ),
    }
}

fn first_line(output: &str) -> Option<&str> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
}

/// Quick yes/no check for a single tool.
pub fn has_tool(tool: &str) -> bool {
    exists(tool)
}
