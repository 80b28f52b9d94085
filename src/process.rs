//! Thin builder over `std::process::Command` for the external tools the
//! stage3 step shells out to (wget, tar, gpg, df).
//!
//! ```rust,ignore
//! Cmd::new("tar")
//!     .args(["xpf"])
//!     .arg_path(&tarball)
//!     .args(["-C"])
//!     .arg_path(&root)
//!     .error_msg("Failed to extract stage3 tarball")
//!     .run_interactive()?;
//! ```

use anyhow::{bail, Context, Result};
use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::{Command, Stdio};

/// Captured output of a finished command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code, `None` if killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// External command builder.
#[derive(Debug)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    error_msg: Option<String>,
    allow_fail: bool,
}

impl Cmd {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            error_msg: None,
            allow_fail: false,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Append a path argument without lossy UTF-8 conversion.
    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.as_os_str().to_os_string());
        self
    }

    /// Message used as context when the command fails.
    pub fn error_msg(mut self, msg: impl Into<String>) -> Self {
        self.error_msg = Some(msg.into());
        self
    }

    /// Return the result instead of an error on non-zero exit.
    pub fn allow_fail(mut self) -> Self {
        self.allow_fail = true;
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// Run with captured stdout/stderr.
    pub fn run(self) -> Result<CommandResult> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to spawn {}", self.display()))?;

        let result = CommandResult {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.success() && !self.allow_fail {
            bail!(
                "{}\n  command: {}\n  exit: {}\n  stderr: {}",
                self.error_msg.as_deref().unwrap_or("Command failed"),
                self.display(),
                exit_label(result.code),
                result.stderr.trim()
            );
        }

        Ok(result)
    }

    /// Run with stdout/stderr inherited so progress output reaches the terminal.
    pub fn run_interactive(self) -> Result<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .status()
            .with_context(|| format!("failed to spawn {}", self.display()))?;

        if !status.success() && !self.allow_fail {
            bail!(
                "{}\n  command: {}\n  exit: {}",
                self.error_msg.as_deref().unwrap_or("Command failed"),
                self.display(),
                exit_label(status.code())
            );
        }

        Ok(())
    }

    fn display(&self) -> String {
        let mut line = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "killed by signal".to_string(),
    }
}

/// Locate a tool on `PATH`.
pub fn which(tool: &str) -> Option<String> {
    ::which::which(tool)
        .ok()
        .map(|path| path.display().to_string())
}

/// Check whether a tool is on `PATH`.
pub fn exists(tool: &str) -> bool {
    which(tool).is_some()
}
