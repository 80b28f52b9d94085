//! Stage3 extraction onto the target root.
//!
//! The tarball is unpacked with GNU tar:
//!
//! ```text
//! tar xpf <tarball> --xattrs-include=*.* --numeric-owner -C <root>
//! ```
//!
//! - `p` keeps permissions
//! - `--numeric-owner` keeps the stored uid/gid instead of remapping by name
//!   through the host's passwd/group
//! - `--xattrs-include=*.*` keeps extended attributes (file capabilities)
//!
//! Members land relative to the root. A failed extraction is not rolled back.

use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::process::Cmd;

/// Unpacks an archive onto a destination directory.
pub trait Extractor {
    fn extract(&self, archive: &Path, dest_root: &Path) -> Result<()>;
}

impl<T: Extractor + ?Sized> Extractor for &T {
    fn extract(&self, archive: &Path, dest_root: &Path) -> Result<()> {
        (**self).extract(archive, dest_root)
    }
}

/// Extracts with the host's tar, preserving ownership and xattrs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TarExtractor;

impl TarExtractor {
    pub fn command(archive: &Path, dest_root: &Path) -> Cmd {
        Cmd::new("tar")
            .args(["xpf"])
            .arg_path(archive)
            .args(["--xattrs-include=*.*", "--numeric-owner", "-C"])
            .arg_path(dest_root)
            .error_msg(format!("Failed to extract {}", archive.display()))
    }
}

impl Extractor for TarExtractor {
    fn extract(&self, archive: &Path, dest_root: &Path) -> Result<()> {
        info!("Extracting stage3 to {}", dest_root.display());
        Self::command(archive, dest_root).run_interactive()?;
        info!("Stage3 extracted to {}", dest_root.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::exists;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_tar_command_line() {
        let cmd = TarExtractor::command(
            Path::new("/var/cache/yuno/stage3.tar.xz"),
            Path::new("/mnt/gentoo"),
        );
        assert_eq!(cmd.program(), "tar");
        let args: Vec<_> = cmd
            .arguments()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            [
                "xpf",
                "/var/cache/yuno/stage3.tar.xz",
                "--xattrs-include=*.*",
                "--numeric-owner",
                "-C",
                "/mnt/gentoo"
            ]
        );
    }

    #[test]
    fn test_missing_archive_is_error() {
        if !exists("tar") {
            eprintln!("Skipping tar test (tar not installed)");
            return;
        }
        let dir = tempdir().unwrap();
        let result = TarExtractor.extract(&dir.path().join("missing.tar.xz"), dir.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_extracts_members_relative_to_root() {
        if !exists("tar") {
            eprintln!("Skipping tar test (tar not installed)");
            return;
        }
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("etc")).unwrap();
        fs::write(src.join("etc/gentoo-release"), "Gentoo Base System release 2.14\n").unwrap();

        let archive = dir.path().join("stage3.tar");
        Cmd::new("tar")
            .args(["cf"])
            .arg_path(&archive)
            .args(["-C"])
            .arg_path(&src)
            .arg("etc")
            .run()
            .unwrap();

        let root = dir.path().join("root");
        fs::create_dir_all(&root).unwrap();
        TarExtractor.extract(&archive, &root).unwrap();

        assert_eq!(
            fs::read_to_string(root.join("etc/gentoo-release")).unwrap(),
            "Gentoo Base System release 2.14\n"
        );
    }
}
