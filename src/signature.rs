//! Detached GPG signature check for the stage3 tarball.
//!
//! Gentoo signs every autobuild with its release key and publishes the
//! signature as `<archive url>.asc`. The check is advisory: the pipeline logs
//! a failure and carries on, so it never changes the outcome of a run.

use anyhow::{bail, Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::download::{Transferer, WgetTransferer};
use crate::process::{exists, Cmd};

/// Gentoo Linux release engineering (automated weekly release key).
pub const GENTOO_RELEASE_KEY: &str = "13EBBDBEDE7A12775DFDB1BABB572E0E2D182910";

pub const GENTOO_KEYSERVER: &str = "hkps://keys.gentoo.org";

/// Checks a downloaded archive against its detached signature.
pub trait SignatureVerifier {
    fn verify_signature(&self, archive: &Path, signature_url: &str) -> Result<()>;
}

impl<T: SignatureVerifier + ?Sized> SignatureVerifier for &T {
    fn verify_signature(&self, archive: &Path, signature_url: &str) -> Result<()> {
        (**self).verify_signature(archive, signature_url)
    }
}

/// Signature is stored next to the archive.
pub fn signature_path(archive: &Path) -> PathBuf {
    let mut name = OsString::from(archive.as_os_str());
    name.push(".asc");
    PathBuf::from(name)
}

/// Fetches the `.asc` and runs `gpg --verify` with the Gentoo release key.
pub struct GpgVerifier<T = WgetTransferer> {
    transferer: T,
}

impl GpgVerifier {
    pub fn new() -> Self {
        Self {
            transferer: WgetTransferer,
        }
    }
}

impl Default for GpgVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transferer> GpgVerifier<T> {
    pub fn with_transferer(transferer: T) -> Self {
        Self { transferer }
    }
}

/// `gpg --recv-keys` for the Gentoo release key.
pub fn recv_keys_command() -> Cmd {
    Cmd::new("gpg")
        .args(["--keyserver", GENTOO_KEYSERVER, "--recv-keys", GENTOO_RELEASE_KEY])
        .error_msg("Could not import the Gentoo release key")
}

pub fn verify_command(signature: &Path, archive: &Path) -> Cmd {
    Cmd::new("gpg")
        .arg("--verify")
        .arg_path(signature)
        .arg_path(archive)
        .error_msg(format!("Bad signature for {}", archive.display()))
}

impl<T: Transferer> SignatureVerifier for GpgVerifier<T> {
    fn verify_signature(&self, archive: &Path, signature_url: &str) -> Result<()> {
        let signature = signature_path(archive);
        self.transferer
            .transfer(signature_url, &signature)
            .with_context(|| format!("Could not fetch signature {}", signature_url))?;

        if !exists("gpg") {
            bail!("gpg not installed");
        }

        // A key already in the keyring is enough, so a keyserver failure is not fatal
        let import = recv_keys_command().allow_fail().run()?;
        if !import.success() {
            warn!(
                "Could not import Gentoo release key: {}",
                import.stderr.trim()
            );
        }

        verify_command(&signature, archive).run()?;
        info!("GPG signature verified for {}", archive.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingTransferer {
        fail: bool,
        calls: RefCell<Vec<(String, PathBuf)>>,
    }

    impl Transferer for RecordingTransferer {
        fn transfer(&self, url: &str, dest: &Path) -> Result<()> {
            self.calls
                .borrow_mut()
                .push((url.to_string(), dest.to_path_buf()));
            if self.fail {
                bail!("wget exited with status 8");
            }
            Ok(fs::write(dest, b"-----BEGIN PGP SIGNATURE-----")?)
        }
    }

    fn args(cmd: &Cmd) -> Vec<String> {
        cmd.arguments()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_signature_path() {
        assert_eq!(
            signature_path(Path::new("/var/cache/yuno/stage3-amd64-desktop-openrc-1.tar.xz")),
            PathBuf::from("/var/cache/yuno/stage3-amd64-desktop-openrc-1.tar.xz.asc")
        );
    }

    #[test]
    fn test_gpg_command_lines() {
        let recv = recv_keys_command();
        assert_eq!(recv.program(), "gpg");
        assert_eq!(
            args(&recv),
            [
                "--keyserver",
                "hkps://keys.gentoo.org",
                "--recv-keys",
                "13EBBDBEDE7A12775DFDB1BABB572E0E2D182910"
            ]
        );

        let verify = verify_command(
            Path::new("/c/s.tar.xz.asc"),
            Path::new("/c/s.tar.xz"),
        );
        assert_eq!(args(&verify), ["--verify", "/c/s.tar.xz.asc", "/c/s.tar.xz"]);
    }

    #[test]
    fn test_unfetchable_signature_is_error() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("stage3.tar.xz");
        let transferer = RecordingTransferer {
            fail: true,
            ..Default::default()
        };

        let err = GpgVerifier::with_transferer(&transferer)
            .verify_signature(&archive, "https://example.org/stage3.tar.xz.asc")
            .unwrap_err();

        assert!(format!("{:#}", err).contains("Could not fetch signature"));
        assert_eq!(
            *transferer.calls.borrow(),
            vec![(
                "https://example.org/stage3.tar.xz.asc".to_string(),
                dir.path().join("stage3.tar.xz.asc")
            )]
        );
    }
}
