//! Stage3 download with a persistent cache.
//!
//! Resolution is two-tier:
//!
//! 1. **Existing file**: `<cache_dir>/<filename>` is used as-is
//! 2. **Download**: fetched with wget straight to that path
//!
//! Presence of the cached file is the only check. A truncated or stale file
//! from an earlier run is reused without re-validation, and a failed
//! transfer may leave a partial file behind.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Stage3Error;
use crate::locate::ArchiveReference;
use crate::process::Cmd;

/// Moves a remote resource to a local path.
pub trait Transferer {
    fn transfer(&self, url: &str, dest: &Path) -> Result<()>;
}

impl<T: Transferer + ?Sized> Transferer for &T {
    fn transfer(&self, url: &str, dest: &Path) -> Result<()> {
        (**self).transfer(url, dest)
    }
}

/// Downloads with wget, showing its progress bar on the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct WgetTransferer;

impl WgetTransferer {
    pub fn command(url: &str, dest: &Path) -> Cmd {
        Cmd::new("wget")
            .args(["-q", "--show-progress", "--progress=bar:force", "-O"])
            .arg_path(dest)
            .arg(url)
            .error_msg(format!("wget failed to download {}", url))
    }
}

impl Transferer for WgetTransferer {
    fn transfer(&self, url: &str, dest: &Path) -> Result<()> {
        Self::command(url, dest).run_interactive()
    }
}

/// Path a reference is cached at.
pub fn cache_path(reference: &ArchiveReference, cache_dir: &Path) -> PathBuf {
    cache_dir.join(&reference.filename)
}

/// Fetches stage3 tarballs into the cache directory.
pub struct Downloader<'a> {
    transferer: &'a dyn Transferer,
}

impl<'a> Downloader<'a> {
    pub fn new(transferer: &'a dyn Transferer) -> Self {
        Self { transferer }
    }

    /// Return the cached tarball, downloading it first if absent.
    pub fn fetch(
        &self,
        reference: &ArchiveReference,
        cache_dir: &Path,
    ) -> Result<PathBuf, Stage3Error> {
        let dest = cache_path(reference, cache_dir);

        if dest.exists() {
            info!("Stage3: {} (cached)", dest.display());
            return Ok(dest);
        }

        info!("Downloading stage3 from {}", reference.url);
        self.transferer
            .transfer(&reference.url, &dest)
            .map_err(|e| Stage3Error::Download {
                url: reference.url.clone(),
                reason: format!("{:#}", e),
            })?;

        info!("Stage3: {} (downloaded)", dest.display());
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::tempdir;

    /// Writes a fixed body, or fails, and records each call.
    struct FakeTransferer {
        body: Option<&'static [u8]>,
        calls: RefCell<Vec<(String, PathBuf)>>,
    }

    impl FakeTransferer {
        fn writing(body: &'static [u8]) -> Self {
            Self {
                body: Some(body),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                body: None,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Transferer for FakeTransferer {
        fn transfer(&self, url: &str, dest: &Path) -> Result<()> {
            self.calls
                .borrow_mut()
                .push((url.to_string(), dest.to_path_buf()));
            match self.body {
                Some(body) => Ok(fs::write(dest, body)?),
                None => bail!("wget exited with status 8"),
            }
        }
    }

    fn reference() -> ArchiveReference {
        ArchiveReference::from_url(
            "https://distfiles.gentoo.org/releases/amd64/autobuilds/20240101T000000Z/stage3-amd64-desktop-openrc-20240101T000000Z.tar.xz",
        )
    }

    #[test]
    fn test_cached_file_skips_transfer() {
        let dir = tempdir().unwrap();
        let cached = dir.path().join(&reference().filename);
        fs::write(&cached, b"partial").unwrap();

        let transferer = FakeTransferer::writing(b"fresh");
        let path = Downloader::new(&transferer)
            .fetch(&reference(), dir.path())
            .unwrap();

        assert_eq!(path, cached);
        assert!(transferer.calls.borrow().is_empty());
        // Reused without re-validation
        assert_eq!(fs::read(&path).unwrap(), b"partial");
    }

    #[test]
    fn test_missing_file_is_downloaded() {
        let dir = tempdir().unwrap();
        let transferer = FakeTransferer::writing(b"tarball");

        let path = Downloader::new(&transferer)
            .fetch(&reference(), dir.path())
            .unwrap();

        assert_eq!(path, dir.path().join(&reference().filename));
        assert_eq!(fs::read(&path).unwrap(), b"tarball");

        let calls = transferer.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, reference().url);
        assert_eq!(calls[0].1, path);
    }

    #[test]
    fn test_second_fetch_hits_cache() {
        let dir = tempdir().unwrap();
        let transferer = FakeTransferer::writing(b"tarball");
        let downloader = Downloader::new(&transferer);

        downloader.fetch(&reference(), dir.path()).unwrap();
        downloader.fetch(&reference(), dir.path()).unwrap();

        assert_eq!(transferer.calls.borrow().len(), 1);
    }

    #[test]
    fn test_transfer_failure_is_download_error() {
        let dir = tempdir().unwrap();
        let transferer = FakeTransferer::failing();

        let err = Downloader::new(&transferer)
            .fetch(&reference(), dir.path())
            .unwrap_err();

        match err {
            Stage3Error::Download { url, reason } => {
                assert_eq!(url, reference().url);
                assert!(reason.contains("status 8"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_wget_command_line() {
        let cmd = WgetTransferer::command("https://example.org/s.tar.xz", Path::new("/cache/s.tar.xz"));
        assert_eq!(cmd.program(), "wget");
        let args: Vec<_> = cmd
            .arguments()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            [
                "-q",
                "--show-progress",
                "--progress=bar:force",
                "-O",
                "/cache/s.tar.xz",
                "https://example.org/s.tar.xz"
            ]
        );
    }
}
