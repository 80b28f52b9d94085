//! The stage3 step, end to end.
//!
//! ```text
//! rootMountPoint? ──no──▶ Failed(MissingRootMountPoint)
//!      │
//!   10% resolve variant, locate archive   (never fails, may fall back)
//!   20% ensure cache dir, download if not cached
//!   50% verify checksum                   (fails only on mismatch)
//!       check GPG signature               (advisory, never fails)
//!   60% extract onto root
//!  100% done
//! ```
//!
//! Any failure ends the run; nothing is retried or rolled back, so a partial
//! download or extraction can be left behind.

use anyhow::Result;
use std::fs;
use tracing::{info, warn};

use crate::config::{self, ConfigProvider, InstallConfig, StageSettings};
use crate::download::{Downloader, Transferer, WgetTransferer};
use crate::error::Stage3Error;
use crate::extract::{Extractor, TarExtractor};
use crate::fetch::{HttpFetcher, TextFetcher};
use crate::locate::SourceLocator;
use crate::progress::ProgressSink;
use crate::signature::{GpgVerifier, SignatureVerifier};
use crate::variant;
use crate::verify::{ChecksumVerifier, Verification};

pub const PROGRESS_LOCATE: f64 = 0.1;
pub const PROGRESS_DOWNLOAD: f64 = 0.2;
pub const PROGRESS_VERIFY: f64 = 0.5;
pub const PROGRESS_EXTRACT: f64 = 0.6;
pub const PROGRESS_DONE: f64 = 1.0;

/// Orchestrates variant resolution, download, verification and extraction.
pub struct Pipeline<'a> {
    config: &'a dyn ConfigProvider,
    progress: &'a dyn ProgressSink,
    fetcher: Box<dyn TextFetcher + 'a>,
    transferer: Box<dyn Transferer + 'a>,
    extractor: Box<dyn Extractor + 'a>,
    signature: Box<dyn SignatureVerifier + 'a>,
}

impl<'a> Pipeline<'a> {
    /// Pipeline using HTTP, wget, gpg and tar.
    pub fn new(config: &'a dyn ConfigProvider, progress: &'a dyn ProgressSink) -> Result<Self> {
        Ok(Self {
            config,
            progress,
            fetcher: Box::new(HttpFetcher::new()?),
            transferer: Box::new(WgetTransferer),
            extractor: Box::new(TarExtractor),
            signature: Box::new(GpgVerifier::new()),
        })
    }

    pub fn with_fetcher(mut self, fetcher: impl TextFetcher + 'a) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    pub fn with_transferer(mut self, transferer: impl Transferer + 'a) -> Self {
        self.transferer = Box::new(transferer);
        self
    }

    pub fn with_extractor(mut self, extractor: impl Extractor + 'a) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    pub fn with_signature_verifier(mut self, verifier: impl SignatureVerifier + 'a) -> Self {
        self.signature = Box::new(verifier);
        self
    }

    /// Run once. `Ok(())` is success; an error carries the {title, detail}
    /// to show the user.
    pub fn run(&self) -> Result<(), Stage3Error> {
        let root = config::root_mount_point(self.config)
            .ok_or(Stage3Error::MissingRootMountPoint)?;
        let install = InstallConfig::from_provider(self.config);
        let settings = StageSettings::from_provider(self.config);

        info!(
            "Installing stage3 (init: {}, desktop: {}) to {}",
            install.init_system,
            install.desktop_type,
            root.display()
        );

        self.progress.set_progress(PROGRESS_LOCATE);
        let variant = variant::resolve(&install);
        let reference = SourceLocator::new(self.fetcher.as_ref(), &settings).locate(&variant);

        self.progress.set_progress(PROGRESS_DOWNLOAD);
        fs::create_dir_all(&settings.cache_dir).map_err(|e| Stage3Error::Download {
            url: reference.url.clone(),
            reason: format!(
                "cannot create cache directory {}: {}",
                settings.cache_dir.display(),
                e
            ),
        })?;
        let tarball =
            Downloader::new(self.transferer.as_ref()).fetch(&reference, &settings.cache_dir)?;

        self.progress.set_progress(PROGRESS_VERIFY);
        let verification =
            ChecksumVerifier::new(self.fetcher.as_ref()).inspect(&tarball, &reference.checksum_url());
        if let Verification::Mismatch { expected, actual } = verification {
            return Err(Stage3Error::ChecksumMismatch {
                filename: reference.filename,
                expected,
                actual,
            });
        }
        if let Err(e) = self
            .signature
            .verify_signature(&tarball, &reference.signature_url())
        {
            warn!("GPG signature not verified, continuing: {:#}", e);
        }

        self.progress.set_progress(PROGRESS_EXTRACT);
        self.extractor
            .extract(&tarball, &root)
            .map_err(|e| Stage3Error::Extraction {
                archive: tarball.display().to_string(),
                reason: format!("{:#}", e),
            })?;

        self.progress.set_progress(PROGRESS_DONE);
        info!("Stage3 installation complete");
        Ok(())
    }
}
