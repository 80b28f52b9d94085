//! Find the currently published stage3 for a variant.
//!
//! Gentoo publishes `latest-stage3-amd64.txt` under the autobuilds tree:
//!
//! ```text
//! # Latest as of Mon, 01 Jan 2024 00:00:00 +0000
//! # ts=1704067200
//! 20240101T000000Z/stage3-amd64-desktop-openrc-20240101T000000Z.tar.xz 312345678
//! 20240101T000000Z/stage3-amd64-desktop-systemd-20240101T000000Z.tar.xz 323456789
//! ```
//!
//! Lookup never fails. If the index can't be fetched or lists nothing for the
//! variant, a fixed fallback reference is returned and a warning logged. The
//! fallback's filename is a glob, so it may not name a real file.

use tracing::{debug, info, warn};

use crate::config::StageSettings;
use crate::error::Stage3Error;
use crate::fetch::TextFetcher;
use crate::variant::VariantId;

/// Index file listing the current stage3 tarballs.
pub const LATEST_INDEX: &str = "latest-stage3-amd64.txt";

/// Used when the index is unusable.
pub const FALLBACK_PATH: &str =
    "current-stage3-amd64-desktop-openrc/stage3-amd64-desktop-openrc-*.tar.xz";

/// A resolved download location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReference {
    pub url: String,
    /// Last path segment of `url`, query string stripped
    pub filename: String,
}

impl ArchiveReference {
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let filename = filename_from_url(&url).to_string();
        Self { url, filename }
    }

    /// URL of the published `.sha256` manifest.
    pub fn checksum_url(&self) -> String {
        format!("{}.sha256", self.url)
    }

    /// URL of the detached GPG signature.
    pub fn signature_url(&self) -> String {
        format!("{}.asc", self.url)
    }

    pub fn fallback(settings: &StageSettings) -> Self {
        Self::from_url(format!("{}/{}", settings.autobuilds_url(), FALLBACK_PATH))
    }
}

/// URL of the "latest" index on the configured mirror.
pub fn index_url(settings: &StageSettings) -> String {
    format!("{}/{}", settings.autobuilds_url(), LATEST_INDEX)
}

/// Basename of a URL path, ignoring any query string.
pub fn filename_from_url(url: &str) -> &str {
    let path = url.split('?').next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}

/// First index entry mentioning `variant`, as its first whitespace-delimited
/// token. Comment (`#`) and blank lines are skipped.
pub fn find_in_index<'a>(content: &'a str, variant: &VariantId) -> Option<&'a str> {
    content
        .lines()
        .filter(|line| !line.starts_with('#') && !line.trim().is_empty())
        .find(|line| line.contains(variant.as_str()))
        .and_then(|line| line.split_whitespace().next())
}

/// Queries the mirror's index for the archive matching a variant.
pub struct SourceLocator<'a> {
    fetcher: &'a dyn TextFetcher,
    settings: &'a StageSettings,
}

impl<'a> SourceLocator<'a> {
    pub fn new(fetcher: &'a dyn TextFetcher, settings: &'a StageSettings) -> Self {
        Self { fetcher, settings }
    }

    /// Resolve `variant`, degrading to [`ArchiveReference::fallback`].
    pub fn locate(&self, variant: &VariantId) -> ArchiveReference {
        match self.try_locate(variant) {
            Ok(reference) => {
                info!("Resolved {} to {}", variant, reference.url);
                reference
            }
            Err(e) => {
                warn!("{}; using fallback", e);
                ArchiveReference::fallback(self.settings)
            }
        }
    }

    fn try_locate(&self, variant: &VariantId) -> Result<ArchiveReference, Stage3Error> {
        let index_url = index_url(self.settings);
        debug!("Fetching stage3 index {}", index_url);

        let content = self
            .fetcher
            .fetch_text(&index_url)
            .map_err(|e| Stage3Error::UrlResolution {
                reason: format!("failed to fetch stage3 index: {:#}", e),
            })?;

        let path = find_in_index(&content, variant).ok_or_else(|| Stage3Error::UrlResolution {
            reason: format!("no entry for {} in {}", variant, index_url),
        })?;

        Ok(ArchiveReference::from_url(format!(
            "{}/{}",
            self.settings.autobuilds_url(),
            path
        )))
    }
}
