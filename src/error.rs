//! Pipeline failure kinds.
//!
//! A run surfaces at most one of these. Each maps to the {title, detail} pair
//! the host installer shows the user.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Stage3Error {
    /// No target root was supplied; raised before any network activity.
    #[error("root mount point not found in global storage")]
    MissingRootMountPoint,

    /// Index lookup failed. The locator always degrades to the fallback
    /// reference, so this never terminates a pipeline run.
    #[error("could not determine stage3 URL: {reason}")]
    UrlResolution { reason: String },

    #[error("failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("checksum mismatch for {filename}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        filename: String,
        expected: String,
        actual: String,
    },

    #[error("failed to extract {archive}: {reason}")]
    Extraction { archive: String, reason: String },
}

impl Stage3Error {
    /// Short headline for the host UI.
    pub fn title(&self) -> &'static str {
        match self {
            Self::MissingRootMountPoint => "No root mount point",
            Self::UrlResolution { .. } => "Stage3 URL Error",
            Self::Download { .. } => "Download Error",
            Self::ChecksumMismatch { .. } => "Checksum Error",
            Self::Extraction { .. } => "Extraction Error",
        }
    }

    /// Longer explanation for the host UI.
    pub fn detail(&self) -> String {
        match self {
            Self::MissingRootMountPoint => {
                "Root mount point not found in global storage".to_string()
            }
            Self::UrlResolution { reason } => format!("Could not determine stage3 URL: {reason}"),
            Self::Download { reason, .. } => {
                format!("Failed to download stage3 tarball: {reason}")
            }
            Self::ChecksumMismatch {
                expected, actual, ..
            } => format!(
                "Stage3 checksum verification failed (expected {expected}, got {actual})"
            ),
            Self::Extraction { reason, .. } => {
                format!("Failed to extract stage3 tarball: {reason}")
            }
        }
    }
}
