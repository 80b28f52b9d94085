//! SHA-256 verification against the mirror's `.sha256` manifest.
//!
//! Verification fails open. An unreachable manifest, a manifest with no line
//! for the file, or a local read error all skip verification with a warning.
//! Only a listed digest that differs from the computed one rejects the file,
//! so a tampered file the manifest doesn't list is accepted.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::fetch::TextFetcher;

/// Read size while hashing.
const HASH_CHUNK_SIZE: usize = 8192;

/// Outcome of checking a file against its manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Verified,
    /// Could not check; treated as a pass.
    Skipped { reason: String },
    Mismatch { expected: String, actual: String },
}

impl Verification {
    pub fn passed(&self) -> bool {
        !matches!(self, Self::Mismatch { .. })
    }
}

/// Lowercase hex SHA-256 of a file, streamed in fixed-size chunks.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; HASH_CHUNK_SIZE];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Expected digest for `filename`: first token of the first line naming it.
pub fn expected_digest<'a>(manifest: &'a str, filename: &str) -> Option<&'a str> {
    manifest
        .lines()
        .find(|line| line.contains(filename))
        .and_then(|line| line.split_whitespace().next())
}

pub struct ChecksumVerifier<'a> {
    fetcher: &'a dyn TextFetcher,
}

impl<'a> ChecksumVerifier<'a> {
    pub fn new(fetcher: &'a dyn TextFetcher) -> Self {
        Self { fetcher }
    }

    /// `false` only on a real digest mismatch.
    pub fn verify(&self, local_path: &Path, checksum_url: &str) -> bool {
        self.inspect(local_path, checksum_url).passed()
    }

    /// Check `local_path` against the manifest at `checksum_url`.
    pub fn inspect(&self, local_path: &Path, checksum_url: &str) -> Verification {
        let manifest = match self.fetcher.fetch_text(checksum_url) {
            Ok(manifest) => manifest,
            Err(e) => return skip(format!("Checksum verification failed: {:#}", e)),
        };

        let filename = match local_path.file_name() {
            Some(name) => name.to_string_lossy(),
            None => return skip(format!("No filename in {}", local_path.display())),
        };

        let expected = match expected_digest(&manifest, &filename) {
            Some(digest) => digest,
            None => return skip(format!("Could not find checksum for {}", filename)),
        };

        let actual = match sha256_file(local_path) {
            Ok(digest) => digest,
            Err(e) => {
                return skip(format!(
                    "Checksum verification failed: cannot read {}: {}",
                    local_path.display(),
                    e
                ))
            }
        };

        if actual.eq_ignore_ascii_case(expected) {
            info!("Checksum verified for {}", filename);
            Verification::Verified
        } else {
            warn!("Checksum mismatch for {}", filename);
            Verification::Mismatch {
                expected: expected.to_ascii_lowercase(),
                actual,
            }
        }
    }
}

fn skip(reason: String) -> Verification {
    warn!("{}; skipping verification", reason);
    Verification::Skipped { reason }
}
