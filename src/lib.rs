//! Yuno OS stage3 installation step.
//!
//! Resolves which Gentoo stage3 the user's choices need, finds its current
//! location on the mirror, downloads it into a persistent cache, checks it
//! against the published SHA-256 and unpacks it onto the target root.
//!
//! ```text
//! Pipeline ─▶ variant ─▶ locate ─▶ download ─▶ verify (+ signature) ─▶ extract
//! ```
//!
//! The network, wget and tar sit behind [`fetch::TextFetcher`],
//! [`download::Transferer`], [`extract::Extractor`] and
//! [`signature::SignatureVerifier`] so the host (or a
//! test) can swap them out.

pub mod config;
pub mod download;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod locate;
pub mod pipeline;
pub mod preflight;
pub mod process;
pub mod progress;
pub mod signature;
pub mod variant;
pub mod verify;

pub use config::{ConfigProvider, GlobalStorage, InitSystem, InstallConfig, StageSettings};
pub use error::Stage3Error;
pub use locate::ArchiveReference;
pub use pipeline::Pipeline;
pub use progress::ProgressSink;
pub use variant::VariantId;
