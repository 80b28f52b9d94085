//! Small-text HTTP fetches (the "latest" index and `.sha256` manifests).

use anyhow::{Context, Result};
use std::time::Duration;

use crate::config::HTTP_TIMEOUT;

/// Fetches a remote text document.
pub trait TextFetcher {
    fn fetch_text(&self, url: &str) -> Result<String>;
}

impl<T: TextFetcher + ?Sized> TextFetcher for &T {
    fn fetch_text(&self, url: &str) -> Result<String> {
        (**self).fetch_text(url)
    }
}

/// Blocking reqwest client with a bounded timeout. No retries.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(HTTP_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

impl TextFetcher for HttpFetcher {
    fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("request to {} failed", url))?
            .error_for_status()
            .with_context(|| format!("bad response from {}", url))?;

        response
            .text()
            .with_context(|| format!("failed to read body of {}", url))
    }
}
