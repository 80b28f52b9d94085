//! Mirror reachability check.

use anyhow::Result;
use std::time::Duration;

use super::CheckResult;
use crate::fetch::{HttpFetcher, TextFetcher};

/// How long the mirror gets to answer.
const NETWORK_TIMEOUT: Duration = Duration::from_secs(10);

/// Check that the stage3 index on the mirror is reachable.
///
/// Fetches the index with the same client the install uses.
pub async fn check_network(index_url: &str) -> CheckResult {
    check_network_with(index_url, || HttpFetcher::with_timeout(NETWORK_TIMEOUT)).await
}

/// Reachability through the fetcher `make` builds. The blocking client is
/// built, used and dropped off the async worker threads.
pub async fn check_network_with<F, M>(index_url: &str, make: M) -> CheckResult
where
    F: TextFetcher,
    M: FnOnce() -> Result<F> + Send + 'static,
{
    let url = index_url.to_string();
    let result = tokio::task::spawn_blocking(move || make()?.fetch_text(&url)).await;

    let host = mirror_host(index_url);
    match result {
        Ok(Ok(_)) => CheckResult::pass("Network", format!("Mirror reachable ({})", host)),
        Ok(Err(e)) => CheckResult::fail(
            "Network",
            format!("Mirror unreachable ({}): {:#}", host, e),
            "Check your internet connection or set a different mirror (see `yuno-stage3 mirrors`)",
        ),
        Err(e) => CheckResult::fail(
            "Network",
            format!("Failed to check network: {}", e),
            "Retry the preflight check",
        ),
    }
}

/// Host part of a URL, for display.
fn mirror_host(url: &str) -> &str {
    let rest = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    rest.split('/').next().unwrap_or(rest)
}
