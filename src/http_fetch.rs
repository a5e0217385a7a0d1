use crate::error::Result;
use std::time::Duration;
use tracing::{instrument, warn};

/// Issues a single HTTP request built by `build`, retrying up to
/// `max_retries` times with linear backoff (`500 * attempt` ms) when the
/// response status is 429 or 503. Any other non-success status is returned
/// unmodified to the caller. Exhausting the retry budget on a transient
/// status yields `Ok(None)`. Network-level errors are not retried here —
/// they propagate as a definitive failure for the caller to handle.
#[instrument(skip(build))]
pub async fn fetch_with_retry(
    mut build: impl FnMut() -> reqwest::RequestBuilder,
    max_retries: u32,
) -> Result<Option<reqwest::Response>> {
    let mut attempt: u32 = 0;
    loop {
        let response = build().send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(Some(response));
        }

        let transient = status.as_u16() == 429 || status.as_u16() == 503;
        if transient && attempt < max_retries {
            attempt += 1;
            let backoff = Duration::from_millis(500 * attempt as u64);
            warn!(
                status = status.as_u16(),
                attempt, backoff_ms = backoff.as_millis() as u64, "transient upstream status, retrying"
            );
            tokio::time::sleep(backoff).await;
            continue;
        }

        if transient {
            warn!(status = status.as_u16(), "retry budget exhausted");
            return Ok(None);
        }

        return Ok(Some(response));
    }
}
