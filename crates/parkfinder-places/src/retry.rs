//! Bounded retry for the places clients.
//!
//! [`retry_with_backoff`] wraps one call chain and re-issues it on transient
//! network failures only. The attempt counter lives on the stack of each
//! call, so concurrent searches never share a budget.

use std::future::Future;
use std::time::Duration;

use crate::error::PlacesError;

/// Returns `true` for errors that are worth retrying.
///
/// **Retriable:**
/// - request timed out
/// - host unreachable / not connected (connect failure)
/// - connection lost while sending the request or reading the body
/// - any HTTP 5xx (bad server response)
///
/// **Not retriable:** every other HTTP status, API-level statuses such as
/// `REQUEST_DENIED`, and malformed bodies.
pub(crate) fn is_retriable(err: &PlacesError) -> bool {
    match err {
        PlacesError::Http(e) => {
            if let Some(status) = e.status() {
                return status.is_server_error();
            }
            e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
        }
        PlacesError::Api { .. }
        | PlacesError::Deserialize { .. }
        | PlacesError::InvalidBaseUrl { .. } => false,
    }
}

/// Runs `operation`, retrying up to `max_retries` extra times on transient errors.
///
/// The wait before retry `n` is `backoff_base_ms × 2^(n-1)` with ±25 %
/// jitter, capped at 30 s. A base of `0` retries immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, PlacesError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PlacesError>>,
{
    const MAX_DELAY_MS: u64 = 30_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "places transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
