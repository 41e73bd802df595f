//! Bounded-retry readiness probing.
//!
//! Used by test orchestration to block until the service answers its status
//! endpoint before running anything that depends on it. This is a plain
//! suspend-and-retry loop so the attempt count and exhaustion behavior stay
//! explicit; production request handling never goes through here.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const BASE_DELAY: Duration = Duration::from_millis(100);
const MAX_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
#[error("service did not become ready after {attempts} attempts")]
pub struct ServiceUnavailableError {
    pub attempts: u32,
}

/// Invoke `probe` until it succeeds, waiting with exponential backoff between
/// attempts, up to `max_attempts`. Returns on the first success; after
/// `max_attempts` consecutive failures the caller gets
/// [`ServiceUnavailableError`] and should treat it as fatal for its setup.
pub async fn wait_for_service<F, Fut, E>(
    mut probe: F,
    max_attempts: u32,
) -> Result<(), ServiceUnavailableError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    let mut delay = BASE_DELAY;

    for attempt in 1..=max_attempts {
        match probe().await {
            Ok(()) => return Ok(()),
            Err(e) => {
                debug!("Probe attempt {attempt}/{max_attempts} failed: {e}");
            }
        }

        if attempt < max_attempts {
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(MAX_DELAY);
        }
    }

    Err(ServiceUnavailableError {
        attempts: max_attempts,
    })
}

/// Probe an HTTP endpoint until it answers with a 2xx status.
pub async fn wait_for_http_ok(
    url: &str,
    max_attempts: u32,
) -> Result<(), ServiceUnavailableError> {
    let client = reqwest::Client::new();

    wait_for_service(
        || {
            let client = client.clone();
            let url = url.to_string();
            async move {
                let response = client.get(&url).send().await.map_err(|e| e.to_string())?;
                if response.status().is_success() {
                    Ok(())
                } else {
                    Err(format!("unexpected status {}", response.status()))
                }
            }
        },
        max_attempts,
    )
    .await
}
