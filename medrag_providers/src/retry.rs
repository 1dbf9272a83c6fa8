use std::fmt::Display;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Retry an async operation, sleeping for each entry of `delays` between
/// attempts.
///
/// The operation runs `delays.len() + 1` times at most. An empty `delays`
/// slice means a single attempt with no retry.
///
/// # Returns
/// The first successful result, or the error of the final attempt
pub async fn retry_with_backoff<F, Fut, T, E>(mut operation: F, delays: &[Duration]) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: Display,
{
    let total = delays.len() + 1;
    let mut attempt = 1_usize;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                let Some(delay) = delays.get(attempt - 1) else {
                    return Err(e);
                };
                warn!(
                    "Request failed (attempt {attempt}/{total}): {e}. Retrying after {}ms...",
                    delay.as_millis()
                );
                sleep(*delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn retry_succeeds_on_first_attempt() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let result = retry_with_backoff(
            || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), String>(())
                }
            },
            &[Duration::ZERO, Duration::ZERO],
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_succeeds_after_failures() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let result: std::result::Result<(), String> = retry_with_backoff(
            || {
                let attempts = attempts.clone();
                async move {
                    let count = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    if count < 3 {
                        Err(String::from("fail"))
                    } else {
                        Ok(())
                    }
                }
            },
            &[Duration::ZERO, Duration::ZERO],
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_fails_after_all_attempts() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let result: std::result::Result<(), String> = retry_with_backoff(
            || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(String::from("fail"))
                }
            },
            &[Duration::ZERO, Duration::ZERO],
        )
        .await;
        assert_eq!(result, Err(String::from("fail")));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn no_delays_means_single_attempt() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let result: std::result::Result<(), String> = retry_with_backoff(
            || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(String::from("fail"))
                }
            },
            &[],
        )
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
