//! Retrying platform calls

use crate::error::RunError;
use crate::policy::RetryPolicy;
use runbridge_core::PlatformResult;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Run `call` until it succeeds, fails permanently or the retry budget is spent.
///
/// Cancellation is observed while the call is in flight and while backing off.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    cancel: &CancellationToken,
    mut call: F,
) -> Result<T, RunError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PlatformResult<T>>,
{
    let mut attempt: u32 = 1;
    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RunError::Cancelled { run_id: None }),
            result = call() => result,
        };

        let error = match result {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !error.is_retryable() {
            return Err(RunError::Platform(error));
        }
        if attempt >= policy.max_attempts {
            return Err(RunError::PlatformUnavailable {
                operation,
                attempts: attempt,
                source: error,
            });
        }

        let delay = policy.delay_for(attempt, &error);
        warn!(
            operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Platform call failed, retrying"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RunError::Cancelled { run_id: None }),
            _ = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runbridge_core::PlatformError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failures_then_succeeds() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::default();
        let cancel = CancellationToken::new();

        let result = with_retry(&policy, "get run", &cancel, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(PlatformError::Unavailable {
                        status: 503,
                        message: "busy".into(),
                    })
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_attempts() {
        let policy = RetryPolicy::default().with_max_attempts(3);
        let cancel = CancellationToken::new();

        let result: Result<(), RunError> = with_retry(&policy, "create run", &cancel, || async {
            Err(PlatformError::transport("connection reset"))
        })
        .await;

        match result {
            Err(RunError::PlatformUnavailable {
                operation,
                attempts,
                ..
            }) => {
                assert_eq!(operation, "create run");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_are_not_retried() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::default();
        let cancel = CancellationToken::new();

        let result: Result<(), RunError> = with_retry(&policy, "get run", &cancel, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(PlatformError::not_found("threads/t1")) }
        })
        .await;

        assert!(matches!(
            result,
            Err(RunError::Platform(PlatformError::NotFound { .. }))
        ));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn honours_retry_after() {
        let policy = RetryPolicy::default();
        let cancel = CancellationToken::new();
        let attempts = AtomicU32::new(0);
        let start = tokio::time::Instant::now();

        let _ = with_retry(&policy, "get run", &cancel, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(PlatformError::RateLimited {
                        retry_after: Some(Duration::from_secs(7)),
                    })
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(start.elapsed() >= Duration::from_secs(7));
    }

    #[tokio::test]
    async fn cancelled_token_stops_immediately() {
        let policy = RetryPolicy::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result: Result<(), RunError> =
            with_retry(&policy, "get run", &cancel, || async { Ok(()) }).await;
        assert!(matches!(result, Err(RunError::Cancelled { run_id: None })));
    }
}
