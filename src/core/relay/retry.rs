use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::core::error::{RelayError, Result};
use crate::providers::error::ProviderError;

/// Bounded retry with linear backoff around stream establishment.
///
/// After failed attempt `k` the relay waits `k * base_delay` before attempt
/// `k + 1`. Only transient provider failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(with = "millis")]
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay after failed attempt `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Runs `open` until it succeeds, a non-transient error occurs, the
    /// attempts run out, or `cancel` fires.
    pub async fn establish<T, F, Fut>(&self, cancel: &CancellationToken, mut open: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = std::result::Result<T, ProviderError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(RelayError::Cancelled),
                result = open(attempt) => result,
            };

            let err = match result {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(RelayError::Provider(e)),
                Err(e) => e,
            };

            if attempt >= max_attempts {
                tracing::error!(
                    attempts = attempt,
                    error = %err,
                    "Stream establishment failed, giving up"
                );
                return Err(RelayError::RetriesExhausted {
                    attempts: attempt,
                    last_error: err,
                });
            }

            let delay = self.delay_after(attempt);
            tracing::warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Stream establishment failed, retrying"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(RelayError::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn delay_is_linear_in_attempt() {
        let policy = RetryPolicy::new(4, Duration::from_millis(250));
        assert_eq!(policy.delay_after(1), Duration::from_millis(250));
        assert_eq!(policy.delay_after(2), Duration::from_millis(500));
        assert_eq!(policy.delay_after(3), Duration::from_millis(750));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();

        let value = policy
            .establish(&CancellationToken::new(), |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(ProviderError::Connection("refused".into()))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(300));
        assert!(waited < Duration::from_millis(350));
    }

    #[tokio::test(start_paused = true)]
    async fn non_transient_error_is_not_retried() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: Result<()> = policy
            .establish(&CancellationToken::new(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ProviderError::auth_with_hint("bad key", "check it")) }
            })
            .await;

        assert!(matches!(result, Err(RelayError::Provider(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_last_error() {
        let policy = RetryPolicy::new(2, Duration::from_millis(10));

        let result: Result<()> = policy
            .establish(&CancellationToken::new(), |attempt| async move {
                Err(ProviderError::server(503, format!("busy {attempt}")))
            })
            .await;

        match result {
            Err(RelayError::RetriesExhausted {
                attempts,
                last_error,
            }) => {
                assert_eq!(attempts, 2);
                assert!(last_error.to_string().contains("busy 2"));
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_backoff() {
        let policy = RetryPolicy::new(5, Duration::from_secs(60));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let result: Result<()> = policy
            .establish(&cancel, |_| async {
                Err(ProviderError::Connection("down".into()))
            })
            .await;

        assert!(matches!(result, Err(RelayError::Cancelled)));
    }

    #[test]
    fn serializes_delay_as_millis() {
        let policy = RetryPolicy::new(2, Duration::from_millis(1500));
        let json = serde_json::to_string(&policy).unwrap();
        assert_eq!(json, r#"{"max_attempts":2,"base_delay":1500}"#);
    }
}
