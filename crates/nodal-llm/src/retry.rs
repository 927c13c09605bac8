use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Randomized exponential backoff applied around every vendor call.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub min_wait_secs: u64,
    pub max_wait_secs: u64,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_wait_secs: 30,
            max_wait_secs: 120,
            multiplier: 1.0,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            min_wait_secs: 0,
            max_wait_secs: 0,
            multiplier: 1.0,
        }
    }

    /// Upper bound of the wait after the given 1-based attempt.
    ///
    /// A NaN multiplier collapses the window to `min_wait`.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
    pub fn ceiling_for(&self, attempt: u32) -> f64 {
        let min = self.min_wait_secs as f64;
        let max = (self.max_wait_secs as f64).max(min);
        let exp = self.multiplier * 2f64.powi(attempt.saturating_sub(1).min(62) as i32);
        if exp.is_nan() {
            return min;
        }
        exp.clamp(min, max)
    }

    /// Wait before retrying after the given 1-based attempt, drawn uniformly from
    /// `[min_wait, clamp(multiplier * 2^(attempt-1), min_wait, max_wait)]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let min = self.min_wait_secs as f64;
        let upper = self.ceiling_for(attempt);
        let secs = if upper <= min {
            min
        } else {
            rand::rng().random_range(min..=upper)
        };
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the policy's
/// attempts are exhausted. The last error is returned unchanged.
///
/// # Errors
///
/// Returns the error of the final attempt.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => {
                tracing::debug!(label, kind = e.kind(), "not retrying: {e}");
                return Err(e);
            }
            Err(e) if attempt >= max_attempts => {
                tracing::warn!(label, attempts = attempt, "giving up: {e}");
                return Err(e);
            }
            Err(e) => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    label,
                    kind = e.kind(),
                    "attempt {attempt}/{max_attempts} failed, retrying in {:.1}s: {e}",
                    delay.as_secs_f64()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use proptest::prelude::*;

    use super::*;
    use crate::error::LlmError;

    fn instant(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            ..RetryPolicy::none()
        }
    }

    fn server_error() -> LlmError {
        LlmError::Api {
            provider: "test".into(),
            status: 503,
            message: "unavailable".into(),
        }
    }

    #[test]
    fn default_policy_matches_backoff_window() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 3);
        assert!((p.ceiling_for(1) - 30.0).abs() < f64::EPSILON);
        assert!((p.ceiling_for(8) - 120.0).abs() < f64::EPSILON);
        assert_eq!(p.delay_for(1), Duration::from_secs(30));
    }

    #[test]
    fn nan_multiplier_waits_the_minimum() {
        let p = RetryPolicy {
            multiplier: f64::NAN,
            ..RetryPolicy::default()
        };
        assert!((p.ceiling_for(3) - 30.0).abs() < f64::EPSILON);
        assert_eq!(p.delay_for(3), Duration::from_secs(30));
    }

    #[test]
    fn extreme_waits_saturate() {
        let p = RetryPolicy {
            max_attempts: 3,
            min_wait_secs: u64::MAX,
            max_wait_secs: u64::MAX,
            multiplier: f64::INFINITY,
        };
        assert_eq!(p.delay_for(1), Duration::MAX);

        let negative = RetryPolicy {
            multiplier: -4.0,
            ..RetryPolicy::default()
        };
        assert_eq!(negative.delay_for(2), Duration::from_secs(30));
    }

    #[test]
    fn policy_deserializes_partial() {
        let p: RetryPolicy = serde_json::from_str(r#"{"max_attempts": 5}"#).unwrap();
        assert_eq!(p.max_attempts, 5);
        assert_eq!(p.min_wait_secs, 30);
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(&instant(3), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { if n < 2 { Err(server_error()) } else { Ok(n) } }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_with_backoff(&instant(3), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(server_error()) }
        })
        .await;
        assert!(matches!(result, Err(LlmError::Api { status: 503, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_errors_fail_fast() {
        let errors: [fn() -> LlmError; 3] = [
            || LlmError::Authentication {
                provider: "openai".into(),
                message: "bad key".into(),
            },
            || LlmError::RateLimited {
                provider: "openai".into(),
            },
            || LlmError::InvalidRequest("bad".into()),
        ];
        for err in errors {
            let calls = AtomicU32::new(0);
            let result: Result<()> = retry_with_backoff(&instant(3), "test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(err()) }
            })
            .await;
            assert!(result.is_err());
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let _ = retry_with_backoff(&instant(0), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(server_error()) }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    proptest! {
        #[test]
        fn delay_stays_within_window(
            attempt in 1u32..100,
            min in 0u64..60,
            span in 0u64..300,
            multiplier in 0.0f64..10.0,
        ) {
            let policy = RetryPolicy {
                max_attempts: 3,
                min_wait_secs: min,
                max_wait_secs: min + span,
                multiplier,
            };
            let delay = policy.delay_for(attempt).as_secs_f64();
            prop_assert!(delay >= min as f64 - 1e-6);
            prop_assert!(delay <= (min + span) as f64 + 1e-6);
            prop_assert!(delay <= policy.ceiling_for(attempt) + 1e-6);
        }

        #[test]
        fn ceiling_is_monotonic(attempt in 1u32..60) {
            let policy = RetryPolicy::default();
            prop_assert!(policy.ceiling_for(attempt) <= policy.ceiling_for(attempt + 1));
        }
    }
}
