//! Bounded retry with exponential backoff for external calls
//!
//! Each attempt runs under a per-call timeout. Transient failures (timeouts,
//! rate limits, overload, connection errors) are retried after
//! `delay * backoff^(n-1)`; permanent failures return immediately.

use crate::config::RetrySettings;
use crate::services::ServiceError;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Upper bound on a single backoff sleep
const MAX_RETRY_DELAY: Duration = Duration::from_secs(300);

/// The last error of a call that never succeeded
#[derive(Debug, Clone, Error)]
#[error("{error} (after {attempts} attempt(s))")]
pub struct RetryFailure {
    pub attempts: u32,
    pub error: ServiceError,
}

/// Retry policy applied to one kind of external call
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
    backoff: f64,
    call_timeout: Duration,
}

impl RetryPolicy {
    /// Creates a policy; at least one attempt and a backoff of at least 1.0 are enforced
    pub fn new(max_attempts: u32, delay: Duration, backoff: f64, call_timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            backoff: if backoff.is_finite() { backoff.max(1.0) } else { 1.0 },
            call_timeout,
        }
    }

    pub fn from_settings(settings: &RetrySettings, call_timeout: Duration) -> Self {
        Self::new(
            settings.max_attempts,
            settings.delay(),
            settings.backoff,
            call_timeout,
        )
    }

    /// Same attempts and backoff with a different per-call timeout
    pub fn with_call_timeout(&self, call_timeout: Duration) -> Self {
        Self {
            call_timeout,
            ..self.clone()
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Sleep before retry number `retry` (1 = first retry)
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.delay.as_secs_f64() * self.backoff.powi(exponent);
        if !secs.is_finite() || secs >= MAX_RETRY_DELAY.as_secs_f64() {
            MAX_RETRY_DELAY
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Runs `op` until it succeeds, fails permanently or attempts run out
    ///
    /// `op` is called once per attempt and must build a fresh future each
    /// time. A call exceeding the per-call timeout counts as a transient
    /// `ServiceError::Timeout`; the in-flight future is dropped.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, RetryFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match tokio::time::timeout(self.call_timeout, op()).await {
                Ok(Ok(value)) => {
                    if attempt > 1 {
                        tracing::info!("{} succeeded on attempt {}", label, attempt);
                    }
                    return Ok(value);
                }
                Ok(Err(e)) => e,
                Err(_) => ServiceError::Timeout(self.call_timeout),
            };

            if !error.is_transient() {
                tracing::debug!("{} failed permanently: {}", label, error);
                return Err(RetryFailure {
                    attempts: attempt,
                    error,
                });
            }

            if attempt >= self.max_attempts {
                tracing::warn!(
                    "{} failed after {} attempt(s): {}",
                    label,
                    attempt,
                    error
                );
                return Err(RetryFailure {
                    attempts: attempt,
                    error,
                });
            }

            let delay = self.delay_before_retry(attempt);
            tracing::warn!(
                "{} attempt {}/{} failed ({}), retrying in {:?}",
                label,
                attempt,
                self.max_attempts,
                error,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}
