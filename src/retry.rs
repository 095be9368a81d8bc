//! Retry logic with exponential backoff and fallback dispatch.
//!
//! [`RetryExecutor`] drives a single generation call through the retry state
//! machine: attempt, classify, log, back off while the error is transient,
//! then hand over to the fallback path once attempts are exhausted. Every
//! failure (retried or final) lands in the shared [`ErrorLog`]; successes are
//! returned immediately and never logged.

use crate::diagnostics::ErrorLog;
use crate::error::{ErrorContext, GenError, GenResult};
use crate::logging::{log_debug, log_info};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Service label attached to failures of the fallback path itself.
pub const FALLBACK_SERVICE: &str = "fallback";

/// Retry policy configuration for generation requests.
///
/// `max_attempts` of 1 means a single try with no retries; backoff delays are
/// exact - `base_delay * backoff_multiplier^(attempt-1)` capped at
/// `max_delay` - with no jitter, so callers can reason about worst-case
/// latency. Zero or negative delays are a configuration error the caller must
/// prevent; no clamping happens here beyond the cap.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first (>= 1).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Cap applied to every computed delay regardless of attempt count.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff (> 1).
    pub backoff_multiplier: f64,
    /// Timeout applied to each individual attempt.
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            request_timeout: Duration::from_secs(15),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry that follows the given attempt (1-based).
    ///
    /// The first retry waits exactly `base_delay`
    /// (`base_delay * backoff_multiplier^0`).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1);
        let delay =
            self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(exp as i32);
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }
}

/// Drives operations through retry, timeout, and fallback handling.
///
/// Holds the shared error log so every failure is recorded exactly once, at
/// the point it is observed.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    log: ErrorLog,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy, log: ErrorLog) -> Self {
        Self { policy, log }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute an operation with retries but no fallback path.
    pub async fn execute<T, F, Fut>(&self, context: &ErrorContext, operation: F) -> GenResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = GenResult<T>>,
    {
        self.execute_with_fallback(
            context,
            operation,
            None::<fn() -> std::future::Ready<GenResult<T>>>,
        )
        .await
    }

    /// Execute an operation with retries, then a fallback once exhausted.
    ///
    /// Attempts are numbered from 1. A failure is classified and logged, then
    /// either retried after a backoff delay (transient error, attempts left)
    /// or treated as final. With a final error the fallback runs if provided;
    /// a fallback failure is relabeled to [`FALLBACK_SERVICE`], logged, and
    /// returned as the overall error.
    pub async fn execute_with_fallback<T, F, Fut, G, GFut>(
        &self,
        context: &ErrorContext,
        operation: F,
        fallback: Option<G>,
    ) -> GenResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = GenResult<T>>,
        G: FnOnce() -> GFut,
        GFut: Future<Output = GenResult<T>>,
    {
        let fallback_available = fallback.is_some();
        let mut attempt: u32 = 1;

        let last_error = loop {
            log_debug!(
                service = %context.service,
                operation = %context.operation,
                attempt = attempt,
                max_attempts = self.policy.max_attempts,
                "Executing generation attempt"
            );

            let error = match tokio::time::timeout(self.policy.request_timeout, operation()).await
            {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(error)) => error,
                Err(_elapsed) => GenError::timeout(
                    self.policy.request_timeout.as_secs(),
                    context.for_attempt(attempt),
                ),
            };

            let error = GenError {
                context: error.context.for_attempt(attempt),
                ..error
            }
            .with_fallback_available(fallback_available);
            self.log.record(&error);

            if !error.retryable() || attempt >= self.policy.max_attempts {
                break error;
            }

            let delay = self.policy.backoff_delay(attempt);
            log_debug!(
                attempt = attempt,
                max_attempts = self.policy.max_attempts,
                delay_ms = delay.as_millis(),
                code = %error.code,
                "Attempt failed, retrying after backoff"
            );
            sleep(delay).await;
            attempt += 1;
        };

        let Some(fallback) = fallback else {
            return Err(last_error);
        };

        log_info!(
            service = %context.service,
            operation = %context.operation,
            attempts = attempt,
            code = %last_error.code,
            "Primary attempts exhausted, invoking fallback"
        );

        match tokio::time::timeout(self.policy.request_timeout, fallback()).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(fb_error)) => {
                let fb_error = fb_error.relabeled(FALLBACK_SERVICE);
                self.log.record(&fb_error);
                Err(fb_error)
            }
            Err(_elapsed) => {
                let fb_error = GenError::timeout(
                    self.policy.request_timeout.as_secs(),
                    context.for_service(FALLBACK_SERVICE),
                );
                self.log.record(&fb_error);
                Err(fb_error)
            }
        }
    }
}
