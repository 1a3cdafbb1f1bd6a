//! Retry policy: exponential backoff with jitter and transient-failure
//! classification.
//!
//! Attempt 1 runs immediately. A retryable failure (transport error, or one
//! of the transient HTTP statuses) waits `base * factor^retry + jitter`
//! before the next attempt; a non-retryable failure short-circuits. The
//! backoff sleep races the caller's cancellation token.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::cancel::CancelToken;
use crate::outcome::FetchError;
use crate::upstream::{RawResponse, TransportError};

/// Upper bound of the uniform random delay added to each backoff step.
/// Spreads synchronized callers so retries do not land in one burst.
const MAX_JITTER_MS: u64 = 100;

/// HTTP statuses in the transient class: request timeout, rate limiting,
/// and every server-side failure.
pub const fn transient_status(status: u16) -> bool {
    matches!(status, 408 | 429) || (status >= 500 && status < 600)
}

/// Backoff strategy between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Fixed delay between retries.
    Fixed { delay: Duration },
    /// Exponential delay: `base * factor^retry`, capped at `max`, with an
    /// optional additive jitter of up to [`MAX_JITTER_MS`].
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(200),
            factor: 2.0,
            max: Duration::from_secs(3),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Delay before the retry with 0-based index `retry`.
    pub fn delay(self, retry: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let scale = factor.powi(retry as i32);
                let seconds = base.as_secs_f64() * scale;
                let capped = Duration::from_secs_f64(seconds.min(max.as_secs_f64()));

                if jitter {
                    capped + Duration::from_millis(fastrand::u64(0..=MAX_JITTER_MS))
                } else {
                    capped
                }
            }
        }
    }
}

/// Configuration for the retry runner.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempt budget, the first call included. A value of 3 yields
    /// one initial attempt plus up to two retries.
    pub max_attempts: u32,
    /// Backoff strategy between attempts.
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::default(),
        }
    }
}

impl RetryConfig {
    pub fn exponential(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    pub fn fixed(delay: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed { delay },
        }
    }

    /// Single attempt, no backoff.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff: Backoff::default(),
        }
    }

    pub const fn should_retry_status(&self, status: u16) -> bool {
        transient_status(status)
    }

    /// Delay before the retry with 0-based index `retry`.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        self.backoff.delay(retry)
    }
}

/// Drive `operation` under the retry policy.
///
/// Returns the first successful response, or the last observed failure once
/// the attempt budget is exhausted or a non-retryable failure occurs.
/// Cancellation is checked before each attempt and raced against each
/// backoff sleep; it is never recorded as a failure.
pub async fn run_with_retry<F, Fut>(
    config: &RetryConfig,
    token: &CancelToken,
    mut operation: F,
) -> Result<RawResponse, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<RawResponse, TransportError>>,
{
    let budget = config.max_attempts.max(1);
    let mut last_error: Option<FetchError> = None;

    for attempt in 1..=budget {
        if attempt > 1 {
            let delay = config.delay_for_retry(attempt - 2);
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "retrying upstream call after transient failure"
            );
            tokio::select! {
                _ = token.cancelled() => return Err(FetchError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        if token.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let result = tokio::select! {
            _ = token.cancelled() => return Err(FetchError::Cancelled),
            result = operation() => result,
        };

        match result {
            Ok(response) if response.is_success() => return Ok(response),
            Ok(response) => {
                let retryable = config.should_retry_status(response.status);
                let error = FetchError::UpstreamStatus {
                    status: response.status,
                    retryable,
                };
                if !retryable {
                    return Err(error);
                }
                last_error = Some(error);
            }
            Err(transport) => {
                if token.is_cancelled() {
                    return Err(FetchError::Cancelled);
                }
                last_error = Some(FetchError::transport(transport.to_string()));
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| FetchError::transport("retry budget allowed no attempts")))
}
