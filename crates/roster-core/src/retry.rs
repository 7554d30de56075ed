//! Retry configuration, backoff calculation, and the async retry loop.
//!
//! - [`RetryConfig`]: retry parameters (attempt bound, backoff, jitter)
//! - [`Retryable`]: how an error type reports whether another attempt may help
//! - [`retry_with_backoff`]: run an operation until success, a permanent error,
//!   or the attempt bound
//! - [`calculate_backoff_delay_with_random`]: exponential backoff with jitter
//! - [`parse_retry_after_header`]: parse an HTTP `Retry-After` value

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Default total attempts (first try included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default base delay in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 100;
/// Default maximum delay in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 2_000;
/// Default jitter factor (0.0–1.0).
pub const DEFAULT_JITTER_FACTOR: f64 = 0.2;

/// Configuration for retry logic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    /// Total attempts including the first one (default: 3). `0` behaves as `1`.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay for exponential backoff in ms (default: 100).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Maximum delay between attempts in ms (default: 2000).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Jitter factor 0.0–1.0 (default: 0.2).
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}
fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY_MS
}
fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY_MS
}
fn default_jitter_factor() -> f64 {
    DEFAULT_JITTER_FACTOR
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            jitter_factor: DEFAULT_JITTER_FACTOR,
        }
    }
}

impl RetryConfig {
    /// A config that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Classification
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can tell a retry loop whether another attempt may succeed.
pub trait Retryable {
    /// Whether the failure is transient.
    fn is_retryable(&self) -> bool;

    /// Server-provided minimum wait before the next attempt, if any.
    fn retry_after_ms(&self) -> Option<u64> {
        None
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of a retried operation.
#[derive(Debug)]
pub struct RetryResult<T, E> {
    /// The final value or the last error.
    pub outcome: Result<T, E>,
    /// Total number of attempts made (1-based).
    pub attempts: u32,
    /// Total delay spent waiting in ms.
    pub total_delay_ms: u64,
}

impl<T, E> RetryResult<T, E> {
    /// Number of retries performed (attempts after the first).
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Retry loop
// ─────────────────────────────────────────────────────────────────────────────

/// Run `op` until it succeeds, fails permanently, or the attempt bound is hit.
///
/// The delay before retry `n` (1-based) is the jittered exponential backoff
/// for `n - 1`, raised to the error's `Retry-After` hint when that is larger.
/// A hint above `max_delay_ms` ends the loop with that error, without sleeping.
pub async fn retry_with_backoff<T, E, F, Fut>(
    config: &RetryConfig,
    label: &str,
    mut op: F,
) -> RetryResult<T, E>
where
    E: Retryable + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempts = 0u32;
    let mut total_delay_ms = 0u64;

    loop {
        attempts += 1;
        match op().await {
            Ok(value) => {
                return RetryResult {
                    outcome: Ok(value),
                    attempts,
                    total_delay_ms,
                };
            }
            Err(err) => {
                let hint_ms = err.retry_after_ms();
                let beyond_cap = hint_ms.is_some_and(|ra| ra > config.max_delay_ms);
                if !err.is_retryable() || attempts >= max_attempts || beyond_cap {
                    if beyond_cap {
                        debug!(
                            label,
                            attempt = attempts,
                            retry_after_ms = hint_ms,
                            max_delay_ms = config.max_delay_ms,
                            "retry-after exceeds max delay, giving up"
                        );
                    }
                    return RetryResult {
                        outcome: Err(err),
                        attempts,
                        total_delay_ms,
                    };
                }

                let backoff_ms = calculate_backoff_delay_with_random(
                    attempts - 1,
                    config.base_delay_ms,
                    config.max_delay_ms,
                    config.jitter_factor,
                    rand::random::<f64>(),
                );
                let delay_ms = hint_ms.map_or(backoff_ms, |ra| backoff_ms.max(ra));

                debug!(
                    label,
                    attempt = attempts,
                    max_attempts,
                    delay_ms,
                    error = %err,
                    "transient failure, retrying"
                );

                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                total_delay_ms = total_delay_ms.saturating_add(delay_ms);
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backoff calculation
// ─────────────────────────────────────────────────────────────────────────────

/// Calculate exponential backoff delay with explicit randomness.
///
/// Formula: `min(max_delay, base_delay * 2^attempt) * (1 + (random * 2 - 1) * jitter)`
///
/// `attempt` is zero-based (0 for the first retry) and `random` should be a
/// value in `[0.0, 1.0)` from a PRNG.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn calculate_backoff_delay_with_random(
    attempt: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    jitter_factor: f64,
    random: f64,
) -> u64 {
    let exponential = base_delay_ms.saturating_mul(1u64 << attempt.min(31));
    let capped = exponential.min(max_delay_ms);

    // Maps random [0,1) to [-jitter, +jitter]
    let jitter = 1.0 + (random * 2.0 - 1.0) * jitter_factor;
    let with_jitter = (capped as f64) * jitter;

    with_jitter.round().max(0.0) as u64
}

// ─────────────────────────────────────────────────────────────────────────────
// Retry-After header parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Parse a `Retry-After` HTTP header value into milliseconds.
///
/// Accepts delta-seconds (`"120"`) or an HTTP-date; past dates yield `0`.
#[must_use]
pub fn parse_retry_after_header(value: &str) -> Option<u64> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(seconds.saturating_mul(1000));
    }

    let date = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    let delay_ms = date
        .signed_duration_since(chrono::Utc::now())
        .num_milliseconds();
    Some(u64::try_from(delay_ms).unwrap_or(0))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
