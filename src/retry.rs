//! Retry policy for transient HTTP failures
//!
//! The policy is an explicit value handed to the page fetcher: an exponential
//! backoff function, a total-wait budget (and optional attempt cap), and a
//! predicate separating transient from fatal failures. Backoff sleeps observe
//! the global shutdown coordinator so a Ctrl+C interrupts a pending wait.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{ConsoleError, ConsoleResult};
use crate::shutdown;

/// Initial backoff delay in milliseconds
pub const INITIAL_BACKOFF_MS: u64 = 1_000;

/// Maximum accumulated backoff across all retries of one call, in milliseconds
pub const MAX_TOTAL_WAIT_MS: u64 = 16_000;

/// Classification of failures for retry decisions and user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network timeout
    NetworkTimeout,
    /// Connection refused, DNS failure or other offline scenario
    NetworkOffline,
    /// HTTP 429 rate limit exceeded
    RateLimit,
    /// HTTP 5xx server error
    ServerError(u16),
    /// HTTP 400 or local validation failure
    InvalidRequest,
    /// Authentication failures (401/403)
    AuthFailed(u16),
    /// Other client errors (4xx, except 429)
    ClientError(u16),
    /// Domain-level rejection reported in a successful response
    Domain,
    /// Generic transport failure
    NetworkGeneric,
}

impl FailureKind {
    /// Classify an HTTP status code
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => FailureKind::InvalidRequest,
            401 | 403 => FailureKind::AuthFailed(status),
            429 => FailureKind::RateLimit,
            500..=599 => FailureKind::ServerError(status),
            _ => FailureKind::ClientError(status),
        }
    }

    /// User-friendly description used inside retry log messages.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "network timeout",
            Self::NetworkOffline => "connection failed",
            Self::RateLimit => "rate limit exceeded",
            Self::ServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
            Self::InvalidRequest => "invalid request",
            Self::AuthFailed(code) => match code {
                401 => "authentication failed (401)",
                403 => "authentication failed (403)",
                _ => "authentication failed",
            },
            Self::ClientError(code) => match code {
                404 => "resource not found",
                _ => "client error",
            },
            Self::Domain => "request refused",
            Self::NetworkGeneric => "network error",
        }
    }

    /// Suggested remediation shown when retries are exhausted.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "Check your network connection and firewall settings",
            Self::NetworkOffline => "Verify internet connectivity and DNS resolution",
            Self::RateLimit => "Reduce the request rate or wait before searching again",
            Self::ServerError(_) => "The console API may be experiencing issues, try again later",
            Self::InvalidRequest => "Check search filters and identifiers for typos",
            Self::AuthFailed(_) => "Verify your credentials or refresh your token",
            Self::ClientError(_) => "Review request parameters",
            Self::Domain => "Review the server message",
            Self::NetworkGeneric => "Check network connectivity and try again",
        }
    }

    /// Whether failures of this kind are typically transient.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkTimeout
                | Self::NetworkOffline
                | Self::NetworkGeneric
                | Self::RateLimit
                | Self::ServerError(_)
        )
    }
}

/// Exponential backoff retry policy
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    initial_backoff: Duration,
    multiplier: u32,
    max_total_wait: Duration,
    max_attempts: Option<usize>,
    retry_on: fn(&ConsoleError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
            multiplier: 2,
            max_total_wait: Duration::from_millis(MAX_TOTAL_WAIT_MS),
            max_attempts: None,
            retry_on: ConsoleError::is_transient,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self::default().with_max_attempts(1)
    }

    /// Set the first backoff delay
    pub fn with_initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = delay;
        self
    }

    /// Set the growth factor between consecutive delays (minimum 1)
    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier.max(1);
        self
    }

    /// Set the total backoff budget
    pub fn with_max_total_wait(mut self, budget: Duration) -> Self {
        self.max_total_wait = budget;
        self
    }

    /// Cap the number of attempts (initial call included)
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = Some(attempts.max(1));
        self
    }

    /// Replace the transient-failure predicate
    pub fn with_predicate(mut self, retry_on: fn(&ConsoleError) -> bool) -> Self {
        self.retry_on = retry_on;
        self
    }

    /// Total backoff budget
    pub fn max_total_wait(&self) -> Duration {
        self.max_total_wait
    }

    /// Delay before retry number `retry` (0-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(retry);
        self.initial_backoff.saturating_mul(factor)
    }

    /// Whether the policy treats `err` as transient
    pub fn should_retry(&self, err: &ConsoleError) -> bool {
        (self.retry_on)(err)
    }

    /// Run `op` until it succeeds, fails fatally, or the budget is spent
    ///
    /// A retry is only scheduled when its delay still fits into the remaining
    /// budget, so the accumulated sleep never exceeds `max_total_wait`.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> ConsoleResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ConsoleResult<T>>,
    {
        let mut attempt = 0usize;
        let mut waited = Duration::ZERO;

        loop {
            attempt += 1;
            let err = match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        let ctx = RetryContext::new(operation, attempt, None, Duration::ZERO, "");
                        info!("{}", ctx.format_success());
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !self.should_retry(&err) {
                debug!(operation, attempt, "non-retryable failure: {}", err);
                return Err(err);
            }

            let delay = self.backoff((attempt - 1) as u32);
            let attempts_left = self.max_attempts.map_or(true, |max| attempt < max);
            let context = RetryContext::new(
                operation,
                attempt,
                Some(err.failure_kind()),
                delay,
                err.to_string(),
            );

            if !attempts_left || waited + delay > self.max_total_wait {
                warn!("{}", context.format_failure(waited));
                return Err(ConsoleError::RetriesExhausted {
                    attempts: attempt,
                    waited,
                    last: Box::new(err),
                });
            }

            warn!("{}", context.format_retry());
            crate::metrics::record_retry_backoff(delay, attempt);
            sleep_unless_cancelled(delay).await?;
            waited += delay;
        }
    }
}

/// Sleep for `delay`, returning early with [`ConsoleError::Cancelled`] on shutdown
async fn sleep_unless_cancelled(delay: Duration) -> ConsoleResult<()> {
    match shutdown::get_global_shutdown() {
        Some(handle) => {
            if handle.is_shutdown_requested() {
                return Err(ConsoleError::Cancelled);
            }
            tokio::select! {
                _ = tokio::time::sleep(delay) => Ok(()),
                _ = handle.wait_for_shutdown() => Err(ConsoleError::Cancelled),
            }
        }
        None => {
            tokio::time::sleep(delay).await;
            Ok(())
        }
    }
}

/// Context for formatting retry log messages.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Operation being retried (e.g. "catalog search page 2")
    pub operation: String,
    /// Current attempt number (1-based)
    pub attempt: usize,
    /// Failure classification, if the attempt failed
    pub kind: Option<FailureKind>,
    /// Backoff until the next attempt
    pub backoff: Duration,
    /// Original error message
    pub error_message: String,
}

impl RetryContext {
    /// Convenience constructor used by the retry loop.
    pub fn new(
        operation: impl Into<String>,
        attempt: usize,
        kind: Option<FailureKind>,
        backoff: Duration,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            attempt,
            kind,
            backoff,
            error_message: error_message.into(),
        }
    }

    /// Message logged before sleeping.
    pub fn format_retry(&self) -> String {
        let reason = self.kind.map_or("failure", |k| k.description());
        format!(
            "{} attempt {} failed ({}) - retrying in {:.1} seconds...",
            self.operation,
            self.attempt,
            reason,
            self.backoff.as_secs_f64()
        )
    }

    /// Message logged when a retried call eventually succeeds.
    pub fn format_success(&self) -> String {
        format!("{} succeeded on attempt {}", self.operation, self.attempt)
    }

    /// Summary logged when the budget is spent.
    pub fn format_failure(&self, waited: Duration) -> String {
        let suggestion = self.kind.map_or("", |k| k.suggestion());
        format!(
            "[FAILED] {} after {} attempts ({:.1}s backoff): {}. {}",
            self.operation,
            self.attempt,
            waited.as_secs_f64(),
            self.error_message,
            suggestion
        )
    }
}
