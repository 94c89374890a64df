//! Retry policy with exponential backoff, and the sleep seam it waits through.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts per request, counting the first one.
    /// Transport failures, non-2xx responses and rate limiting share this budget.
    pub max_attempts: u32,
    /// Delay before the first backoff retry.
    pub initial_delay: Duration,
    /// Maximum delay between backoff retries.
    pub max_delay: Duration,
    /// Backoff strategy to use.
    pub backoff: BackoffStrategy,
    /// Wait applied on HTTP 429 when the server sends no `Retry-After`.
    pub default_retry_after: Duration,
    /// Re-authentications allowed per request after HTTP 401.
    /// These do not consume `max_attempts`.
    pub max_auth_refreshes: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff: BackoffStrategy::Exponential { factor: 2.0 },
            default_retry_after: Duration::from_secs(60),
            max_auth_refreshes: 1,
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with the given max attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Create a new retry config with the given initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Create a new retry config with the given max delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Create a new retry config with the given backoff strategy.
    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the wait used for HTTP 429 responses without `Retry-After`.
    pub fn with_default_retry_after(mut self, delay: Duration) -> Self {
        self.default_retry_after = delay;
        self
    }

    /// Set how many times a single request may re-authenticate after HTTP 401.
    pub fn with_max_auth_refreshes(mut self, refreshes: u32) -> Self {
        self.max_auth_refreshes = refreshes;
        self
    }

    /// Single attempt, no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

/// Backoff strategy for determining retry delays.
#[derive(Debug, Clone, Copy)]
pub enum BackoffStrategy {
    /// Constant delay between retries.
    Constant,
    /// Exponential increase in delay (delay * factor^attempt).
    Exponential { factor: f64 },
}

impl BackoffStrategy {
    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay(&self, attempt: u32, initial_delay: Duration, max_delay: Duration) -> Duration {
        let delay = match self {
            BackoffStrategy::Constant => initial_delay,
            BackoffStrategy::Exponential { factor } => {
                let multiplier = factor.powi(attempt.min(i32::MAX as u32) as i32);
                let secs = initial_delay.as_secs_f64() * multiplier;
                if secs.is_finite() {
                    Duration::from_secs_f64(secs.min(max_delay.as_secs_f64()))
                } else {
                    max_delay
                }
            }
        };

        std::cmp::min(delay, max_delay)
    }
}

/// Per-request retry bookkeeping.
///
/// Two independent budgets: failed attempts (transport errors, non-2xx,
/// rate limiting) and re-authentications after HTTP 401.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    attempt: u32,
    auth_refreshes: u32,
}

impl RetryPolicy {
    /// Create a new retry policy from config.
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            attempt: 0,
            auth_refreshes: 0,
        }
    }

    /// Number of failed attempts recorded so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Number of re-authentications recorded so far.
    pub fn auth_refreshes(&self) -> u32 {
        self.auth_refreshes
    }

    /// Record a failed attempt and return the backoff before the next one.
    /// Returns None once the attempt budget is spent.
    pub fn record_failure(&mut self) -> Option<Duration> {
        let backoff_index = self.attempt;
        if !self.consume_attempt() {
            return None;
        }

        Some(self.config.backoff.delay(
            backoff_index,
            self.config.initial_delay,
            self.config.max_delay,
        ))
    }

    /// Record a rate-limited attempt and return the server-requested wait.
    /// Returns None once the attempt budget is spent.
    pub fn record_rate_limit(&mut self, retry_after: Option<Duration>) -> Option<Duration> {
        if !self.consume_attempt() {
            return None;
        }

        Some(retry_after.unwrap_or(self.config.default_retry_after))
    }

    /// Record a re-authentication. Returns false when the refresh budget is spent.
    pub fn record_auth_refresh(&mut self) -> bool {
        if self.auth_refreshes >= self.config.max_auth_refreshes {
            return false;
        }
        self.auth_refreshes += 1;
        true
    }

    fn consume_attempt(&mut self) -> bool {
        self.attempt += 1;
        self.attempt < self.config.max_attempts
    }
}

/// Where the executor waits between attempts.
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    /// Wait for the given duration.
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Records requested waits and returns immediately.
///
/// Clones share the same record, so a test can keep one handle and give
/// another to the client.
#[derive(Debug, Default, Clone)]
pub struct RecordingSleeper {
    waits: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits requested so far, in order.
    pub fn waits(&self) -> Vec<Duration> {
        match self.waits.lock() {
            Ok(waits) => waits.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        match self.waits.lock() {
            Ok(mut waits) => waits.push(duration),
            Err(poisoned) => poisoned.into_inner().push(duration),
        }
        Box::pin(futures::future::ready(()))
    }
}
