//! Exponential backoff for GraphQL requests
//!
//! Delays grow as `base_delay * backoff_multiplier^retry`, capped at
//! `max_delay`, plus a uniform random jitter in `[0, jitter)`. Defaults give
//! five attempts with roughly 2s, 4s, 8s and 16s between them.

use std::time::Duration;

use async_trait::async_trait;
use harvest_core::{PartialErrorPolicy, RetrySettings};

/// Retry parameters owned by a [`GraphQlClient`](crate::GraphQlClient)
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Growth factor per retry
    pub backoff_multiplier: f64,
    /// Upper bound for the random jitter
    pub jitter: Duration,
    /// Cap for the delay before jitter
    pub max_delay: Duration,
    /// HTTP statuses worth retrying
    pub retryable_statuses: Vec<u16>,
    /// Handling of responses with both `data` and `errors`
    pub partial_errors: PartialErrorPolicy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: settings.base_delay,
            backoff_multiplier: settings.backoff_multiplier,
            jitter: settings.jitter,
            max_delay: settings.max_delay,
            retryable_statuses: settings.retryable_statuses.clone(),
            partial_errors: settings.partial_errors,
        }
    }

    /// A policy that never waits, for tests and local endpoints
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::ZERO,
            jitter: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Deterministic part of the delay after the given failed attempt (0-indexed)
    pub fn base_delay_for(&self, retry: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Full delay including a fresh jitter sample
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay_for(retry) + self.jitter.mul_f64(rand::random::<f64>())
    }
}

/// Waits between retry attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Sleeps on the Tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_matches_settings() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_secs(2));
        assert_eq!(policy.jitter, Duration::from_secs(1));
        assert_eq!(policy.partial_errors, PartialErrorPolicy::Retry);
    }

    #[test]
    fn test_base_delays_double() {
        let policy = RetryPolicy::default();
        let delays: Vec<_> = (0..4).map(|r| policy.base_delay_for(r)).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8),
                Duration::from_secs(16),
            ]
        );
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy {
            max_delay: Duration::from_secs(10),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.base_delay_for(3), Duration::from_secs(10));
        assert_eq!(policy.base_delay_for(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let policy = RetryPolicy::default();
        for _ in 0..100 {
            let delay = policy.delay_for(0);
            assert!(delay >= Duration::from_secs(2));
            assert!(delay < Duration::from_secs(3));
        }
    }

    #[test]
    fn test_immediate_policy_never_waits() {
        let policy = RetryPolicy::immediate(3);
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_for(2), Duration::ZERO);
    }
}
