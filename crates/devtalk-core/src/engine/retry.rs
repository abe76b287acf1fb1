//! Bounded retry policy with fixed backoff

use async_trait::async_trait;
use std::time::Duration;

use crate::config::RetryConfig;

/// How many times to call the provider and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first one included (at least 1)
    pub max_attempts: u32,
    /// Pause after a failed attempt when another one follows
    pub backoff: Duration,
    /// Upper bound for a single provider call
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration, attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            attempt_timeout,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_secs(config.backoff_secs),
            Duration::from_secs(config.attempt_timeout_secs),
        )
    }
}

/// Delay capability used between attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_from_config() {
        let policy = RetryPolicy::from(&RetryConfig::default());
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.backoff, Duration::from_secs(2));
        assert_eq!(policy.attempt_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_policy_at_least_one_attempt() {
        let policy = RetryPolicy::new(0, Duration::ZERO, Duration::from_secs(1));
        assert_eq!(policy.max_attempts, 1);
    }

    #[tokio::test]
    async fn test_tokio_sleeper_waits() {
        let start = std::time::Instant::now();
        TokioSleeper.sleep(Duration::from_millis(5)).await;
        assert!(start.elapsed() >= Duration::from_millis(5));
    }
}
