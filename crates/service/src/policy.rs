//! Service policies: negative stock handling, lock waits, retry/backoff.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What to do when a mutation would drive stock negative.
///
/// The source event flows disagree on this, so it is a configuration switch:
/// strict ledgers reject, POS-lagging deployments allow sales to continue
/// while inventory tracking catches up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativeStockPolicy {
    Reject,
    Allow,
}

impl Default for NegativeStockPolicy {
    fn default() -> Self {
        Self::Reject
    }
}

/// Backoff strategy for retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed,
    /// Exponential backoff: base * 2^attempt
    Exponential,
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Exponential
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (0 = no retries)
    pub max_attempts: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
    /// Backoff strategy
    pub strategy: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(500),
            strategy: BackoffStrategy::Exponential,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with fixed delays.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            max_delay: delay,
            strategy: BackoffStrategy::Fixed,
        }
    }

    /// Calculate delay for a given attempt number (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_ms = self.base_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;

        let delay_ms = match self.strategy {
            BackoffStrategy::Fixed => base_ms,
            BackoffStrategy::Exponential => {
                let exp = 1u64 << (attempt - 1).min(16);
                base_ms.saturating_mul(exp).min(max_ms)
            }
        };

        Duration::from_millis(delay_ms)
    }

    /// Check if more retries are allowed.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Configuration of the stock mutation service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub negative_stock: NegativeStockPolicy,
    /// Bound on key-lock acquisition; exceeding it fails with `Contention`.
    pub lock_timeout: Duration,
    /// Backoff between lock acquisition attempts.
    pub lock_backoff: RetryPolicy,
    /// When set, count submissions append aligning correction movements.
    pub align_to_count: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            negative_stock: NegativeStockPolicy::default(),
            lock_timeout: Duration::from_secs(2),
            lock_backoff: RetryPolicy::fixed(u32::MAX, Duration::from_millis(2)),
            align_to_count: false,
        }
    }
}

impl ServiceConfig {
    pub fn with_negative_stock(mut self, policy: NegativeStockPolicy) -> Self {
        self.negative_stock = policy;
        self
    }

    pub fn with_align_to_count(mut self, align: bool) -> Self {
        self.align_to_count = align;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }
}
