//! Token-bucket rate limiter.
//!
//! The bucket refills continuously and lazily: every check first credits
//! `elapsed / refill_interval * max_tokens`, capped at `max_tokens`. Checks
//! never wait; a denial is returned immediately so the caller can surface a
//! retry hint. Denials happen before the execution policy runs, so they never
//! count against retry budgets or breaker failure counts.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Bucket capacity (default: 4500, 90% of the upstream 5,000/hour)
    pub max_tokens: u32,
    /// Time to refill an empty bucket (default: 1 hour)
    pub refill_interval: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4500,
            refill_interval: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Process-wide outbound call budget.
#[derive(Debug)]
pub struct TokenBucketRateLimiter {
    max_tokens: f64,
    refill_interval: Duration,
    bucket: Mutex<Bucket>,
}

impl TokenBucketRateLimiter {
    /// Create a full bucket.
    pub fn new(config: RateLimiterConfig) -> Self {
        let max_tokens = f64::from(config.max_tokens.max(1));
        Self {
            max_tokens,
            refill_interval: config.refill_interval.max(Duration::from_millis(1)),
            bucket: Mutex::new(Bucket {
                tokens: max_tokens,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Take `count` tokens if available. Leaves the bucket untouched on denial.
    pub fn try_consume(&self, count: u32) -> bool {
        let mut bucket = self.refilled();
        let count = f64::from(count);
        if bucket.tokens >= count {
            bucket.tokens -= count;
            true
        } else {
            false
        }
    }

    /// Milliseconds until one whole token is available (0 if one is now).
    pub fn ms_until_next_token(&self) -> u64 {
        let bucket = self.refilled();
        if bucket.tokens >= 1.0 {
            return 0;
        }
        let ms_per_token = self.refill_interval.as_secs_f64() * 1000.0 / self.max_tokens;
        ((1.0 - bucket.tokens) * ms_per_token).ceil().max(0.0) as u64
    }

    /// Whole tokens currently available.
    pub fn remaining(&self) -> u32 {
        self.refilled().tokens.floor() as u32
    }

    /// Bucket capacity.
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens as u32
    }

    fn refilled(&self) -> MutexGuard<'_, Bucket> {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(bucket.last_refill);
        if !elapsed.is_zero() {
            let credit =
                elapsed.as_secs_f64() / self.refill_interval.as_secs_f64() * self.max_tokens;
            bucket.tokens = (bucket.tokens + credit).min(self.max_tokens);
            bucket.last_refill = now;
        }
        bucket
    }
}

impl Default for TokenBucketRateLimiter {
    fn default() -> Self {
        Self::new(RateLimiterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_tokens: u32, refill_ms: u64) -> TokenBucketRateLimiter {
        TokenBucketRateLimiter::new(RateLimiterConfig {
            max_tokens,
            refill_interval: Duration::from_millis(refill_ms),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_full() {
        let limiter = limiter(10, 1000);
        assert_eq!(limiter.remaining(), 10);
        assert_eq!(limiter.ms_until_next_token(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion() {
        let limiter = limiter(10, 1000);
        for _ in 0..10 {
            assert!(limiter.try_consume(1));
        }
        assert!(!limiter.try_consume(1));
        assert_eq!(limiter.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_denial_does_not_mutate() {
        let limiter = limiter(10, 1000);
        assert!(limiter.try_consume(7));
        assert!(!limiter.try_consume(4));
        assert_eq!(limiter.remaining(), 3);
        assert!(limiter.try_consume(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_interval_refills_half() {
        let limiter = limiter(10, 1000);
        assert!(limiter.try_consume(10));

        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(limiter.remaining(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_exceeds_capacity() {
        let limiter = limiter(10, 1000);
        assert!(limiter.try_consume(1));

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert_eq!(limiter.remaining(), 10);
        assert!(limiter.try_consume(10));
        assert!(!limiter.try_consume(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ms_until_next_token() {
        // 100ms per token
        let limiter = limiter(10, 1000);
        assert!(limiter.try_consume(10));
        assert_eq!(limiter.ms_until_next_token(), 100);

        tokio::time::advance(Duration::from_millis(40)).await;
        assert_eq!(limiter.ms_until_next_token(), 60);

        tokio::time::advance(Duration::from_millis(60)).await;
        assert_eq!(limiter.ms_until_next_token(), 0);
        assert!(limiter.try_consume(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_consumers_share_one_budget() {
        let limiter = std::sync::Arc::new(limiter(10, 3_600_000));

        let tasks: Vec<_> = (0..64)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.try_consume(1) })
            })
            .collect();

        let mut granted = 0;
        for task in tasks {
            if task.await.unwrap() {
                granted += 1;
            }
        }

        assert_eq!(granted, 10);
        assert_eq!(limiter.remaining(), 0);
    }
}
