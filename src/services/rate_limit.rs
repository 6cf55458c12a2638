//! Process-wide rate limit for static fetches.

use std::num::NonZeroU32;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;

/// Shared call budget; every static request waits here before going out.
///
/// Callers over the budget sleep until a slot frees up instead of failing,
/// so the aggregate rate across all workers never exceeds the quota.
pub struct FetchRateLimiter {
    limiter: DefaultDirectRateLimiter,
    per_second: u32,
}

impl FetchRateLimiter {
    /// Allow `per_second` calls per second with at most `burst` back-to-back.
    pub fn new(per_second: u32, burst: u32) -> Result<Self> {
        let rate = NonZeroU32::new(per_second)
            .ok_or_else(|| AppError::config("rate limit must be greater than zero"))?;
        let burst = NonZeroU32::new(burst)
            .ok_or_else(|| AppError::config("rate burst must be greater than zero"))?;

        Ok(Self {
            limiter: RateLimiter::direct(Quota::per_second(rate).allow_burst(burst)),
            per_second,
        })
    }

    pub fn from_config(config: &CrawlerConfig) -> Result<Self> {
        Self::new(config.rate_limit_per_sec, config.rate_burst)
    }

    /// Wait for a call slot.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    pub fn per_second(&self) -> u32 {
        self.per_second
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn test_rejects_zero_rate() {
        assert!(FetchRateLimiter::new(0, 1).is_err());
        assert!(FetchRateLimiter::new(3, 0).is_err());
    }

    #[tokio::test]
    async fn test_sequential_calls_are_spaced() {
        let limiter = FetchRateLimiter::new(20, 1).unwrap();
        let start = Instant::now();
        for _ in 0..5 {
            limiter.acquire().await;
        }
        // First call is free, the next four wait 50ms each.
        assert!(start.elapsed() >= Duration::from_millis(180));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_budget() {
        let limiter = Arc::new(FetchRateLimiter::new(20, 1).unwrap());
        let start = Instant::now();

        let tasks: Vec<_> = (0..6)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move { limiter.acquire().await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        // Six calls at 20/s with no burst need at least five intervals.
        assert!(start.elapsed() >= Duration::from_millis(230));
    }
}
