//! Shared token-bucket rate limiter for external provider calls (§5 "Rate
//! limiting to external providers is a shared token bucket per provider").
//!
//! Grounded on `llmspell-hooks::rate_limiter::token_bucket::TokenBucket`;
//! trimmed to the subset the ingestion fan-out (C8) actually needs: acquire
//! before a call, refill continuously by elapsed time.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Token bucket configuration.
#[derive(Debug, Clone, Copy)]
pub struct TokenBucketConfig {
    /// Steady-state capacity (max tokens held).
    pub capacity: f64,
    /// Tokens added per second.
    pub refill_rate_per_sec: f64,
}

impl Default for TokenBucketConfig {
    fn default() -> Self {
        Self { capacity: 8.0, refill_rate_per_sec: 4.0 }
    }
}

struct Inner {
    tokens: f64,
    last_refill: DateTime<Utc>,
}

/// A shared, thread-safe token bucket. Cloned handles (`Arc<TokenBucket>`)
/// are distributed to concurrent ingestion workers so they all draw from one
/// provider-level budget, per §5.
pub struct TokenBucket {
    config: TokenBucketConfig,
    inner: Mutex<Inner>,
}

impl TokenBucket {
    #[must_use]
    pub fn new(config: TokenBucketConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner { tokens: config.capacity, last_refill: Utc::now() }),
        }
    }

    fn refill(&self, inner: &mut Inner) {
        let now = Utc::now();
        let elapsed_secs =
            now.signed_duration_since(inner.last_refill).num_milliseconds() as f64 / 1000.0;
        if elapsed_secs > 0.0 {
            inner.tokens =
                (inner.tokens + elapsed_secs * self.config.refill_rate_per_sec).min(self.config.capacity);
            inner.last_refill = now;
        }
    }

    /// Try to acquire one token, non-blocking.
    pub fn try_acquire(&self) -> bool {
        let mut inner = self.inner.lock();
        self.refill(&mut inner);
        if inner.tokens >= 1.0 {
            inner.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Acquire one token, async-sleeping in small increments until available.
    /// Used by C8's bounded fan-out before each provider call.
    pub async fn acquire(&self) {
        loop {
            if self.try_acquire() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(25)).await;
        }
    }

    #[must_use]
    pub fn available(&self) -> f64 {
        let mut inner = self.inner.lock();
        self.refill(&mut inner);
        inner.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_full_capacity() {
        let b = TokenBucket::new(TokenBucketConfig::default());
        assert!((b.available() - 8.0).abs() < 1e-6);
    }

    #[test]
    fn acquire_drains_then_refills() {
        let b = TokenBucket::new(TokenBucketConfig { capacity: 2.0, refill_rate_per_sec: 1000.0 });
        assert!(b.try_acquire());
        assert!(b.try_acquire());
        assert!(!b.try_acquire());
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(b.try_acquire());
    }

    #[tokio::test]
    async fn async_acquire_eventually_succeeds() {
        let b = TokenBucket::new(TokenBucketConfig { capacity: 1.0, refill_rate_per_sec: 100.0 });
        b.acquire().await;
        b.acquire().await; // must wait for refill, not hang forever
    }
}
