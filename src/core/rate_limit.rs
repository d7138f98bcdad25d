//! Token bucket bounding how often a scraper may navigate.
//!
//! The bucket is refilled lazily on every `consume` call. A caller that finds
//! too few tokens sleeps for exactly the deficit while holding the lock, so
//! concurrent callers sharing one bucket are served one after another and
//! none of them proceeds before its tokens have accrued.

use log::trace;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

const MIN_RATE: f64 = 0.001;

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    rate: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// `capacity` of `None` (or zero) means one token: strict per-request
    /// throttling. The bucket starts full.
    pub fn new(rate_per_sec: f64, capacity: Option<u32>) -> Self {
        let capacity = f64::from(capacity.filter(|c| *c > 0).unwrap_or(1));
        Self {
            capacity,
            rate: rate_per_sec.max(MIN_RATE),
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub async fn consume(&self, tokens: u32) {
        let needed = f64::from(tokens);
        let mut state = self.state.lock().await;

        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.last_refill = now;
        state.tokens = (state.tokens + elapsed * self.rate).min(self.capacity);

        if state.tokens < needed {
            let deficit = needed - state.tokens;
            let wait = Duration::from_secs_f64(deficit / self.rate);
            trace!("Rate limiter sleeping {:?} for {} token(s)", wait, tokens);
            sleep(wait).await;
            state.tokens = 0.0;
            state.last_refill = Instant::now();
        } else {
            state.tokens -= needed;
        }
    }

    /// Tokens currently available, refilled to now. Does not consume.
    pub async fn available(&self) -> f64 {
        let state = self.state.lock().await;
        let elapsed = state.last_refill.elapsed().as_secs_f64();
        (state.tokens + elapsed * self.rate).min(self.capacity)
    }
}

impl Default for TokenBucket {
    fn default() -> Self {
        Self::new(1.0, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_first_token_is_immediate() {
        let bucket = TokenBucket::new(1.0, None);
        let start = Instant::now();

        bucket.consume(1).await;

        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_deficit_at_configured_rate() {
        let bucket = TokenBucket::new(2.0, None);
        bucket.consume(1).await;

        let start = Instant::now();
        bucket.consume(1).await;
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(500));
        assert!(elapsed < Duration::from_millis(510));
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_refill_shortens_wait() {
        let bucket = TokenBucket::new(1.0, Some(4));
        bucket.consume(4).await;

        sleep(Duration::from_millis(1500)).await;

        let start = Instant::now();
        bucket.consume(2).await;
        let elapsed = start.elapsed();

        // 1.5 tokens accrued, 0.5 short at 1 token/s
        assert!(elapsed >= Duration::from_millis(500));
        assert!(elapsed < Duration::from_millis(510));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_up_to_capacity_is_immediate() {
        let bucket = TokenBucket::new(1.0, Some(3));
        let start = Instant::now();

        bucket.consume(1).await;
        bucket.consume(1).await;
        bucket.consume(1).await;

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(bucket.available().await < 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_never_exceeds_capacity() {
        let bucket = TokenBucket::new(10.0, Some(2));
        sleep(Duration::from_secs(60)).await;

        assert_eq!(bucket.available().await, 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_are_serialized() {
        let bucket = Arc::new(TokenBucket::new(1.0, None));
        let start = Instant::now();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let bucket = Arc::clone(&bucket);
                tokio::spawn(async move {
                    bucket.consume(1).await;
                    Instant::now()
                })
            })
            .collect();

        let mut finished = Vec::new();
        for handle in handles {
            finished.push(handle.await.unwrap());
        }
        finished.sort();

        // One immediate, then one per second.
        assert!(finished[2].duration_since(start) >= Duration::from_secs(2));
    }

    #[test]
    fn test_defaults() {
        let bucket = TokenBucket::new(0.0, Some(0));
        assert_eq!(bucket.capacity(), 1.0);
        assert_eq!(bucket.rate(), MIN_RATE);
    }
}
