use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Token-bucket limiter for one upstream provider.
///
/// The bucket starts full at `capacity` and refills continuously at
/// `capacity / 60` tokens per second, so a full minute of silence restores the
/// whole burst allowance but never more than that. One token is consumed per
/// request. Shared across every job that talks to the provider.
#[derive(Debug)]
pub struct RateLimiter {
    provider: &'static str,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl BucketState {
    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
            self.last_refill = now;
        }
    }

    /// Takes one token, or reports how long until one will have refilled.
    fn try_take(&mut self) -> Result<(), Duration> {
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - self.tokens;
            Err(Duration::from_secs_f64(deficit / self.refill_per_sec))
        }
    }
}

impl RateLimiter {
    /// Limiter allowing `capacity` calls per rolling minute.
    pub fn per_minute(provider: &'static str, capacity: u32) -> Self {
        let capacity = f64::from(capacity.max(1));
        Self {
            provider,
            state: Mutex::new(BucketState {
                capacity,
                tokens: capacity,
                refill_per_sec: capacity / 60.0,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Blocks until one token is available, then deducts it.
    ///
    /// The bucket lock is held only to inspect and update the count; the wait
    /// itself happens outside it. A woken waiter re-checks the bucket, so two
    /// callers can never spend the same token.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                state.refill(Instant::now());
                match state.try_take() {
                    Ok(()) => return,
                    Err(wait) => wait,
                }
            };
            tracing::debug!(
                provider = self.provider,
                wait_ms = wait.as_millis() as u64,
                "rate limit reached, waiting for token refill"
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Tokens currently available, after applying any pending refill.
    pub async fn available(&self) -> f64 {
        let mut state = self.state.lock().await;
        state.refill(Instant::now());
        state.tokens
    }
}
