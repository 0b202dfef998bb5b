use std::time::Duration;

/// Backoff schedule for retried provider calls.
///
/// `max_attempts` counts total tries including the first. The delay before
/// attempt `n` (n >= 2) is `base_delay * multiplier^(n-2)`, capped at
/// `max_delay`. A provider-supplied Retry-After hint always wins over the
/// computed delay. Immutable once built; clients share it by value.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Whether another try is allowed after `attempt` tries have finished.
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay to sleep before the given 1-based attempt. The first attempt is
    /// immediate; attempt 2 waits `base_delay` and each later attempt scales
    /// by `multiplier`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt < 2 {
            return Duration::ZERO;
        }
        let factor = self.multiplier.powi(attempt as i32 - 2);
        let secs = self.base_delay.as_secs_f64() * factor;
        let capped = secs.min(self.max_delay.as_secs_f64()).max(0.0);
        let mut delay = Duration::from_secs_f64(capped);

        if self.jitter && !delay.is_zero() {
            let span_ms = (delay.as_millis() as u64 / 10).max(1);
            delay += Duration::from_millis(pseudo_jitter_ms(span_ms));
        }
        delay
    }

    /// Delay before the given attempt, honoring an upstream Retry-After hint
    /// over the computed backoff.
    pub fn next_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        match retry_after {
            Some(hint) => hint,
            None => self.delay_before(attempt),
        }
    }
}

/// Hash-derived jitter in `0..=max_ms`, enough to de-synchronize clients
/// without pulling in a random number crate.
fn pseudo_jitter_ms(max_ms: u64) -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hash, Hasher};

    let s = RandomState::new();
    let mut hasher = s.build_hasher();
    std::time::Instant::now().hash(&mut hasher);
    hasher.finish() % (max_ms + 1)
}
