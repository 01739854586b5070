use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Buckets idle for longer than this are dropped by [`RateLimiter::cleanup`].
const IDLE_EVICTION: Duration = Duration::from_secs(300);

/// Per-client token bucket.
///
/// Each client (keyed by forwarded IP) may make `per_minute` requests per
/// minute, with bursts up to the same amount. Tokens refill continuously.
/// The visit recorder and the inquiry form each hold their own limiter.
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<String, Bucket>>>,
    per_minute: u32,
}

struct Bucket {
    tokens: f64,
    last_seen: Instant,
}

impl RateLimiter {
    /// A limit of 0 disables limiting.
    pub fn new(per_minute: u32) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            per_minute,
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.per_minute > 0
    }

    /// Take a token for `client`. Returns `false` when the client is over its rate.
    pub fn check(&self, client: &str) -> bool {
        self.check_at(client, Instant::now())
    }

    #[allow(clippy::significant_drop_tightening)]
    fn check_at(&self, client: &str, now: Instant) -> bool {
        if !self.is_enabled() {
            return true;
        }
        let burst = f64::from(self.per_minute);
        let refill_per_sec = burst / 60.0;

        let mut buckets = self.buckets.lock();
        let bucket = buckets.entry(client.to_string()).or_insert(Bucket {
            tokens: burst,
            last_seen: now,
        });

        let elapsed = now.saturating_duration_since(bucket.last_seen).as_secs_f64();
        bucket.tokens = elapsed.mul_add(refill_per_sec, bucket.tokens).min(burst);
        bucket.last_seen = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Drop buckets for clients not seen recently.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.buckets
            .lock()
            .retain(|_, b| now.saturating_duration_since(b.last_seen) < IDLE_EVICTION);
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.buckets.lock().len()
    }
}
