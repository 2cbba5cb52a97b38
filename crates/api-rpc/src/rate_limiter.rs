//! Rate Limiter (Token Bucket Algorithm)
//!
//! Guards the submission methods: every accepted submission starts a
//! long-running job that calls the generation service.

use std::sync::Mutex;
use std::time::Instant;

/// Token bucket shared by all submission calls
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
    capacity: f64,
    refill_per_sec: f64,
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// # Arguments
    /// * `burst` - Maximum burst size
    /// * `per_second` - Tokens added per second
    pub fn new(burst: u32, per_second: u32) -> Self {
        Self {
            bucket: Mutex::new(Bucket {
                tokens: burst as f64,
                last_refill: Instant::now(),
            }),
            capacity: burst as f64,
            refill_per_sec: per_second as f64,
        }
    }

    /// Consume one token. Returns false when the caller is throttled.
    pub fn check(&self) -> bool {
        let mut bucket = self.bucket.lock().unwrap_or_else(|e| e.into_inner());

        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Whole tokens currently available
    pub fn remaining(&self) -> u32 {
        let bucket = self.bucket.lock().unwrap_or_else(|e| e.into_inner());
        bucket.tokens.floor() as u32
    }
}
