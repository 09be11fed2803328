//! Token-bucket admission gate shared by every outbound request.
//!
//! The bucket holds up to `capacity` tokens and is refilled lazily from the
//! elapsed monotonic time whenever a caller looks at it. Waiters queue on a
//! fair (FIFO) async mutex; the caller at the head of the queue sleeps until
//! its token accrues, so nobody spins and nobody starves while tokens keep
//! arriving.

use crate::error::EmailCheckError;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    capacity: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    /// Time until one whole token is available, `None` if it never will be.
    fn time_until_token(&self) -> Option<Duration> {
        if self.tokens >= 1.0 {
            return Some(Duration::ZERO);
        }
        if self.refill_per_sec <= 0.0 {
            return None;
        }
        let secs = (1.0 - self.tokens) / self.refill_per_sec;
        Duration::try_from_secs_f64(secs).ok()
    }
}

/// Rate limiter bounding the aggregate request rate across all workers.
///
/// Over any window of length `W`, at most `ceil(rate * W) + capacity`
/// acquisitions are granted.
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Create a limiter that starts full.
    ///
    /// A `refill_per_sec` of zero is allowed; the bucket then only ever hands
    /// out its initial `capacity` tokens.
    pub fn new(capacity: u32, refill_per_sec: u32) -> Self {
        Self::with_rate(capacity, f64::from(refill_per_sec))
    }

    /// Create a limiter with a fractional refill rate (tokens per second).
    pub fn with_rate(capacity: u32, refill_per_sec: f64) -> Self {
        let capacity = f64::from(capacity.max(1));
        Self {
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                capacity,
                refill_per_sec: refill_per_sec.max(0.0),
                last_refill: Instant::now(),
            }),
        }
    }

    /// Wait for one token.
    ///
    /// Suspends until a token is available or `cancel` fires. On cancellation
    /// returns `Cancelled` and nothing is debited.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), EmailCheckError> {
        if cancel.is_cancelled() {
            return Err(cancelled());
        }

        let mut bucket = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            guard = self.bucket.lock() => guard,
        };

        loop {
            bucket.refill(Instant::now());
            if bucket.tokens >= 1.0 {
                bucket.tokens -= 1.0;
                return Ok(());
            }

            match bucket.time_until_token() {
                Some(wait) => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(cancelled()),
                        _ = tokio::time::sleep(wait) => {}
                    }
                }
                None => {
                    cancel.cancelled().await;
                    return Err(cancelled());
                }
            }
        }
    }

    /// Take a token only if one is available right now.
    ///
    /// Returns `false` when the bucket is empty or another caller is
    /// currently waiting at the head of the queue.
    pub fn try_acquire(&self) -> bool {
        let Ok(mut bucket) = self.bucket.try_lock() else {
            return false;
        };
        bucket.refill(Instant::now());
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Whole tokens currently in the bucket.
    ///
    /// Returns `None` while a waiter holds the bucket.
    pub fn available(&self) -> Option<u32> {
        let mut bucket = self.bucket.try_lock().ok()?;
        bucket.refill(Instant::now());
        Some(bucket.tokens.floor() as u32)
    }
}

fn cancelled() -> EmailCheckError {
    EmailCheckError::cancelled("waiting for a rate-limit token")
}
