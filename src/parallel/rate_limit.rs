//! Request pacing shared by every worker
//!
//! One [`RateLimiter`] is handed to all workers, so the pace applies to the
//! run as a whole no matter how many batches are in flight. Waiting happens
//! outside the lock: callers reserve a slot, then sleep until it comes up.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;

/// Pacing policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitPolicy {
    /// No pacing
    None,
    /// At least `min_interval_ms` between two requests
    Fixed,
    /// Bursts up to `capacity`, refilled at `refill_per_sec`
    #[default]
    TokenBucket,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

#[derive(Debug)]
enum Pacing {
    Unlimited,
    Fixed {
        interval: Duration,
        next_slot: Mutex<Option<Instant>>,
    },
    TokenBucket {
        capacity: f64,
        refill_per_sec: f64,
        bucket: Mutex<Bucket>,
    },
}

#[derive(Debug)]
pub struct RateLimiter {
    pacing: Pacing,
}

impl RateLimiter {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        match config.policy {
            RateLimitPolicy::None => Self::unlimited(),
            RateLimitPolicy::Fixed => Self::fixed(Duration::from_millis(config.min_interval_ms)),
            RateLimitPolicy::TokenBucket => {
                Self::token_bucket(config.capacity, config.refill_per_sec)
            }
        }
    }

    pub fn unlimited() -> Self {
        Self {
            pacing: Pacing::Unlimited,
        }
    }

    pub fn fixed(interval: Duration) -> Self {
        Self {
            pacing: Pacing::Fixed {
                interval,
                next_slot: Mutex::new(None),
            },
        }
    }

    pub fn token_bucket(capacity: u32, refill_per_sec: f64) -> Self {
        let capacity = f64::from(capacity.max(1));
        Self {
            pacing: Pacing::TokenBucket {
                capacity,
                refill_per_sec,
                bucket: Mutex::new(Bucket {
                    tokens: capacity,
                    last_refill: Instant::now(),
                }),
            },
        }
    }

    /// Block until the caller may send one request; returns the time waited
    pub fn acquire(&self) -> Duration {
        let wait = self.reserve(Instant::now());
        if !wait.is_zero() {
            tracing::trace!("Rate limited for {:?}", wait);
            std::thread::sleep(wait);
        }
        wait
    }

    /// Claim the next request slot and return how long to wait for it
    fn reserve(&self, now: Instant) -> Duration {
        match &self.pacing {
            Pacing::Unlimited => Duration::ZERO,
            Pacing::Fixed {
                interval,
                next_slot,
            } => {
                let mut next_slot = next_slot.lock().unwrap_or_else(|e| e.into_inner());
                let slot = match *next_slot {
                    Some(slot) if slot > now => slot,
                    _ => now,
                };
                *next_slot = Some(slot + *interval);
                slot - now
            }
            Pacing::TokenBucket {
                capacity,
                refill_per_sec,
                bucket,
            } => {
                let mut bucket = bucket.lock().unwrap_or_else(|e| e.into_inner());
                let elapsed = now.saturating_duration_since(bucket.last_refill);
                bucket.tokens = (bucket.tokens + elapsed.as_secs_f64() * refill_per_sec).min(*capacity);
                bucket.last_refill = now.max(bucket.last_refill);

                // Tokens may go negative: that debt is the queue of waiting callers
                bucket.tokens -= 1.0;
                if bucket.tokens >= 0.0 {
                    Duration::ZERO
                } else {
                    // Degenerate rates wait as long as a Duration allows
                    Duration::try_from_secs_f64(-bucket.tokens / refill_per_sec)
                        .unwrap_or(Duration::MAX)
                }
            }
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}
