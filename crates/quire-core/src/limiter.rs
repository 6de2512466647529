//! Per-provider call spacing
//!
//! [`RateLimiter`] enforces a minimum interval between calls. The
//! [`LimiterRegistry`] hands out one shared limiter per `(provider, phase)`
//! pair, created on first use and reused afterwards.

use crate::config::PipelineConfig;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Minimum-interval limiter
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create limiter with the given spacing
    #[inline]
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    /// Configured spacing
    #[inline]
    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Time left before the next call is allowed
    #[must_use]
    pub fn wait_time(&self) -> Duration {
        self.wait_at(Instant::now())
    }

    /// Claim a slot if one is free right now
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last.lock();
        if remaining(*last, self.min_interval, now).is_zero() {
            *last = Some(now);
            true
        } else {
            false
        }
    }

    /// Claim a slot, sleeping until one is free
    ///
    /// Returns how long the caller waited.
    pub fn acquire(&self) -> Duration {
        let mut waited = Duration::ZERO;
        loop {
            let wait = {
                let now = Instant::now();
                let mut last = self.last.lock();
                let wait = remaining(*last, self.min_interval, now);
                if wait.is_zero() {
                    *last = Some(now);
                    return waited;
                }
                wait
            };
            std::thread::sleep(wait);
            waited += wait;
        }
    }

    fn wait_at(&self, now: Instant) -> Duration {
        remaining(*self.last.lock(), self.min_interval, now)
    }
}

fn remaining(last: Option<Instant>, min_interval: Duration, now: Instant) -> Duration {
    last.map_or(Duration::ZERO, |at| {
        min_interval.saturating_sub(now.saturating_duration_since(at))
    })
}

/// Lazily populated cache of limiters keyed by `(provider, phase)`
#[derive(Debug, Default)]
pub struct LimiterRegistry {
    limiters: DashMap<(String, String), Arc<RateLimiter>>,
    intervals: BTreeMap<String, Duration>,
    default_interval: Duration,
}

impl LimiterRegistry {
    /// Create registry where every provider is unlimited
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create registry from configured provider limits
    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        config
            .rate_limits
            .iter()
            .fold(Self::new(), |registry, (provider, limit)| {
                registry.with_interval(provider.clone(), limit.min_interval())
            })
    }

    /// Set spacing for a provider's future limiters
    #[must_use]
    pub fn with_interval(mut self, provider: impl Into<String>, interval: Duration) -> Self {
        self.intervals.insert(provider.into(), interval);
        self
    }

    /// Set spacing for providers without their own entry
    #[must_use]
    pub fn with_default_interval(mut self, interval: Duration) -> Self {
        self.default_interval = interval;
        self
    }

    /// Limiter for a provider and phase
    ///
    /// The same pair always yields the same shared instance.
    #[must_use]
    pub fn get(&self, provider: &str, phase: &str) -> Arc<RateLimiter> {
        let key = (provider.to_string(), phase.to_string());
        self.limiters
            .entry(key)
            .or_insert_with(|| {
                let interval = self
                    .intervals
                    .get(provider)
                    .copied()
                    .unwrap_or(self.default_interval);
                tracing::debug!(provider, phase, ?interval, "rate limiter created");
                Arc::new(RateLimiter::new(interval))
            })
            .clone()
    }

    /// Number of limiters created so far
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    /// Check if no limiter has been created
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }
}
