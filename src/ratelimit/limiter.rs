//! Core sliding-window rate limiter.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::client::ClientKey;
use super::clock::{Clock, MonotonicClock};
use super::window::RequestLog;
use crate::config::RateLimitingConfig;
use crate::error::{Result, SlidegateError};

/// Default number of requests allowed per window.
pub const DEFAULT_MAX_REQUESTS: u64 = 100;
/// Default window length in seconds.
pub const DEFAULT_WINDOW_SECONDS: u64 = 60;

/// Validated, immutable limiter parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterConfig {
    max_requests: u64,
    window_seconds: u64,
}

impl LimiterConfig {
    /// Build a configuration; both values must be positive.
    pub fn new(max_requests: u64, window_seconds: u64) -> Result<Self> {
        if max_requests == 0 {
            return Err(SlidegateError::Config(
                "max_requests must be a positive integer".to_string(),
            ));
        }
        if window_seconds == 0 {
            return Err(SlidegateError::Config(
                "window_seconds must be a positive integer".to_string(),
            ));
        }
        Ok(Self {
            max_requests,
            window_seconds,
        })
    }

    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    pub fn window_seconds(&self) -> u64 {
        self.window_seconds
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window_seconds: DEFAULT_WINDOW_SECONDS,
        }
    }
}

impl TryFrom<&RateLimitingConfig> for LimiterConfig {
    type Error = SlidegateError;

    fn try_from(settings: &RateLimitingConfig) -> Result<Self> {
        Self::new(settings.max_requests, settings.window_seconds)
    }
}

/// Outcome of an admission query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Requests left in the window after this one (0 on rejection)
    pub remaining: u64,
    /// Seconds until the client should retry on rejection; the full window
    /// length on acceptance
    pub reset_seconds: u64,
}

/// Read-only view of a client's quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaStatus {
    pub limit: u64,
    pub remaining: u64,
    pub window_seconds: u64,
    /// Requests currently counted against the client
    pub in_window: u64,
}

/// The core rate limiter that tracks recent requests per client.
///
/// This struct is thread-safe and meant to be shared behind an `Arc`.
/// Each client's log sits behind its own mutex inside a sharded map, so
/// queries for one client are serialized while different clients proceed
/// in parallel.
pub struct RateLimiter {
    config: LimiterConfig,
    clock: Arc<dyn Clock>,
    /// Request logs indexed by client key
    logs: DashMap<ClientKey, Mutex<RequestLog>>,
}

impl RateLimiter {
    /// Create a limiter on the monotonic clock.
    ///
    /// Fails with a configuration error when either value is zero.
    pub fn new(max_requests: u64, window_seconds: u64) -> Result<Self> {
        let config = LimiterConfig::new(max_requests, window_seconds)?;
        Ok(Self::with_clock(config, Arc::new(MonotonicClock::new())))
    }

    /// Create a limiter with an explicit time source.
    pub fn with_clock(config: LimiterConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            logs: DashMap::new(),
        }
    }

    /// Create a limiter from loaded settings, validating them.
    pub fn from_settings(settings: &RateLimitingConfig) -> Result<Self> {
        let config = LimiterConfig::try_from(settings)?;
        Ok(Self::with_clock(config, Arc::new(MonotonicClock::new())))
    }

    /// Decide whether a request from `key` arriving at `now` is admitted.
    ///
    /// Expired entries for the key are evicted first. An accepted request
    /// is recorded; a rejected one is not.
    pub fn classify(&self, key: &ClientKey, now: Duration) -> Decision {
        let window = self.config.window();
        let max_requests = self.config.max_requests;

        // Holding the shard guard in shared mode keeps `sweep` from removing
        // the slot while we mutate it.
        let slot = match self.logs.get(key) {
            Some(slot) => slot,
            None => {
                debug!(key = %key, "Creating new request log");
                self.logs.entry(key.clone()).or_default().downgrade()
            }
        };
        let mut log = slot.lock();

        let evicted = log.evict_expired(now, window);
        let count = log.len() as u64;

        trace!(
            key = %key,
            count = count,
            evicted = evicted,
            "Checking rate limit"
        );

        if count >= max_requests {
            let reset_seconds = log
                .oldest()
                .map_or(0, |oldest| (oldest + window).saturating_sub(now).as_secs());

            debug!(
                key = %key,
                reset_seconds = reset_seconds,
                "Rate limit exceeded"
            );

            return Decision {
                allowed: false,
                remaining: 0,
                reset_seconds,
            };
        }

        log.record(now);
        Decision {
            allowed: true,
            remaining: max_requests - log.len() as u64,
            reset_seconds: self.config.window_seconds,
        }
    }

    /// [`classify`](Self::classify) at the limiter clock's current time.
    pub fn check(&self, key: &ClientKey) -> Decision {
        self.classify(key, self.clock.now())
    }

    /// Report a client's quota at `now` without recording a request.
    pub fn status(&self, key: &ClientKey, now: Duration) -> QuotaStatus {
        let in_window = self
            .logs
            .get(key)
            .map_or(0, |slot| slot.lock().count_within(now, self.config.window()))
            as u64;

        QuotaStatus {
            limit: self.config.max_requests,
            remaining: self.config.max_requests.saturating_sub(in_window),
            window_seconds: self.config.window_seconds,
            in_window,
        }
    }

    /// Forget a client's history, restoring its full quota.
    ///
    /// Returns `true` if the client was known.
    pub fn reset(&self, key: &ClientKey) -> bool {
        self.logs.remove(key).is_some()
    }

    /// Evict expired entries for every client and drop clients left with an
    /// empty log. Returns the number of clients removed.
    ///
    /// A removed client behaves exactly like one never seen, so this never
    /// changes an admission outcome.
    pub fn sweep(&self, now: Duration) -> usize {
        let window = self.config.window();
        let before = self.logs.len();

        self.logs.retain(|_, slot| {
            let log = slot.get_mut();
            log.evict_expired(now, window);
            !log.is_empty()
        });

        before.saturating_sub(self.logs.len())
    }

    /// [`sweep`](Self::sweep) at the limiter clock's current time.
    pub fn sweep_expired(&self) -> usize {
        self.sweep(self.clock.now())
    }

    /// Get the number of tracked clients.
    pub fn client_count(&self) -> usize {
        self.logs.len()
    }

    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    /// Current time on the limiter's clock.
    pub fn now(&self) -> Duration {
        self.clock.now()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::with_clock(LimiterConfig::default(), Arc::new(MonotonicClock::new()))
    }
}
