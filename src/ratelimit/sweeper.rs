//! Optional background sweep of idle clients.
//!
//! Eviction inside [`RateLimiter::classify`](super::RateLimiter::classify) is
//! lazy, so a client that stops sending requests keeps its log forever. The
//! sweeper periodically drops clients whose log is empty after cleanup,
//! bounding memory to the clients active within roughly one window.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::RateLimiter;

/// Spawn a task that sweeps `limiter` every `interval`.
///
/// The task runs until the returned handle is aborted or the runtime shuts
/// down. Must be called from within a tokio runtime.
pub fn spawn_sweeper(limiter: Arc<RateLimiter>, interval: Duration) -> JoinHandle<()> {
    info!(
        interval_secs = interval.as_secs_f64(),
        "Starting idle client sweeper"
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let removed = limiter.sweep_expired();
            debug!(
                removed = removed,
                remaining_clients = limiter.client_count(),
                "Swept idle clients"
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::{ClientKey, Clock, LimiterConfig, ManualClock};

    #[tokio::test]
    async fn test_sweeper_removes_idle_clients() {
        let clock = Arc::new(ManualClock::default());
        let config = LimiterConfig::new(5, 60).unwrap();
        let limiter = Arc::new(RateLimiter::with_clock(config, clock.clone()));

        limiter.check(&ClientKey::from("idle"));
        assert_eq!(limiter.client_count(), 1);

        let handle = spawn_sweeper(limiter.clone(), Duration::from_millis(10));

        clock.advance(Duration::from_secs(61));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(limiter.client_count(), 0);
        handle.abort();
    }

    #[tokio::test]
    async fn test_sweeper_keeps_active_clients() {
        let clock = Arc::new(ManualClock::default());
        let config = LimiterConfig::new(5, 60).unwrap();
        let limiter = Arc::new(RateLimiter::with_clock(config, clock.clone()));

        let handle = spawn_sweeper(limiter.clone(), Duration::from_millis(10));

        let key = ClientKey::from("active");
        limiter.check(&key);
        clock.advance(Duration::from_secs(30));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(limiter.client_count(), 1);
        assert_eq!(limiter.status(&key, clock.now()).remaining, 4);
        handle.abort();
    }
}
