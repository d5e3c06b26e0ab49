//! Per-client log of accepted request times.

use std::collections::VecDeque;
use std::time::Duration;

/// Timestamps of the requests a client had accepted inside the window.
///
/// Entries are appended in arrival order and only ever removed by
/// [`evict_expired`](Self::evict_expired).
#[derive(Debug, Default)]
pub struct RequestLog {
    timestamps: VecDeque<Duration>,
}

impl RequestLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry `t` with `now - t >= window`.
    ///
    /// Returns the number of entries removed. Entries stamped after `now`
    /// count as zero seconds old and are kept.
    pub fn evict_expired(&mut self, now: Duration, window: Duration) -> usize {
        let before = self.timestamps.len();
        self.timestamps
            .retain(|&t| now.saturating_sub(t) < window);
        before - self.timestamps.len()
    }

    /// Count entries still inside the window without removing anything.
    pub fn count_within(&self, now: Duration, window: Duration) -> usize {
        self.timestamps
            .iter()
            .filter(|&&t| now.saturating_sub(t) < window)
            .count()
    }

    /// Record an accepted request.
    pub fn record(&mut self, now: Duration) {
        self.timestamps.push_back(now);
    }

    /// Earliest recorded timestamp.
    pub fn oldest(&self) -> Option<Duration> {
        self.timestamps.iter().min().copied()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}
