//! Rate limiting logic and state management.

mod client;
mod clock;
mod limiter;
mod sweeper;
mod window;

pub use client::{ClientKey, FORWARDED_FOR_HEADER, UNKNOWN_CLIENT};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use limiter::{
    Decision, LimiterConfig, QuotaStatus, RateLimiter, DEFAULT_MAX_REQUESTS,
    DEFAULT_WINDOW_SECONDS,
};
pub use sweeper::spawn_sweeper;
pub use window::RequestLog;
