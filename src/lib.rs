//! Slidegate - Sliding-Window Request Rate Limiting
//!
//! This crate implements an in-process sliding-window rate limiter that
//! gates the HTTP endpoints of a multi-tenant API. Each client is tracked
//! by the timestamps of its recently accepted requests; expired entries are
//! evicted lazily on access, and rejected callers are told how long to wait.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
