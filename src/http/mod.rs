//! HTTP boundary: the rate limiting gate and the server that hosts it.

mod gate;
mod routes;
mod server;

pub use gate::{
    client_key, headers, protect, rate_limit_middleware, RateLimitRejection,
    RATE_LIMIT_EXCEEDED,
};
pub use routes::{router, QuotaResponse};
pub use server::HttpServer;
