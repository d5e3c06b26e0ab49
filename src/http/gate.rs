//! Rate limiting middleware for axum.
//!
//! Every request passing through the gate is attributed to a [`ClientKey`]
//! and checked against the shared [`RateLimiter`]. Rejected requests get a
//! `429 Too Many Requests` with a JSON body and `Retry-After`; admitted
//! requests carry informational headers:
//! - `X-RateLimit-Limit`: maximum requests allowed in the window
//! - `X-RateLimit-Remaining`: requests remaining in the current window
//! - `X-RateLimit-Window`: window length in seconds
//!
//! ```ignore
//! let app = slidegate::http::protect(Router::new().route("/api/v1/tags", get(list_tags)), limiter);
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::Serialize;
use tracing::{info, trace};

use crate::ratelimit::{ClientKey, RateLimiter, FORWARDED_FOR_HEADER};

/// Machine-readable reason in the rejection body.
pub const RATE_LIMIT_EXCEEDED: &str = "Rate limit exceeded";

/// Standard rate limit header names.
pub mod headers {
    use super::HeaderName;

    /// Maximum requests allowed in the window.
    pub static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
    /// Requests remaining in the current window.
    pub static X_RATELIMIT_REMAINING: HeaderName =
        HeaderName::from_static("x-ratelimit-remaining");
    /// Window length in seconds.
    pub static X_RATELIMIT_WINDOW: HeaderName = HeaderName::from_static("x-ratelimit-window");
}

/// Wrap `routes` so every request is checked against `limiter` first.
///
/// Uses `route_layer`, so unmatched paths still 404 without spending quota.
pub fn protect<S>(routes: Router<S>, limiter: Arc<RateLimiter>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    routes.route_layer(middleware::from_fn_with_state(
        limiter,
        rate_limit_middleware,
    ))
}

/// Middleware that admits or rejects a request.
///
/// On admission the derived [`ClientKey`] is inserted into the request
/// extensions for downstream handlers.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    mut request: Request,
    next: Next,
) -> Response {
    let key = client_key(request.headers(), connect_info.as_ref());
    let decision = limiter.check(&key);

    if !decision.allowed {
        info!(
            client = %key,
            path = %request.uri().path(),
            retry_after = decision.reset_seconds,
            "Rate limit exceeded"
        );
        return RateLimitRejection::new(decision.reset_seconds).into_response();
    }

    trace!(client = %key, remaining = decision.remaining, "Request admitted");

    request.extensions_mut().insert(key);
    let mut response = next.run(request).await;

    let response_headers = response.headers_mut();
    response_headers.insert(
        headers::X_RATELIMIT_LIMIT.clone(),
        HeaderValue::from(limiter.config().max_requests()),
    );
    response_headers.insert(
        headers::X_RATELIMIT_REMAINING.clone(),
        HeaderValue::from(decision.remaining),
    );
    response_headers.insert(
        headers::X_RATELIMIT_WINDOW.clone(),
        HeaderValue::from(limiter.config().window_seconds()),
    );

    response
}

/// Derive the client key from request headers and the peer address.
pub fn client_key(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> ClientKey {
    let forwarded_for = headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|value| value.to_str().ok());

    ClientKey::from_request_parts(forwarded_for, connect_info.map(|ci| ci.0.ip()))
}

/// The 429 response produced for a rejected request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitRejection {
    pub error: &'static str,
    pub message: String,
    pub retry_after: u64,
}

impl RateLimitRejection {
    pub fn new(retry_after: u64) -> Self {
        Self {
            error: RATE_LIMIT_EXCEEDED,
            message: format!("Too many requests. Please wait {} seconds.", retry_after),
            retry_after,
        }
    }
}

impl IntoResponse for RateLimitRejection {
    fn into_response(self) -> Response {
        let retry_after = HeaderValue::from(self.retry_after);
        (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry_after)],
            Json(self),
        )
            .into_response()
    }
}
