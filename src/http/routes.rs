//! Routes served by the Slidegate binary.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, routing::get, Extension, Json, Router};
use serde::Serialize;

use super::gate::protect;
use crate::ratelimit::{ClientKey, RateLimiter};

/// Quota report for the calling client.
#[derive(Debug, Serialize)]
pub struct QuotaResponse {
    pub client: String,
    pub limit: u64,
    pub remaining: u64,
    pub window_seconds: u64,
}

/// Build the application router.
///
/// `/health` is never rate limited; everything under `/api/v1` goes through
/// the gate.
pub fn router(limiter: Arc<RateLimiter>) -> Router {
    let api = Router::new().route("/api/v1/rate-limit", get(rate_limit_status));

    Router::new()
        .route("/health", get(health_handler))
        .merge(protect(api, limiter.clone()))
        .with_state(limiter)
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Report the caller's quota after the gate has counted this request.
async fn rate_limit_status(
    State(limiter): State<Arc<RateLimiter>>,
    Extension(key): Extension<ClientKey>,
) -> Json<QuotaResponse> {
    let status = limiter.status(&key, limiter.now());

    Json(QuotaResponse {
        client: key.to_string(),
        limit: status.limit,
        remaining: status.remaining,
        window_seconds: status.window_seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::{LimiterConfig, ManualClock};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        response::Response,
    };
    use tower::ServiceExt;

    fn test_router(max_requests: u64) -> (Router, Arc<RateLimiter>) {
        let config = LimiterConfig::new(max_requests, 60).unwrap();
        let limiter = Arc::new(RateLimiter::with_clock(config, Arc::new(ManualClock::default())));
        (router(limiter.clone()), limiter)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("X-Forwarded-For", "198.51.100.20")
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_not_rate_limited() {
        let (app, limiter) = test_router(1);

        for _ in 0..3 {
            let response = app.clone().oneshot(get_request("/health")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(json_body(response).await["status"], "healthy");
        }
        assert_eq!(limiter.client_count(), 0);
    }

    #[tokio::test]
    async fn test_quota_route_reports_remaining() {
        let (app, _) = test_router(3);

        let response = app.clone().oneshot(get_request("/api/v1/rate-limit")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["client"], "198.51.100.20");
        assert_eq!(body["limit"], 3);
        assert_eq!(body["remaining"], 2);
        assert_eq!(body["window_seconds"], 60);

        let body = json_body(app.oneshot(get_request("/api/v1/rate-limit")).await.unwrap()).await;
        assert_eq!(body["remaining"], 1);
    }

    #[tokio::test]
    async fn test_quota_route_is_gated() {
        let (app, _) = test_router(1);

        let first = app.clone().oneshot(get_request("/api/v1/rate-limit")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app.oneshot(get_request("/api/v1/rate-limit")).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(json_body(second).await["error"], "Rate limit exceeded");
    }
}
