use std::sync::atomic::Ordering;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::state::HealthState;

async fn healthz(State(state): State<HealthState>) -> impl IntoResponse {
    if state.liveness.load(Ordering::SeqCst) {
        (StatusCode::OK, Json(json!({ "status": "healthy" })))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "unhealthy" })))
    }
}

async fn readyz(State(state): State<HealthState>) -> impl IntoResponse {
    if state.readiness.load(Ordering::SeqCst) {
        (StatusCode::OK, Json(json!({ "status": "healthy" })))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "unhealthy" })))
    }
}

/// Not part of the core liveness/readiness surface, but the drop-counter/
/// latency snapshot should be reachable the same way operators reach
/// liveness and readiness — so it rides along on the same router rather
/// than standing up a second HTTP listener.
async fn metrics(State(state): State<HealthState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}

pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use camtrack_observability::Metrics;

    use super::*;

    fn test_state(live: bool, ready: bool) -> HealthState {
        HealthState::new(
            Arc::new(AtomicBool::new(live)),
            Arc::new(AtomicBool::new(ready)),
            Arc::new(Metrics::new()),
        )
    }

    #[tokio::test]
    async fn healthz_returns_200_when_live() {
        let app = router(test_state(true, false));
        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn healthz_returns_503_when_not_live() {
        let app = router(test_state(false, false));
        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn readyz_tracks_readiness_flag_independently_of_liveness() {
        let app = router(test_state(true, true));
        let response = app
            .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
