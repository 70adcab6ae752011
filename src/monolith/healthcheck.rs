//! Routes owned by the container itself: healthcheck and debug endpoints

use super::mux::RouteDefinition;
use super::Result;
use crate::common::{ApiResponse, StatusCode};
use crate::config::Environment;
use axum::Json;
use axum::extract::State;
use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Serialize)]
pub struct HealthCheckMessage {
    pub status: &'static str,
    pub environment: Environment,
}

#[derive(Debug, Serialize)]
pub struct DebugIndex {
    pub uptime_secs: u64,
    pub pid: u32,
    pub workers: usize,
    pub profiles: [&'static str; 2],
}

#[derive(Clone)]
struct HealthState {
    environment: Environment,
    started_at: Instant,
}

async fn healthcheck(State(state): State<HealthState>) -> Json<HealthCheckMessage> {
    Json(HealthCheckMessage {
        status: "available",
        environment: state.environment,
    })
}

async fn debug_index(State(state): State<HealthState>) -> ApiResponse<DebugIndex> {
    ApiResponse::success(DebugIndex {
        uptime_secs: state.started_at.elapsed().as_secs(),
        pid: std::process::id(),
        workers: tokio::runtime::Handle::current().metrics().num_workers(),
        profiles: ["profile", "heap"],
    })
}

async fn profile_unavailable() -> ApiResponse<()> {
    ApiResponse::error(
        StatusCode::NotImplemented,
        "profiling is not available in this build",
    )
}

/// Healthcheck plus the `/debug/pprof` family
pub(crate) fn routes(environment: Environment, started_at: Instant) -> Result<Vec<RouteDefinition>> {
    let state = HealthState {
        environment,
        started_at,
    };

    Ok(vec![
        RouteDefinition::new("GET /api/v1/healthcheck", healthcheck, state.clone())?,
        RouteDefinition::new("GET /debug/pprof/", debug_index, state)?,
        RouteDefinition::stateless("GET /debug/pprof/profile", profile_unavailable)?,
        RouteDefinition::stateless("GET /debug/pprof/heap", profile_unavailable)?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monolith::Mux;
    use axum::body::Body;
    use axum::http::{Request, StatusCode as HttpStatusCode};
    use tower::ServiceExt;

    async fn get(router: axum::Router, path: &str) -> (HttpStatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn router() -> axum::Router {
        let mux = Mux::new();
        mux.handle_all(
            "monolith",
            routes(Environment::Testing, Instant::now()).unwrap(),
        )
        .unwrap();
        mux.seal().unwrap()
    }

    #[tokio::test]
    async fn test_healthcheck_reports_environment() {
        let (status, body) = get(router(), "/api/v1/healthcheck").await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(
            body,
            serde_json::json!({"status": "available", "environment": "testing"})
        );
    }

    #[tokio::test]
    async fn test_debug_routes() {
        let (status, body) = get(router(), "/debug/pprof/").await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(body["data"]["pid"], std::process::id());

        let (status, _) = get(router(), "/debug/pprof/heap").await;
        assert_eq!(status, HttpStatusCode::NOT_IMPLEMENTED);
    }
}
