//! HTTP server.
//!
//! Exposes the aggregation endpoint and its informational routes:
//! - `GET /` liveness message
//! - `GET /api/latency` usage hint
//! - `POST /api/latency` per-region statistics
//! - `OPTIONS /api/latency` CORS preflight, answered by the CORS layer

use crate::analysis;
use crate::config::{Config, CorsConfig, CorsMode};
use crate::dataset::Dataset;
use crate::models::{LatencyQuery, LatencyReport, MessageResponse};
use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, Method},
    routing::get,
};
use tower_http::cors::{AllowHeaders, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

const LIVENESS_MESSAGE: &str = "Latency API running";
const USAGE_MESSAGE: &str =
    "This endpoint accepts POST requests with JSON body {\"regions\": [...], \"threshold_ms\": N}";

/// Shared state handed to every request.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Telemetry loaded at startup.
    pub dataset: Dataset,
}

impl AppState {
    pub fn new(dataset: Dataset) -> Self {
        Self { dataset }
    }
}

/// Create the HTTP router.
pub fn create_router(state: AppState, cors: &CorsConfig) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/api/latency", get(latency_info).post(latency))
        .with_state(state)
        .layer(cors_layer(cors))
        .layer(TraceLayer::new_for_http())
}

/// Build the CORS layer for the configured policy.
///
/// Credentials cannot be combined with a wildcard origin, so credentialed
/// mode either restricts origins to the configured list or echoes the
/// request origin.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    match config.mode {
        CorsMode::Wildcard => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any),
        CorsMode::Credentialed => {
            let origin = if config.allowed_origins.is_empty() {
                AllowOrigin::mirror_request()
            } else {
                AllowOrigin::list(
                    config
                        .allowed_origins
                        .iter()
                        .filter_map(|o| HeaderValue::from_str(o).ok()),
                )
            };

            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(methods)
                .allow_headers(AllowHeaders::mirror_request())
                .allow_credentials(true)
        }
    }
}

async fn home() -> Json<MessageResponse> {
    Json(MessageResponse::new(LIVENESS_MESSAGE))
}

async fn latency_info() -> Json<MessageResponse> {
    Json(MessageResponse::new(USAGE_MESSAGE))
}

async fn latency(
    State(state): State<AppState>,
    Json(query): Json<LatencyQuery>,
) -> Json<LatencyReport> {
    debug!(
        regions = ?query.regions,
        threshold_ms = query.threshold_ms,
        "Aggregating latency"
    );

    let report = analysis::compute(&state.dataset, &query.regions, query.threshold_ms);
    Json(report)
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(config: &Config, dataset: Dataset) -> Result<()> {
    let addr = config.server.socket_addr()?;
    let app = create_router(AppState::new(dataset), &config.cors);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(
        "Latency API listening on http://{} (CORS: {:?})",
        listener.local_addr()?,
        config.cors.mode
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to listen for Ctrl-C, running until killed: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RegionStats, TelemetryRecord};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use tower::ServiceExt;

    fn test_router(cors: CorsConfig) -> Router {
        let dataset = Dataset::from_records(vec![
            TelemetryRecord::new("apac", 100.0, 99.9),
            TelemetryRecord::new("apac", 200.0, 99.8),
            TelemetryRecord::new("apac", 300.0, 99.5),
            TelemetryRecord::new("emea", 140.0, 98.4),
            TelemetryRecord::new("emea", 160.0, 99.0),
        ]);
        create_router(AppState::new(dataset), &cors)
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/latency")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ORIGIN, "https://app.example.com")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn header_str<'a>(response: &'a Response, name: header::HeaderName) -> Option<&'a str> {
        response.headers().get(name).and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn test_home() {
        let response = test_router(CorsConfig::default())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: MessageResponse = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body.message, LIVENESS_MESSAGE);
    }

    #[tokio::test]
    async fn test_usage_hint() {
        let response = test_router(CorsConfig::default())
            .oneshot(Request::get("/api/latency").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("threshold_ms"));
    }

    #[tokio::test]
    async fn test_post_aggregates_regions() {
        let response = test_router(CorsConfig::default())
            .oneshot(post_json(
                r#"{"regions": ["emea", "nowhere", "apac"], "threshold_ms": 150}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let report: indexmap::IndexMap<String, RegionStats> =
            serde_json::from_str(&body_string(response).await).unwrap();

        let keys: Vec<&str> = report.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["emea", "apac"]);

        let apac = &report["apac"];
        assert_eq!(apac.avg_latency, 200.0);
        assert_eq!(apac.p95_latency, 290.0);
        assert_eq!(apac.avg_uptime, 99.733);
        assert_eq!(apac.breaches, 2);

        assert_eq!(report["emea"].breaches, 1);
    }

    #[tokio::test]
    async fn test_post_defaults() {
        let response = test_router(CorsConfig::default())
            .oneshot(post_json("{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "{}");

        let response = test_router(CorsConfig::default())
            .oneshot(post_json(r#"{"regions": ["emea"]}"#))
            .await
            .unwrap();
        let report: LatencyReport = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(report["emea"].breaches, 2);
    }

    #[tokio::test]
    async fn test_post_rejects_malformed_body() {
        let response = test_router(CorsConfig::default())
            .oneshot(post_json(r#"{"regions": ["apac""#))
            .await
            .unwrap();
        assert!(response.status().is_client_error());

        let response = test_router(CorsConfig::default())
            .oneshot(post_json(r#"{"regions": ["apac"], "threshold_ms": "high"}"#))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_wildcard_cors_headers() {
        let response = test_router(CorsConfig::default())
            .oneshot(post_json(r#"{"regions": ["apac"]}"#))
            .await
            .unwrap();

        assert_eq!(
            header_str(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some("*")
        );
        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_preflight() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/latency")
            .header(header::ORIGIN, "https://app.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();

        let response = test_router(CorsConfig::default())
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            header_str(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some("*")
        );
        let methods = header_str(&response, header::ACCESS_CONTROL_ALLOW_METHODS).unwrap();
        assert!(methods.contains("POST"));
        assert!(methods.contains("OPTIONS"));
        assert_eq!(
            header_str(&response, header::ACCESS_CONTROL_ALLOW_HEADERS),
            Some("*")
        );
        assert!(body_string(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_credentialed_preflight_mirrors_request() {
        let cors = CorsConfig {
            mode: CorsMode::Credentialed,
            allowed_origins: Vec::new(),
        };
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/latency")
            .header(header::ORIGIN, "https://app.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();

        let response = test_router(cors).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            header_str(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some("https://app.example.com")
        );
        assert_eq!(
            header_str(&response, header::ACCESS_CONTROL_ALLOW_CREDENTIALS),
            Some("true")
        );
        assert_eq!(
            header_str(&response, header::ACCESS_CONTROL_ALLOW_HEADERS),
            Some("content-type")
        );
        let methods = header_str(&response, header::ACCESS_CONTROL_ALLOW_METHODS).unwrap();
        assert!(methods.contains("POST"));
        assert!(body_string(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_credentialed_cors_mirrors_origin() {
        let cors = CorsConfig {
            mode: CorsMode::Credentialed,
            allowed_origins: Vec::new(),
        };
        let response = test_router(cors)
            .oneshot(post_json(r#"{"regions": ["apac"]}"#))
            .await
            .unwrap();

        assert_eq!(
            header_str(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some("https://app.example.com")
        );
        assert_eq!(
            header_str(&response, header::ACCESS_CONTROL_ALLOW_CREDENTIALS),
            Some("true")
        );
    }

    #[tokio::test]
    async fn test_credentialed_cors_restricts_origins() {
        let cors = CorsConfig {
            mode: CorsMode::Credentialed,
            allowed_origins: vec!["https://dashboard.example.com".to_string()],
        };
        let response = test_router(cors)
            .oneshot(post_json(r#"{"regions": ["apac"]}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }
}
