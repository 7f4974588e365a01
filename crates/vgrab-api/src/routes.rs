//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{create_job, download, get_job, health, inspect};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let api_routes = Router::new()
        .route("/inspect", post(inspect))
        .route("/jobs", post(create_job))
        .route("/jobs/:job_id", get(get_job))
        .route("/download", get(download));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use vgrab_models::FileMetadata;
    use vgrab_worker::{JobOrchestrator, WorkerConfig};

    use crate::config::ApiConfig;

    async fn test_state(dir: &TempDir) -> AppState {
        let worker = WorkerConfig {
            output_dir: dir.path().to_path_buf(),
            ytdlp_bin: "/nonexistent/yt-dlp".into(),
            whisper_bin: Some("/nonexistent/whisper".into()),
            job_ttl: Duration::ZERO,
            ..WorkerConfig::default()
        };
        let orchestrator = JobOrchestrator::new(worker).await.unwrap();
        AppState::with_orchestrator(ApiConfig::default(), orchestrator)
    }

    async fn app(dir: &TempDir) -> (Router, AppState) {
        let state = test_state(dir).await;
        (create_router(state.clone(), None), state)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = TempDir::new().unwrap();
        let (app, _) = app(&dir).await;

        let response = app.oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let dir = TempDir::new().unwrap();
        let (app, _) = app(&dir).await;

        let request = Request::builder()
            .uri("/health")
            .header("X-Request-ID", "req-42")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "req-42");
    }

    #[tokio::test]
    async fn test_inspect_normalizes() {
        let dir = TempDir::new().unwrap();
        let (app, _) = app(&dir).await;

        let response = app
            .oneshot(post_json(
                "/api/inspect",
                r#"{"url":"https://youtu.be/dQw4w9WgXcQ?utm_source=x"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(
            body,
            json!({
                "platform": "youtube",
                "normalizedUrl": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
                "isValid": true,
                "reason": null,
                "id": "dQw4w9WgXcQ"
            })
        );
    }

    #[tokio::test]
    async fn test_inspect_missing_url() {
        let dir = TempDir::new().unwrap();
        let (app, _) = app(&dir).await;

        let response = app.oneshot(post_json("/api/inspect", r#"{"url":42}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["platform"], "unknown");
        assert_eq!(body["normalizedUrl"], "");
        assert_eq!(body["isValid"], false);
        assert_eq!(body["reason"], "Missing or invalid 'url' field");
        assert_eq!(body["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_inspect_invalid_body() {
        let dir = TempDir::new().unwrap();
        let (app, _) = app(&dir).await;

        let response = app.oneshot(post_json("/api/inspect", "not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["reason"], "Invalid request body");
    }

    #[tokio::test]
    async fn test_create_job_requires_url() {
        let dir = TempDir::new().unwrap();
        let (app, state) = app(&dir).await;

        let response = app
            .oneshot(post_json("/api/jobs", r#"{"url":"  ","action":"download"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, json!({"detail": "URL is required"}));
        assert!(state.orchestrator.store().is_empty());
    }

    #[tokio::test]
    async fn test_create_job_rejects_unknown_action() {
        let dir = TempDir::new().unwrap();
        let (app, state) = app(&dir).await;

        let response = app
            .oneshot(post_json("/api/jobs", r#"{"url":"https://x.com/a/status/1","action":"clip"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(state.orchestrator.store().is_empty());
    }

    #[tokio::test]
    async fn test_create_job_rejects_invalid_url() {
        let dir = TempDir::new().unwrap();
        let (app, state) = app(&dir).await;

        for body in [
            r#"{"url":"not a url","action":"download"}"#,
            r#"{"url":"--exec=touch /tmp/x","action":"download"}"#,
            r#"{"url":"javascript:alert(1)","action":"download"}"#,
        ] {
            let response = app.clone().oneshot(post_json("/api/jobs", body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", body);
            assert!(json_body(response).await["detail"].is_string());
        }
        assert!(state.orchestrator.store().is_empty());
    }

    #[tokio::test]
    async fn test_create_and_poll_job() {
        let dir = TempDir::new().unwrap();
        let (app, _) = app(&dir).await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/jobs",
                r#"{"url":"https://youtu.be/dQw4w9WgXcQ","action":"audio"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let job_id = json_body(response).await["jobId"].as_str().unwrap().to_string();
        assert!(job_id.starts_with("job_"));

        let response = app
            .oneshot(get_request(&format!("/api/jobs/{}", job_id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["jobId"], job_id.as_str());
        assert_eq!(body["action"], "extract_audio");
        assert_eq!(body["url"], "https://youtu.be/dQw4w9WgXcQ");
    }

    #[tokio::test]
    async fn test_unknown_job_is_404() {
        let dir = TempDir::new().unwrap();
        let (app, _) = app(&dir).await;

        let response = app.oneshot(get_request("/api/jobs/job_missing")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await, json!({"detail": "Job not found"}));
    }

    #[tokio::test]
    async fn test_download_requires_file_id() {
        let dir = TempDir::new().unwrap();
        let (app, _) = app(&dir).await;

        let response = app.oneshot(get_request("/api/download")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, json!({"detail": "Missing fileId"}));
    }

    #[tokio::test]
    async fn test_download_unknown_file_is_404() {
        let dir = TempDir::new().unwrap();
        let (app, _) = app(&dir).await;

        let response = app.oneshot(get_request("/api/download?fileId=nope.mp4")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_download_streams_registered_file() {
        let dir = TempDir::new().unwrap();
        let (app, state) = app(&dir).await;

        std::fs::write(dir.path().join("abc.mp3"), b"ID3 audio bytes").unwrap();
        state
            .orchestrator
            .registry()
            .register(FileMetadata::new("abc.mp3", "audio/mpeg", 15))
            .await
            .unwrap();

        let response = app.oneshot(get_request("/api/download?fileId=abc.mp3")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "audio/mpeg");
        assert_eq!(headers[header::CONTENT_LENGTH], "15");
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"abc.mp3\""
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ID3 audio bytes");
    }

    #[tokio::test]
    async fn test_download_file_removed_from_disk_is_404() {
        let dir = TempDir::new().unwrap();
        let (app, state) = app(&dir).await;

        state
            .orchestrator
            .registry()
            .register(FileMetadata::new("gone.mp4", "video/mp4", 100))
            .await
            .unwrap();

        let response = app.oneshot(get_request("/api/download?fileId=gone.mp4")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let dir = TempDir::new().unwrap();
        let state = AppState::with_orchestrator(
            ApiConfig {
                max_body_size: 16,
                ..ApiConfig::default()
            },
            test_state(&dir).await.orchestrator,
        );
        let app = create_router(state, None);

        let body = format!(r#"{{"url":"https://youtu.be/{}"}}"#, "a".repeat(64));
        let mut request = post_json("/api/inspect", &body);
        request
            .headers_mut()
            .insert(header::CONTENT_LENGTH, body.len().into());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
