//! Router assembly: HTTP endpoints, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{warn, Level};

use crate::protocol::UPLOAD_BODY_LIMIT;
use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - API under `/api/...` (analysis, generation, OCR, health)
/// - Static SPA from `./static` with index fallback
/// - CORS restricted to the configured origins
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    let cors = cors_layer(&state.settings.cors_origins);

    Router::new()
        .route("/", get(http::http_root))
        .route("/api/health", get(http::http_health))
        .route("/api/analysis/analyze", post(http::http_post_analyze))
        .route("/api/generate/problem", post(http::http_post_generate))
        .route(
            "/api/ocr/upload",
            post(http::http_post_ocr).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(cors),
        )
        // Frontend fallback
        .fallback_service(static_service)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(target: "parsey_backend", origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::{Prompts, Settings};
    use crate::domain::ToeicPart;
    use crate::protocol::GenerateOut;

    fn app() -> Router {
        let state = AppState::from_parts(Settings::default(), Prompts::default());
        build_router(Arc::new(state))
    }

    async fn post_json(path: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(req).await
    }

    #[tokio::test]
    async fn generate_returns_requested_count() {
        let (status, body) = post_json(
            "/api/generate/problem",
            serde_json::json!({ "text": "Go now.", "count": 5 }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let out: GenerateOut = serde_json::from_value(body).unwrap();
        assert!(out.success);
        assert_eq!(out.problems.len(), 5);
        assert_eq!(out.detected_part, ToeicPart::Part5);
    }

    #[tokio::test]
    async fn generate_rejects_count_above_five() {
        let (status, body) = post_json(
            "/api/generate/problem",
            serde_json::json!({ "text": "Go now.", "count": 6 }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Count must be between 1 and 5");
    }

    #[tokio::test]
    async fn analyze_rejects_empty_text() {
        let (status, body) = post_json("/api/analysis/analyze", serde_json::json!({ "text": "   " })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Text cannot be empty");
    }

    #[tokio::test]
    async fn analyze_reports_part() {
        let (status, body) = post_json(
            "/api/analysis/analyze",
            serde_json::json!({ "text": "Go now.", "include_grammar": false }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["toeic_part"], 5);
        assert!(body["grammar_elements"].is_null());
    }

    fn multipart_request(field: &str, content_type: &str, payload: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--XB\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"scan.png\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(payload);
        body.extend_from_slice(b"\r\n--XB--\r\n");
        Request::builder()
            .method("POST")
            .uri("/api/ocr/upload")
            .header("content-type", "multipart/form-data; boundary=XB")
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let res = app().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn ocr_upload_without_key_is_simulated() {
        let (status, body) = send(multipart_request("file", "image/png", b"\x89PNG fake")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["text"], crate::ocr::SIMULATED_TEXT);
        assert_eq!(body["language"], "en");
    }

    #[tokio::test]
    async fn ocr_upload_rejects_non_image() {
        let (status, body) = send(multipart_request("file", "application/pdf", b"%PDF")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().starts_with("Invalid file type. Allowed: image/png"));
    }

    #[tokio::test]
    async fn ocr_upload_requires_file_field() {
        let (status, body) = send(multipart_request("image", "image/png", b"png")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "No file uploaded");
    }

    #[tokio::test]
    async fn ocr_upload_rejects_oversized_file() {
        let big = vec![0u8; crate::protocol::MAX_IMAGE_BYTES + 1];
        let (status, body) = send(multipart_request("file", "image/png", &big)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "File size exceeds 10MB limit");
    }

    #[tokio::test]
    async fn ocr_upload_rejects_json_body_with_detail() {
        let (status, body) = post_json("/api/ocr/upload", serde_json::json!({ "file": "x" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().starts_with("Invalid upload"));
    }

    #[tokio::test]
    async fn health_is_ok() {
        let req = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
