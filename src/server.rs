use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::Config;
use crate::handlers;
use crate::storage::ObjectStore;

/// Shared per-process state: configuration, the storage client, and the
/// outbound HTTP client, all constructed once at startup.
pub struct AppState {
    pub config: Config,
    pub store: ObjectStore,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let store = ObjectStore::new(&config.storage);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        AppState {
            config,
            store,
            http,
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/replace", post(handlers::replace_text))
        .route("/api/extract_placeholders", post(handlers::extract_placeholders))
        .route("/api/generate_report", post(handlers::generate_report))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

async fn log_requests(request: Request, next: Next) -> Response {
    info!("received request: {} {}", request.method(), request.uri());
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState::new(Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            storage: StorageConfig {
                access_key: "test-access".to_string(),
                secret_key: "test-secret".to_string(),
                region: "ap-northeast-1".to_string(),
            },
            report_bucket: "test-bucket".to_string(),
            notify_url: "https://example.com/notify".to_string(),
        }))
    }

    #[tokio::test]
    async fn root_greets() {
        let app = build_router(test_state());

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(value["message"], "Hello, API is working!");
    }

    #[tokio::test]
    async fn replace_substitutes_key_marker() {
        let app = build_router(test_state());

        let request = Request::builder()
            .method("POST")
            .uri("/replace")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"key": "world", "value": "hello {key}"}"#))
            .expect("request");

        let response = app.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(value["replaced"], "hello world");
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let app = build_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/nope")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
