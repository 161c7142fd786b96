//! HTTP Server implementation

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use qms_core::ServerConfig;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use crate::app::AppState;
use crate::handlers;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub async fn run(self) -> Result<()> {
        let addr = self.config.address();
        let app = build_router(self.state);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind HTTP server to {}", addr))?;
        info!("HTTP server listening on {}", addr);

        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP server error")?;

        Ok(())
    }
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/assistant/query", post(handlers::query))
        .route("/assistant/sync", post(handlers::sync))
        .route("/assistant/rules", get(handlers::rules));

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .nest("/api", api)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use qms_core::AppConfig;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn router() -> Router {
        build_router(AppState::new(&AppConfig::default()).await.unwrap())
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, value)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_and_readiness() {
        let (status, _) = send(
            router().await,
            Request::builder().uri("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            router().await,
            Request::builder().uri("/ready").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ready"], json!(true));
        assert_eq!(body["database"]["message"], "not configured");
    }

    #[tokio::test]
    async fn test_query_endpoint() {
        let (status, body) = send(
            router().await,
            post_json(
                "/api/assistant/query",
                json!({"question": "随便说点什么", "session_id": "s-1"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["source"], "fallback");
    }

    #[tokio::test]
    async fn test_malformed_query_body_gets_response_shape() {
        let missing_question = post_json("/api/assistant/query", json!({"text": "库存"}));
        let (status, body) = send(router().await, missing_question).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["source"], "validation");
        assert!(body["data"]["message"].as_str().unwrap().contains("question"));
        assert!(body["error"].as_str().unwrap().contains("question"));

        let broken = Request::builder()
            .method("POST")
            .uri("/api/assistant/query")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(router().await, broken).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["source"], "validation");

        let no_content_type = Request::builder()
            .method("POST")
            .uri("/api/assistant/query")
            .body(Body::from(json!({"question": "库存"}).to_string()))
            .unwrap();
        let (status, body) = send(router().await, no_content_type).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["success"], json!(false));
    }

    #[tokio::test]
    async fn test_sync_then_query() {
        let app = router().await;
        let (status, body) = send(
            app.clone(),
            post_json(
                "/api/assistant/sync",
                json!({"inventory": [{"factory": "深圳工厂", "status": "冻结", "quantity": 8}]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["counts"]["inventory"], json!(1));

        let (_, body) = send(
            app,
            post_json("/api/assistant/query", json!({"question": "冻结库存有多少"})),
        )
        .await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["source"], "memory");
    }

    #[tokio::test]
    async fn test_rules_listing() {
        let (status, body) = send(
            router().await,
            Request::builder()
                .uri("/api/assistant/rules")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["origin"], "builtin");
        assert_eq!(body["rules"].as_array().unwrap().len(), 10);
    }
}
