//! HTTP handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
};
use qms_core::{AssistantResponse, DataSource, QueryContext};
use qms_query::SyncPayload;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::AppState;

/// Body of `POST /api/assistant/query`.
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub context: Option<Value>,
}

/// Malformed bodies are answered with a validation response, not a bare
/// rejection.
pub async fn query(
    State(state): State<AppState>,
    request: Result<Json<AskRequest>, JsonRejection>,
) -> (StatusCode, Json<AssistantResponse>) {
    let request = match request {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let detail = rejection.body_text();
            warn!(status = %rejection.status(), error = %detail, "Rejected query body");
            let response = AssistantResponse::failure(
                json!({ "message": "请求格式错误，需要包含 question 字段的 JSON" }),
                DataSource::Validation,
                detail,
            );
            return (rejection.status(), Json(response));
        }
    };
    let session_id = request
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let context = QueryContext {
        session_id: Some(session_id),
        business_context: request.context,
    };
    let response = state
        .assistant
        .process_query(&request.question, &context)
        .await;
    info!(
        session_id = context.session_id.as_deref().unwrap_or("-"),
        success = response.success,
        source = %response.source,
        intent = response.intent.as_deref().unwrap_or("-"),
        "Answered question"
    );
    (StatusCode::OK, Json(response))
}

pub async fn sync(
    State(state): State<AppState>,
    Json(payload): Json<SyncPayload>,
) -> Json<Value> {
    let counts = state.assistant.sync_dataset(payload);
    Json(json!({ "success": true, "counts": counts }))
}

pub async fn rules(State(state): State<AppState>) -> Json<Value> {
    let catalog = state.assistant.catalog();
    Json(json!({
        "origin": catalog.origin(),
        "rules": state.assistant.rules(),
        "rejected": catalog.rejected(),
    }))
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "service": "QMS Query Assistant",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let database = state.database.check().await;
    let ready = database.healthy || !state.database_configured;
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let snapshot = state.assistant.executor().snapshot().current();
    (
        status,
        Json(json!({
            "ready": ready,
            "database": database,
            "snapshot": snapshot.counts(),
        })),
    )
}
