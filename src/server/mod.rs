//! HTTP API: direct processing, HITL start/resume, and thread lookup.

pub mod schema;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agent::workflow::{EmailAssistant, RunOutcome};
use crate::error::{Error, WorkflowError};
use crate::server::schema::{
    HitlStatus, InterruptInfo, ProcessEmailHitlRequest, ProcessEmailHitlResponse,
    ProcessEmailRequest, ProcessEmailResponse, ThreadStatusResponse,
};

#[derive(Clone)]
struct AppState {
    assistant: Arc<EmailAssistant>,
}

/// Build the API router.
pub fn routes(assistant: Arc<EmailAssistant>) -> Router {
    let state = AppState { assistant };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/process-email", post(process_email))
        .route("/process-email-hitl", post(process_email_hitl))
        .route("/process-email-hitl/{thread_id}", get(thread_status))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// Serve the API on an already-bound listener until the process exits.
pub async fn serve(listener: tokio::net::TcpListener, router: Router) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "HTTP API listening");
    }
    axum::serve(listener, router).await
}

fn status_for(err: &Error) -> StatusCode {
    if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

// ── Info ────────────────────────────────────────────────────────────

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Email Assistant API is running",
        "endpoints": ["/health", "/process-email", "/process-email-hitl", "/process-email-hitl/{thread_id}"]
    }))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "email-assistant"
    }))
}

// ── Direct ──────────────────────────────────────────────────────────

async fn process_email(
    State(state): State<AppState>,
    Json(body): Json<ProcessEmailRequest>,
) -> impl IntoResponse {
    match state.assistant.process_email(body.email).await {
        Ok(result) => (
            StatusCode::OK,
            Json(serde_json::json!(ProcessEmailResponse::from(result))),
        ),
        Err(e) => {
            error!(error = %e, "process-email failed");
            (
                status_for(&e),
                Json(serde_json::json!({"error": e.to_string()})),
            )
        }
    }
}

// ── HITL ────────────────────────────────────────────────────────────

async fn process_email_hitl(
    State(state): State<AppState>,
    Json(body): Json<ProcessEmailHitlRequest>,
) -> impl IntoResponse {
    let outcome = match body {
        ProcessEmailHitlRequest {
            thread_id: Some(raw_id),
            human_response: Some(response),
            ..
        } => {
            let Ok(thread_id) = Uuid::parse_str(&raw_id) else {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ProcessEmailHitlResponse::error(
                        Some(raw_id),
                        "Invalid thread ID",
                    )),
                );
            };
            state
                .assistant
                .resume(thread_id, response)
                .await
                .map_err(|e| (Some(thread_id), e))
        }
        ProcessEmailHitlRequest {
            email: Some(email), ..
        } => state.assistant.start(email).await.map_err(|e| (None, e)),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ProcessEmailHitlResponse::error(
                    None,
                    "Either email or (thread_id + human_response) must be provided",
                )),
            );
        }
    };

    match outcome {
        Ok(RunOutcome::Interrupted { thread_id, review }) => (
            StatusCode::OK,
            Json(ProcessEmailHitlResponse {
                status: HitlStatus::Interrupted,
                thread_id: Some(thread_id.to_string()),
                interrupt: Some(InterruptInfo::from(review)),
                result: None,
                error: None,
            }),
        ),
        Ok(RunOutcome::Completed { thread_id, result }) => (
            StatusCode::OK,
            Json(ProcessEmailHitlResponse {
                status: HitlStatus::Completed,
                thread_id: Some(thread_id.to_string()),
                interrupt: None,
                result: Some(ProcessEmailResponse::from(result)),
                error: None,
            }),
        ),
        Err((thread_id, e)) => {
            if e.is_client_error() {
                warn!(error = %e, "Rejected HITL request");
            } else {
                error!(error = %e, "HITL run failed");
            }
            (
                status_for(&e),
                Json(ProcessEmailHitlResponse::error(
                    thread_id.map(|id| id.to_string()),
                    e.to_string(),
                )),
            )
        }
    }
}

async fn thread_status(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> impl IntoResponse {
    let Ok(id) = Uuid::parse_str(&thread_id) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Invalid thread ID"})),
        );
    };

    match state.assistant.thread(id).await {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(serde_json::json!(ThreadStatusResponse::from(snapshot))),
        ),
        Err(Error::Workflow(WorkflowError::ThreadNotFound { .. })) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": format!("Thread {thread_id} not found")})),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": e.to_string()})),
        ),
    }
}
