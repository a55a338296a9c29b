//! Session CRUD HTTP handlers.
//!
//! Endpoints:
//! - POST   /api/v1/sessions             - Create a session from a persona prompt
//! - GET    /api/v1/sessions             - List sessions, newest first
//! - GET    /api/v1/sessions/{id}        - Messages plus display metadata
//! - PUT    /api/v1/sessions/{id}/title  - Rename a session
//! - DELETE /api/v1/sessions/{id}        - Delete a session and its messages

use std::time::Instant;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chatrelay_types::chat::ChatSession;
use chatrelay_types::llm::Message;

use crate::http::error::AppError;
use crate::http::handlers::parse_session_id;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Request body for session creation. An empty body uses the default persona.
#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    /// System prompt for the new session.
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedSession {
    pub id: Uuid,
}

/// One row of the session list.
#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub title: String,
    pub icon: String,
    pub created_at: DateTime<Utc>,
}

impl From<ChatSession> for SessionSummary {
    fn from(s: ChatSession) -> Self {
        Self {
            id: s.id,
            title: s.title,
            icon: s.icon,
            created_at: s.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionDetail {
    pub id: Uuid,
    pub title: String,
    pub messages: Vec<Message>,
    pub icon: String,
    pub assistant_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameSessionRequest {
    pub title: String,
}

/// POST /api/v1/sessions - Create a session.
pub async fn create_session(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiResponse<CreatedSession>>), AppError> {
    let start = Instant::now();

    let request: CreateSessionRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CreateSessionRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::Validation(format!("Invalid request body: {e}")))?
    };

    let settings = state.settings_snapshot().await?;
    let session = state
        .session_service
        .create_session(&settings, request.prompt.as_deref())
        .await?;

    let resp = ApiResponse::success(CreatedSession { id: session.id }, start)
        .with_link("self", &format!("/api/v1/sessions/{}", session.id))
        .with_link("chat", &format!("/api/v1/sessions/{}/chat", session.id));

    Ok((StatusCode::CREATED, Json(resp)))
}

/// GET /api/v1/sessions - List sessions, newest first.
pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<SessionSummary>>>, AppError> {
    let start = Instant::now();

    let sessions = state.session_service.list_sessions().await?;
    let summaries = sessions.into_iter().map(SessionSummary::from).collect();

    Ok(Json(
        ApiResponse::success(summaries, start).with_link("self", "/api/v1/sessions"),
    ))
}

/// GET /api/v1/sessions/{id} - Messages with icon and assistant name.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<SessionDetail>>, AppError> {
    let start = Instant::now();
    let sid = parse_session_id(&session_id)?;

    let view = state.session_service.get_session(&sid).await?;
    let detail = SessionDetail {
        id: view.session.id,
        title: view.session.title,
        messages: view.messages,
        icon: view.session.icon,
        assistant_name: view.session.assistant_name,
    };

    Ok(Json(
        ApiResponse::success(detail, start).with_link("self", &format!("/api/v1/sessions/{sid}")),
    ))
}

/// PUT /api/v1/sessions/{id}/title - Rename a session.
pub async fn rename_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(body): Json<RenameSessionRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let sid = parse_session_id(&session_id)?;

    state.session_service.rename_session(&sid, &body.title).await?;

    Ok(Json(ApiResponse::success(
        serde_json::json!({ "id": sid, "title": body.title }),
        start,
    )))
}

/// DELETE /api/v1/sessions/{id} - Delete a session.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let sid = parse_session_id(&session_id)?;

    state.session_service.delete_session(&sid).await?;

    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": true, "session_id": sid }),
        start,
    )))
}
