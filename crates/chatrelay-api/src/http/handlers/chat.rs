//! Streaming chat endpoints.
//!
//! - POST /api/v1/sessions/{id}/chat       - `{ "message": "..." }`
//! - POST /api/v1/sessions/{id}/regenerate - no body
//!
//! Both answer with a `text/plain` byte stream carrying the reply text as
//! it arrives. Validation failures are returned as JSON errors before any
//! body is sent. A client disconnect drops the reply stream, which cancels
//! the turn; the partial reply is still stored.

use std::convert::Infallible;

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use serde::Deserialize;

use chatrelay_core::chat::relay::ChatTurn;

use crate::http::error::AppError;
use crate::http::handlers::parse_session_id;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// A missing message is treated like an empty one.
    #[serde(default)]
    pub message: String,
}

/// POST /api/v1/sessions/{id}/chat - Send a message and stream the reply.
pub async fn chat(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(body): Json<ChatRequest>,
) -> Result<Response, AppError> {
    let sid = parse_session_id(&session_id)?;
    let settings = state.settings_snapshot().await?;

    let turn = state.relay.chat(&settings, sid, &body.message).await?;
    Ok(stream_reply(turn))
}

/// POST /api/v1/sessions/{id}/regenerate - Replace the last reply.
pub async fn regenerate(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Response, AppError> {
    let sid = parse_session_id(&session_id)?;
    let settings = state.settings_snapshot().await?;

    let turn = state.relay.regenerate(&settings, sid).await?;
    Ok(stream_reply(turn))
}

/// Turn the relay's reply channel into a chunked plain-text body.
///
/// The completion handle is detached: the relay commits and logs the turn
/// on its own, whether or not the client reads to the end.
fn stream_reply(turn: ChatTurn) -> Response {
    let ChatTurn { reply, completion } = turn;
    drop(completion);

    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(reply.map(Ok::<_, Infallible>)),
    )
        .into_response()
}
