//! Chat endpoints.
//!
//! - `POST /chat/send` streams the assistant reply as `data: ...` frames.
//! - `GET /chat/history?projectId=` returns the caller's recent turns.
//! - `DELETE /chat/history?projectId=` clears the caller's session.
//!
//! Every check that can fail with a status code runs before the first
//! frame is produced; after that the relay reports failures in-band.

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::HeaderName;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use dashchat_core::chat::service::SendRequest;
use dashchat_types::chat::{SessionKey, Turn};

use crate::http::error::AppError;
use crate::http::extractors::auth::CallerIdentity;
use crate::state::AppState;

/// Request body for `POST /chat/send`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageBody {
    pub message: String,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub image_data_url: Option<String>,
}

/// Query for the history endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub project_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub session_key: SessionKey,
    pub turns: Vec<Turn>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearHistoryResponse {
    pub session_key: SessionKey,
    pub deleted: u64,
}

/// POST /chat/send
pub async fn send_message(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    body: Result<Json<SendMessageBody>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(body) = body.map_err(|e| AppError::Validation(e.body_text()))?;

    let frames = state
        .chat_service
        .send(
            &identity,
            SendRequest {
                message: body.message,
                project_id: body.project_id,
                image_data_url: body.image_data_url,
            },
        )
        .await?;

    let body = Body::from_stream(frames.map(Ok::<_, Infallible>));
    Ok((
        [
            (CONTENT_TYPE, "text/event-stream"),
            (CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        body,
    )
        .into_response())
}

/// GET /chat/history
pub async fn get_history(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<HistoryResponse>, AppError> {
    let Query(query) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    let (session_key, turns) = state
        .chat_service
        .history(&identity, query.project_id)
        .await?;
    Ok(Json(HistoryResponse { session_key, turns }))
}

/// DELETE /chat/history
pub async fn clear_history(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<ClearHistoryResponse>, AppError> {
    let Query(query) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    let (session_key, deleted) = state
        .chat_service
        .clear_history(&identity, query.project_id)
        .await?;
    Ok(Json(ClearHistoryResponse {
        session_key,
        deleted,
    }))
}
