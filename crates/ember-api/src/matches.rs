use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::error;

use ember_core::chat::MessageRecord;
use ember_types::api::{Claims, MatchResponse, MessageResponse, SendMessageRequest};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub limit: Option<usize>,
}

pub async fn list_matches(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let records = tokio::task::spawn_blocking(move || state.matchmaker.list_matches(&claims.sub))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })??;

    let matches: Vec<MatchResponse> = records
        .into_iter()
        .map(|record| MatchResponse {
            id: record.id,
            users: record.doc.users,
            created_at: record.doc.created_at,
            last_message_at: record.doc.last_message_at,
            last_message_text: record.doc.last_message_text,
            last_message_from: record.doc.last_message_from,
        })
        .collect();

    Ok(Json(matches))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Query(query): Query<MessagesQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let records = tokio::task::spawn_blocking(move || {
        state.chat.list_messages(&claims.sub, &match_id, query.limit)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })??;

    let messages: Vec<MessageResponse> = records.into_iter().map(to_message_response).collect();
    Ok(Json(messages))
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = tokio::task::spawn_blocking(move || {
        state.chat.send_message(&claims.sub, &match_id, &req.text)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })??;

    Ok((StatusCode::CREATED, Json(to_message_response(record))))
}

fn to_message_response(record: MessageRecord) -> MessageResponse {
    MessageResponse {
        id: record.id,
        from_uid: record.message.from_uid,
        text: record.message.text,
        created_at: record.message.created_at,
    }
}
