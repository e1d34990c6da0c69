use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::error;

use ember_types::api::{Claims, SwipeRequest, SwipeResponse, SwipedIdsResponse};

use crate::error::ApiError;
use crate::state::AppState;

/// The remote-callable like flow: identity comes from the verified token,
/// everything else from the shared matcher.
pub async fn like(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SwipeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Run blocking store work off the async runtime
    let outcome = tokio::task::spawn_blocking(move || {
        state.matchmaker.submit_like(&claims.sub, &req.other_uid)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })??;

    Ok(Json(SwipeResponse {
        matched: outcome.matched,
        match_id: outcome.match_id,
    }))
}

pub async fn pass(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SwipeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tokio::task::spawn_blocking(move || state.matchmaker.submit_pass(&claims.sub, &req.other_uid))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })??;

    Ok(StatusCode::NO_CONTENT)
}

/// Ids this user has already swiped on, for discover-feed exclusion.
pub async fn swiped(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let ids = tokio::task::spawn_blocking(move || state.matchmaker.swiped_ids(&claims.sub))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })??;

    Ok(Json(SwipedIdsResponse {
        liked: ids.liked,
        passed: ids.passed,
    }))
}
