use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::matches;
use crate::middleware::require_auth;
use crate::state::AppState;
use crate::swipes;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/swipes/like", post(swipes::like))
        .route("/swipes/pass", post(swipes::pass))
        .route("/swipes", get(swipes::swiped))
        .route("/matches", get(matches::list_matches))
        .route("/matches/{match_id}/messages", get(matches::get_messages))
        .route("/matches/{match_id}/messages", post(matches::send_message))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().route("/health", get(health)).merge(protected)
}

async fn health() -> &'static str {
    "ok"
}
