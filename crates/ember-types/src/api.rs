use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- JWT Claims --

/// JWT claims verified by the API middleware. `sub` is the opaque user id
/// minted by the external identity provider; nothing here assumes a format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

// -- Swipes --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwipeRequest {
    pub other_uid: String,
}

#[derive(Debug, Serialize)]
pub struct SwipeResponse {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SwipedIdsResponse {
    pub liked: Vec<String>,
    pub passed: Vec<String>,
}

// -- Matches --

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub id: String,
    pub users: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
    pub last_message_text: String,
    pub last_message_from: String,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: String,
    pub from_uid: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
