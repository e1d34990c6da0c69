//! Layout of the document tree: per-user subcollections for outgoing swipes,
//! one top-level collection for matches, per-match message subcollections.

pub const MATCHES: &str = "matches";

pub fn likes_sent(uid: &str) -> String {
    format!("users/{uid}/likes_sent")
}

pub fn passes(uid: &str) -> String {
    format!("users/{uid}/passes")
}

pub fn like_edge(from_uid: &str, to_uid: &str) -> String {
    format!("users/{from_uid}/likes_sent/{to_uid}")
}

pub fn pass_edge(from_uid: &str, to_uid: &str) -> String {
    format!("users/{from_uid}/passes/{to_uid}")
}

pub fn match_doc(match_id: &str) -> String {
    format!("matches/{match_id}")
}

pub fn messages(match_id: &str) -> String {
    format!("matches/{match_id}/messages")
}

pub fn message_doc(match_id: &str, message_id: &str) -> String {
    format!("matches/{match_id}/messages/{message_id}")
}
