use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use tower::ServiceExt;

use ember_store::memory::MemoryStore;
use ember_types::api::Claims;

use crate::routes;
use crate::state::{AppState, AppStateInner};

const TEST_SECRET: &str = "test-secret";

fn test_app() -> Router {
    let store = Arc::new(MemoryStore::new());
    let state: AppState = Arc::new(AppStateInner::new(store, TEST_SECRET.to_string()));
    routes::router(state)
}

fn test_token(sub: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time")
        .as_secs();
    let claims = Claims {
        sub: sub.to_string(),
        exp: (now + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .expect("token")
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn health_is_public() {
    let app = test_app();
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn like_requires_authentication() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/swipes/like",
        None,
        Some(json!({ "other_uid": "u2" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "unauthenticated");
}

#[tokio::test]
async fn garbage_token_is_unauthenticated() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/swipes/like",
        Some("not-a-jwt"),
        Some(json!({ "other_uid": "u2" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "unauthenticated");
}

#[tokio::test]
async fn self_like_is_invalid_argument() {
    let app = test_app();
    let token = test_token("u1");
    let (status, body) = send(
        &app,
        "POST",
        "/swipes/like",
        Some(&token),
        Some(json!({ "other_uid": "u1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid-argument");
}

#[tokio::test]
async fn blank_target_is_invalid_argument() {
    let app = test_app();
    let token = test_token("u1");
    let (status, body) = send(
        &app,
        "POST",
        "/swipes/like",
        Some(&token),
        Some(json!({ "other_uid": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid-argument");
}

#[tokio::test]
async fn reciprocal_likes_match_once() {
    let app = test_app();
    let u1 = test_token("u1");
    let u2 = test_token("u2");

    let (status, body) = send(
        &app,
        "POST",
        "/swipes/like",
        Some(&u1),
        Some(json!({ "other_uid": "u2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matched"], json!(false));
    assert!(body.get("match_id").is_none());

    let (status, body) = send(
        &app,
        "POST",
        "/swipes/like",
        Some(&u2),
        Some(json!({ "other_uid": "u1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matched"], json!(true));
    assert_eq!(body["match_id"], json!("u1_u2"));

    // Repeating the like reports the same match and disturbs nothing.
    let (_, matches_before) = send(&app, "GET", "/matches", Some(&u1), None).await;
    let (status, body) = send(
        &app,
        "POST",
        "/swipes/like",
        Some(&u2),
        Some(json!({ "other_uid": "u1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["match_id"], json!("u1_u2"));
    let (_, matches_after) = send(&app, "GET", "/matches", Some(&u1), None).await;
    assert_eq!(matches_before, matches_after);

    let list = matches_after.as_array().expect("array");
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], json!("u1_u2"));
    assert_eq!(list[0]["users"], json!(["u1", "u2"]));
    assert_eq!(list[0]["last_message_text"], json!(""));
}

#[tokio::test]
async fn pass_is_recorded_and_listed() {
    let app = test_app();
    let token = test_token("u1");

    let (status, _) = send(
        &app,
        "POST",
        "/swipes/pass",
        Some(&token),
        Some(json!({ "other_uid": "u3" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "GET", "/swipes", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["liked"], json!([]));
    assert_eq!(body["passed"], json!(["u3"]));
}

#[tokio::test]
async fn chat_round_trip_updates_match_preview() {
    let app = test_app();
    let u1 = test_token("u1");
    let u2 = test_token("u2");

    send(
        &app,
        "POST",
        "/swipes/like",
        Some(&u1),
        Some(json!({ "other_uid": "u2" })),
    )
    .await;
    send(
        &app,
        "POST",
        "/swipes/like",
        Some(&u2),
        Some(json!({ "other_uid": "u1" })),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/matches/u1_u2/messages",
        Some(&u1),
        Some(json!({ "text": "hey!" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["from_uid"], json!("u1"));
    assert_eq!(body["text"], json!("hey!"));

    // The other participant sees the message and the updated preview.
    let (status, body) = send(&app, "GET", "/matches/u1_u2/messages", Some(&u2), None).await;
    assert_eq!(status, StatusCode::OK);
    let messages = body.as_array().expect("array");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["text"], json!("hey!"));

    let (_, body) = send(&app, "GET", "/matches", Some(&u2), None).await;
    let list = body.as_array().expect("array");
    assert_eq!(list[0]["last_message_text"], json!("hey!"));
    assert_eq!(list[0]["last_message_from"], json!("u1"));
}

#[tokio::test]
async fn outsiders_are_denied_and_unknown_matches_missing() {
    let app = test_app();
    let u1 = test_token("u1");
    let u2 = test_token("u2");
    let u9 = test_token("u9");

    send(
        &app,
        "POST",
        "/swipes/like",
        Some(&u1),
        Some(json!({ "other_uid": "u2" })),
    )
    .await;
    send(
        &app,
        "POST",
        "/swipes/like",
        Some(&u2),
        Some(json!({ "other_uid": "u1" })),
    )
    .await;

    let (status, body) = send(&app, "GET", "/matches/u1_u2/messages", Some(&u9), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "permission-denied");

    let (status, body) = send(
        &app,
        "POST",
        "/matches/u1_u9/messages",
        Some(&u1),
        Some(json!({ "text": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "not-found");

    let (status, body) = send(
        &app,
        "POST",
        "/matches/u1_u2/messages",
        Some(&u1),
        Some(json!({ "text": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid-argument");
}
