mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{FakeCall, FakeLocator, Harness};
use nuance_transcribe::call::CallLocator;
use nuance_transcribe::control::{ControlHandler, DEFAULT_BUG_NAME};
use nuance_transcribe::http::TranscriptionResponse;
use nuance_transcribe::{create_router, AppState, SessionStats};
use std::sync::Arc;
use tower::ServiceExt;

fn app(h: &Harness, locator: &Arc<FakeLocator>) -> Router {
    let control = ControlHandler::new(
        Arc::clone(locator) as Arc<dyn CallLocator>,
        h.manager.clone(),
        DEFAULT_BUG_NAME,
    );
    create_router(AppState::new(Arc::new(control)))
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let h = Harness::new();
    let locator = Arc::new(FakeLocator::default());

    let response = app(&h, &locator)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
}

#[tokio::test]
async fn test_command_line_endpoint() {
    let h = Harness::new();
    let locator = Arc::new(FakeLocator::default());
    locator.add(FakeCall::new("abc"));

    let response = app(&h, &locator)
        .oneshot(post("/api/transcribe", "abc start en-US interim"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "+OK Success\n");

    let response = app(&h, &locator)
        .oneshot(post("/api/transcribe", "abc"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.starts_with("-USAGE: "));

    let response = app(&h, &locator)
        .oneshot(post("/api/transcribe", "nope stop"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "-ERR Operation Failed\n");
}

#[tokio::test]
async fn test_structured_start_status_stop() {
    let h = Harness::new();
    let locator = Arc::new(FakeLocator::default());
    locator.add(FakeCall::new("abc"));

    let response = app(&h, &locator)
        .oneshot(post(
            "/calls/abc/transcription/start",
            r#"{"language":"en-US","interim":true,"bug_name":"agent"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: TranscriptionResponse = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body.call_id, "abc");
    assert_eq!(body.bug_name, "agent");
    assert_eq!(body.status, "ok");

    let response = app(&h, &locator)
        .oneshot(
            Request::builder()
                .uri("/calls/abc/transcription")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let sessions: Vec<SessionStats> = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].bug_name, "agent");
    assert_eq!(sessions[0].language, "en-US");

    let response = app(&h, &locator)
        .oneshot(post("/calls/abc/transcription/stop", r#"{"bug_name":"agent"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.manager.session_count().await, 0);
}

#[tokio::test]
async fn test_stop_without_body_uses_default_bug() {
    let h = Harness::new();
    let locator = Arc::new(FakeLocator::default());
    locator.add(FakeCall::new("abc"));

    let response = app(&h, &locator)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/calls/abc/transcription/stop")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: TranscriptionResponse = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body.bug_name, DEFAULT_BUG_NAME);
}

#[tokio::test]
async fn test_structured_start_unknown_call() {
    let h = Harness::new();
    let locator = Arc::new(FakeLocator::default());

    let response = app(&h, &locator)
        .oneshot(post(
            "/calls/ghost/transcription/start",
            r#"{"language":"en-US"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: TranscriptionResponse = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body.status, "failed");
    assert_eq!(body.message, "-ERR Operation Failed");
}

#[tokio::test]
async fn test_subject_breaking_names_are_bad_requests() {
    let h = Harness::new();
    let locator = Arc::new(FakeLocator::default());
    locator.add(FakeCall::new("abc"));
    locator.add(FakeCall::new("a.b"));

    let response = app(&h, &locator)
        .oneshot(post(
            "/calls/a.b/transcription/start",
            r#"{"language":"en-US"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: TranscriptionResponse = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body.status, "usage");

    let response = app(&h, &locator)
        .oneshot(post(
            "/calls/abc/transcription/start",
            r#"{"language":"en-US","bug_name":">"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app(&h, &locator)
        .oneshot(post("/api/transcribe", "abc start en-US full mono *"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(h.backend.open_count(), 0);
}
