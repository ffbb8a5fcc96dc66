//! HTTP surface tests: each test builds its own state with scripted collaborators.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use common::{make_state, ScriptedLlm, StaticIndex, CITED_ANSWER};
use leasebot_backend::server::router::router;

fn post_json(uri: &str, json: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

async fn body_text(resp: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(resp: axum::response::Response) -> Value {
    serde_json::from_str(&body_text(resp).await).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(make_state(&dir, ScriptedLlm::new(), StaticIndex::articles()));

    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "ok");
}

#[tokio::test]
async fn chat_page_is_served_at_root() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(make_state(&dir, ScriptedLlm::new(), StaticIndex::articles()));

    let resp = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("🏢 주택 임대차 보호법 챗봇"));
    assert!(html.contains("주택임대차보호법에 관련된 궁금한 내용들을 말씀해주세요!"));
    assert!(html.contains("답변을 생성하는 중입니다"));
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(make_state(&dir, ScriptedLlm::new(), StaticIndex::articles()));

    let resp = app
        .oneshot(
            Request::get("/api/sessions/missing/messages")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["error"], "Session not found");
}

#[tokio::test]
async fn sse_chat_streams_answer_and_commits_exchange() {
    let dir = tempfile::tempdir().unwrap();
    let llm = ScriptedLlm::new();
    llm.push_answer();
    let state = make_state(&dir, llm, StaticIndex::articles());
    let app = router(state.clone());

    let resp = app
        .clone()
        .oneshot(post_json(
            "/api/chat",
            r#"{"question":"임차인의 대항력은 언제 생기나요?","session_id":"sse-1"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_text(resp).await;
    let session_at = body.find("event: session").expect("session event");
    let sources_at = body.find("event: sources").expect("sources event");
    let chunk_at = body.find("event: chunk").expect("chunk event");
    let done_at = body.find("event: done").expect("done event");
    assert!(session_at < sources_at && sources_at < chunk_at && chunk_at < done_at);
    assert!(body.contains("art-3"));
    assert!(!body.contains("event: error"));

    let resp = app
        .oneshot(
            Request::get("/api/sessions/sse-1/messages")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    let messages = json["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "임차인의 대항력은 언제 생기나요?");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["content"], CITED_ANSWER.concat());
    assert_eq!(state.sessions.len(), 1);
}

#[tokio::test]
async fn sse_chat_without_session_gets_a_fresh_one() {
    let dir = tempfile::tempdir().unwrap();
    let llm = ScriptedLlm::new();
    llm.push_answer();
    let state = make_state(&dir, llm, StaticIndex::articles());

    let resp = router(state.clone())
        .oneshot(post_json("/api/chat", r#"{"question":"보증금 회수 방법은?"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_text(resp).await;
    let session_line = body
        .lines()
        .skip_while(|line| *line != "event: session")
        .nth(1)
        .expect("session data line");
    let data: Value = serde_json::from_str(session_line.trim_start_matches("data: ")).unwrap();
    let session_id = data["sessionId"].as_str().unwrap();

    assert_eq!(session_id.len(), 36);
    assert_eq!(state.sessions.snapshot(session_id).map(|t| t.len()), Some(2));
}

#[tokio::test]
async fn sse_chat_index_failure_is_bad_gateway_and_commits_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let llm = ScriptedLlm::new();
    llm.push_answer();
    let state = make_state(&dir, llm, StaticIndex::failing());

    let resp = router(state.clone())
        .oneshot(post_json(
            "/api/chat",
            r#"{"question":"대항력","session_id":"broken"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert!(body_json(resp).await["error"]
        .as_str()
        .unwrap()
        .contains("index unavailable"));
    assert_eq!(state.sessions.snapshot("broken").map(|t| t.len()), Some(0));
}

#[tokio::test]
async fn sse_chat_rejects_blank_question() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(make_state(&dir, ScriptedLlm::new(), StaticIndex::articles()));

    let resp = app
        .oneshot(post_json("/api/chat", r#"{"question":"   "}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_reports_collaborators() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(make_state(&dir, ScriptedLlm::new(), StaticIndex::articles()));

    let resp = app
        .oneshot(Request::get("/api/status").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["sessions"], 0);
    assert_eq!(json["llm"], "scripted");
    assert_eq!(json["index"], "static-index");
    assert_eq!(json["top_k"], 4);
}
