use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::stream::{self, Stream};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::chat::AnswerStream;
use crate::core::errors::ApiError;
use crate::session::new_session_id;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    pub question: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Answers one question as a Server-Sent Events stream.
///
/// Events: `session`, `sources`, then `chunk` per fragment, closed by `done`
/// or `error`. Failures before generation starts are plain HTTP errors.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequestBody>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let session_id = payload
        .session_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(new_session_id);

    let answer = state
        .orchestrator
        .answer(&payload.question, &session_id)
        .await?;

    let trace = answer.trace();
    let head = stream::iter(vec![
        event("session", json!({ "sessionId": session_id })),
        event(
            "sources",
            json!({
                "standaloneQuery": trace.standalone_query,
                "passages": trace.passages,
            }),
        ),
    ]);

    let body = stream::unfold(Some(answer), |state: Option<AnswerStream>| async move {
        let mut answer = state?;
        match answer.next().await {
            Some(Ok(chunk)) => Some((event("chunk", json!({ "message": chunk })), Some(answer))),
            Some(Err(err)) => Some((event("error", json!({ "message": err.to_string() })), None)),
            None => {
                let done = event("done", json!({ "sessionId": answer.session_id() }));
                Some((done, None))
            }
        }
    });

    Ok(Sse::new(head.chain(body).map(Ok::<Event, Infallible>)).keep_alive(KeepAlive::default()))
}

fn event(name: &str, payload: Value) -> Event {
    Event::default().event(name).data(payload.to_string())
}
