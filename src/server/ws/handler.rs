use std::collections::VecDeque;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::UnboundedReceiver;

use super::protocol::{WsIncomingMessage, WsOutgoingMessage};
use crate::core::errors::ApiError;
use crate::session::new_session_id;
use crate::state::AppState;

type WsSender = SplitSink<WebSocket, Message>;

/// Whether the socket is still usable after handling a message.
enum Flow {
    Continue,
    Disconnected,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<WsIncomingMessage>();
    tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<WsIncomingMessage>(&text) {
                    Ok(incoming) => {
                        if tx.send(incoming).is_err() {
                            break;
                        }
                    }
                    Err(err) => tracing::debug!("Ignoring malformed ws message: {}", err),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    let mut current_session_id = new_session_id();
    tracing::info!("WebSocket connected with session {}", current_session_id);
    if send_json(
        &mut sender,
        &WsOutgoingMessage::Session {
            session_id: &current_session_id,
        },
    )
    .await
    .is_err()
    {
        return;
    }

    let mut deferred = VecDeque::new();
    loop {
        let incoming = match deferred.pop_front() {
            Some(incoming) => incoming,
            None => match rx.recv().await {
                Some(incoming) => incoming,
                None => break,
            },
        };

        match handle_message(
            &mut sender,
            &mut rx,
            &mut deferred,
            &state,
            &mut current_session_id,
            incoming,
        )
        .await
        {
            Ok(Flow::Continue) => {}
            Ok(Flow::Disconnected) => break,
            Err(err) => {
                tracing::warn!("Turn failed for session {}: {}", current_session_id, err);
                let _ = send_json(
                    &mut sender,
                    &WsOutgoingMessage::Error {
                        message: err.to_string(),
                    },
                )
                .await;
            }
        }
    }
    tracing::info!("WebSocket closed for session {}", current_session_id);
}

async fn handle_message(
    sender: &mut WsSender,
    incoming: &mut UnboundedReceiver<WsIncomingMessage>,
    deferred: &mut VecDeque<WsIncomingMessage>,
    state: &Arc<AppState>,
    current_session_id: &mut String,
    data: WsIncomingMessage,
) -> Result<Flow, ApiError> {
    match data.msg_type.as_deref().unwrap_or("message") {
        "stop" => {
            send_json(sender, &WsOutgoingMessage::Stopped).await?;
            Ok(Flow::Continue)
        }
        "set_session" => {
            let session_id = data
                .session_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .ok_or_else(|| ApiError::BadRequest("sessionId is required".to_string()))?;
            *current_session_id = session_id;
            send_json(
                sender,
                &WsOutgoingMessage::Session {
                    session_id: current_session_id.as_str(),
                },
            )
            .await?;
            send_history(sender, state, current_session_id.as_str()).await?;
            Ok(Flow::Continue)
        }
        "message" => {
            let question = data.message.unwrap_or_default();
            if question.trim().is_empty() {
                return Ok(Flow::Continue);
            }
            run_turn(
                sender,
                incoming,
                deferred,
                state,
                current_session_id.as_str(),
                &question,
            )
            .await
        }
        other => Err(ApiError::BadRequest(format!(
            "unsupported message type: {}",
            other
        ))),
    }
}

/// Streams one answer, watching the socket for `stop` or a disconnect.
async fn run_turn(
    sender: &mut WsSender,
    incoming: &mut UnboundedReceiver<WsIncomingMessage>,
    deferred: &mut VecDeque<WsIncomingMessage>,
    state: &Arc<AppState>,
    session_id: &str,
    question: &str,
) -> Result<Flow, ApiError> {
    let mut stream = state.orchestrator.answer(question, session_id).await?;

    let trace = stream.trace();
    send_json(
        sender,
        &WsOutgoingMessage::Sources {
            standalone_query: &trace.standalone_query,
            passages: &trace.passages,
        },
    )
    .await?;

    loop {
        tokio::select! {
            fragment = stream.next() => match fragment {
                Some(Ok(chunk)) => {
                    if chunk.is_empty() {
                        continue;
                    }
                    send_json(sender, &WsOutgoingMessage::Chunk { message: &chunk }).await?;
                }
                Some(Err(err)) => return Err(err),
                None => {
                    send_json(sender, &WsOutgoingMessage::Done { session_id }).await?;
                    return Ok(Flow::Continue);
                }
            },
            next = incoming.recv() => match next {
                Some(msg) if msg.is_stop() => {
                    drop(stream);
                    tracing::info!("Turn stopped by client for session {}", session_id);
                    send_json(sender, &WsOutgoingMessage::Stopped).await?;
                    return Ok(Flow::Continue);
                }
                Some(msg) => deferred.push_back(msg),
                None => {
                    drop(stream);
                    tracing::info!("Client disconnected mid-answer for session {}", session_id);
                    return Ok(Flow::Disconnected);
                }
            },
        }
    }
}

async fn send_history(
    sender: &mut WsSender,
    state: &Arc<AppState>,
    session_id: &str,
) -> Result<(), ApiError> {
    let transcript = state.sessions.snapshot(session_id).unwrap_or_default();
    send_json(
        sender,
        &WsOutgoingMessage::History {
            session_id,
            messages: &transcript,
        },
    )
    .await
}

pub async fn send_json(
    sender: &mut WsSender,
    payload: &WsOutgoingMessage<'_>,
) -> Result<(), ApiError> {
    let text = serde_json::to_string(payload).map_err(ApiError::internal)?;
    sender
        .send(Message::Text(text))
        .await
        .map_err(ApiError::internal)?;
    Ok(())
}
