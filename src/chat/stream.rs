use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use serde::Serialize;
use tokio::sync::OwnedMutexGuard;

use crate::answer::CitationCheck;
use crate::core::errors::ApiError;
use crate::llm::ChunkReceiver;
use crate::rag::RetrievedPassage;
use crate::session::{SessionStore, Turn};

/// What the pipeline produced before generation started.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnTrace {
    pub session_id: String,
    pub question: String,
    pub normalized_question: String,
    pub standalone_query: String,
    pub passages: Vec<RetrievedPassage>,
}

/// Streamed answer for one turn.
///
/// The exchange is appended to the session's transcript once, when the
/// underlying fragment channel closes without an error. Dropping the stream
/// earlier, or receiving an error, leaves the transcript untouched. The
/// session's turn lock is held until the stream is dropped.
pub struct AnswerStream {
    rx: ChunkReceiver,
    sessions: SessionStore,
    trace: TurnTrace,
    buffer: String,
    state: StreamState,
    _turn: OwnedMutexGuard<()>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Streaming,
    Committed,
    Failed,
}

impl AnswerStream {
    pub(crate) fn new(
        rx: ChunkReceiver,
        sessions: SessionStore,
        trace: TurnTrace,
        turn: OwnedMutexGuard<()>,
    ) -> Self {
        Self {
            rx,
            sessions,
            trace,
            buffer: String::new(),
            state: StreamState::Streaming,
            _turn: turn,
        }
    }

    pub fn trace(&self) -> &TurnTrace {
        &self.trace
    }

    pub fn session_id(&self) -> &str {
        &self.trace.session_id
    }

    pub fn is_committed(&self) -> bool {
        self.state == StreamState::Committed
    }

    fn commit(&mut self) {
        let answer = std::mem::take(&mut self.buffer);

        match CitationCheck::inspect(&answer) {
            CitationCheck::Cited => {}
            CitationCheck::MissingOpener => tracing::warn!(
                "Answer for session {} does not open with an article citation",
                self.trace.session_id
            ),
        }

        self.sessions.append_exchange(
            &self.trace.session_id,
            Turn::user(self.trace.question.as_str()),
            Turn::assistant(answer.as_str()),
        );
        self.buffer = answer;
        self.state = StreamState::Committed;
        tracing::info!(
            "Committed exchange to session {} ({} chars)",
            self.trace.session_id,
            self.buffer.chars().count()
        );
    }
}

impl Stream for AnswerStream {
    type Item = Result<String, ApiError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.state != StreamState::Streaming {
            return Poll::Ready(None);
        }

        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(Ok(fragment))) => {
                this.buffer.push_str(&fragment);
                Poll::Ready(Some(Ok(fragment)))
            }
            Poll::Ready(Some(Err(err))) => {
                tracing::warn!(
                    "Answer stream for session {} failed: {}",
                    this.trace.session_id,
                    err
                );
                this.state = StreamState::Failed;
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                this.commit();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for AnswerStream {
    fn drop(&mut self) {
        if self.state == StreamState::Streaming {
            tracing::info!(
                "Answer stream for session {} dropped before completion; nothing committed",
                self.trace.session_id
            );
        }
    }
}
