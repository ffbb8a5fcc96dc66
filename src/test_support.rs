//! In-process fakes for the model and the vector index.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::errors::ApiError;
use crate::llm::{ChatRequest, ChunkReceiver, LlmProvider};
use crate::rag::{PassageIndex, RetrievedPassage};

/// One scripted streaming reply: fragments, optionally followed by an error.
#[derive(Clone)]
pub struct StreamScript {
    pub fragments: Vec<String>,
    pub error: Option<String>,
}

impl StreamScript {
    pub fn ok(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|s| s.to_string()).collect(),
            error: None,
        }
    }

    pub fn failing_after(fragments: &[&str], error: &str) -> Self {
        Self {
            fragments: fragments.iter().map(|s| s.to_string()).collect(),
            error: Some(error.to_string()),
        }
    }
}

#[derive(Default)]
pub struct FakeLlm {
    chat_replies: Mutex<VecDeque<Result<String, String>>>,
    stream_replies: Mutex<VecDeque<Result<StreamScript, String>>>,
    chat_requests: Mutex<Vec<ChatRequest>>,
    stream_requests: Mutex<Vec<ChatRequest>>,
}

impl FakeLlm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_chat(&self, reply: &str) {
        self.lock_chat_replies().push_back(Ok(reply.to_string()));
    }

    pub fn push_chat_error(&self, message: &str) {
        self.lock_chat_replies().push_back(Err(message.to_string()));
    }

    pub fn push_stream(&self, script: StreamScript) {
        self.lock_stream_replies().push_back(Ok(script));
    }

    pub fn push_stream_error(&self, message: &str) {
        self.lock_stream_replies().push_back(Err(message.to_string()));
    }

    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        self.chat_requests.lock().expect("lock").clone()
    }

    pub fn stream_requests(&self) -> Vec<ChatRequest> {
        self.stream_requests.lock().expect("lock").clone()
    }

    fn lock_chat_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, String>>> {
        self.chat_replies.lock().expect("lock")
    }

    fn lock_stream_replies(
        &self,
    ) -> std::sync::MutexGuard<'_, VecDeque<Result<StreamScript, String>>> {
        self.stream_replies.lock().expect("lock")
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    fn name(&self) -> &str {
        "fake"
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
        self.chat_requests.lock().expect("lock").push(request);
        match self.lock_chat_replies().pop_front() {
            Some(reply) => reply.map_err(ApiError::Upstream),
            None => Err(ApiError::Upstream("no scripted chat reply".to_string())),
        }
    }

    async fn stream_chat(&self, request: ChatRequest) -> Result<ChunkReceiver, ApiError> {
        self.stream_requests.lock().expect("lock").push(request);
        let script = match self.lock_stream_replies().pop_front() {
            Some(Ok(script)) => script,
            Some(Err(message)) => return Err(ApiError::Upstream(message)),
            None => return Err(ApiError::Upstream("no scripted stream".to_string())),
        };

        let capacity = script.fragments.len() + 1;
        let (tx, rx) = mpsc::channel(capacity);
        for fragment in script.fragments {
            let _ = tx.try_send(Ok(fragment));
        }
        if let Some(message) = script.error {
            let _ = tx.try_send(Err(ApiError::Upstream(message)));
        }
        Ok(rx)
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        Ok(inputs.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

#[derive(Default)]
pub struct FakeIndex {
    passages: Mutex<Vec<RetrievedPassage>>,
    failure: Mutex<Option<String>>,
    queries: Mutex<Vec<(String, usize)>>,
}

impl FakeIndex {
    pub fn with_passages(texts: &[&str]) -> Arc<Self> {
        let index = Self::default();
        *index.passages.lock().expect("lock") = texts
            .iter()
            .enumerate()
            .map(|(i, text)| passage(&format!("p{}", i), text, 0.9 - i as f32 * 0.1))
            .collect();
        Arc::new(index)
    }

    pub fn failing(message: &str) -> Arc<Self> {
        let index = Self::default();
        *index.failure.lock().expect("lock") = Some(message.to_string());
        Arc::new(index)
    }

    pub fn queries(&self) -> Vec<(String, usize)> {
        self.queries.lock().expect("lock").clone()
    }
}

#[async_trait]
impl PassageIndex for FakeIndex {
    async fn similarity_search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RetrievedPassage>, ApiError> {
        self.queries
            .lock()
            .expect("lock")
            .push((query.to_string(), limit));
        if let Some(message) = self.failure.lock().expect("lock").clone() {
            return Err(ApiError::Upstream(message));
        }
        // returns everything regardless of `limit`
        Ok(self.passages.lock().expect("lock").clone())
    }

    fn describe(&self) -> String {
        "fake-index".to_string()
    }
}

pub fn passage(id: &str, text: &str, score: f32) -> RetrievedPassage {
    RetrievedPassage {
        id: id.to_string(),
        text: text.to_string(),
        score,
        source: None,
    }
}
