//! Shared fakes for the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use leasebot_backend::core::config::{AppPaths, Settings};
use leasebot_backend::core::errors::ApiError;
use leasebot_backend::llm::{ChatRequest, ChunkReceiver, LlmProvider};
use leasebot_backend::rag::{PassageIndex, RetrievedPassage};
use leasebot_backend::state::AppState;

pub const CITED_ANSWER: [&str; 2] = [
    "주택임대차보호법 제3조(대항력 등)에 따르면, ",
    "임차인은 주택의 인도와 주민등록을 마친 다음 날부터 대항력을 가집니다.",
];

pub enum Scripted {
    Complete(Vec<String>),
    /// Sends the fragments and keeps the channel open.
    Hanging(Vec<String>),
}

#[derive(Default)]
pub struct ScriptedLlm {
    streams: Mutex<VecDeque<Scripted>>,
    open: Mutex<Vec<mpsc::Sender<Result<String, ApiError>>>>,
}

impl ScriptedLlm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, script: Scripted) {
        self.streams.lock().expect("lock").push_back(script);
    }

    pub fn push_answer(&self) {
        self.push(Scripted::Complete(
            CITED_ANSWER.iter().map(|s| s.to_string()).collect(),
        ));
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
        // echo the question (last line of the last message) back as the rewrite
        Ok(request
            .messages
            .last()
            .and_then(|message| message.content.lines().last())
            .unwrap_or_default()
            .to_string())
    }

    async fn stream_chat(&self, _request: ChatRequest) -> Result<ChunkReceiver, ApiError> {
        let script = self
            .streams
            .lock()
            .expect("lock")
            .pop_front()
            .ok_or_else(|| ApiError::Upstream("no scripted stream".to_string()))?;

        let (tx, rx) = mpsc::channel(16);
        match script {
            Scripted::Complete(fragments) => {
                for fragment in fragments {
                    let _ = tx.try_send(Ok(fragment));
                }
            }
            Scripted::Hanging(fragments) => {
                for fragment in fragments {
                    let _ = tx.try_send(Ok(fragment));
                }
                self.open.lock().expect("lock").push(tx);
            }
        }
        Ok(rx)
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        Ok(inputs.iter().map(|_| vec![0.5, 0.5]).collect())
    }
}

pub struct StaticIndex {
    passages: Vec<RetrievedPassage>,
    fail: bool,
}

impl StaticIndex {
    pub fn articles() -> Arc<Self> {
        Arc::new(Self {
            passages: vec![
                RetrievedPassage {
                    id: "art-3".to_string(),
                    text: "제3조(대항력 등) ① 임대차는 그 등기가 없는 경우에도 ...".to_string(),
                    score: 0.91,
                    source: Some("주택임대차보호법".to_string()),
                },
                RetrievedPassage {
                    id: "art-3-2".to_string(),
                    text: "제3조의2(보증금의 회수) ...".to_string(),
                    score: 0.84,
                    source: None,
                },
            ],
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            passages: Vec::new(),
            fail: true,
        })
    }
}

#[async_trait]
impl PassageIndex for StaticIndex {
    async fn similarity_search(
        &self,
        _query: &str,
        limit: usize,
    ) -> Result<Vec<RetrievedPassage>, ApiError> {
        if self.fail {
            return Err(ApiError::Upstream("index unavailable".to_string()));
        }
        Ok(self.passages.iter().take(limit).cloned().collect())
    }

    fn describe(&self) -> String {
        "static-index".to_string()
    }
}

pub fn make_state(
    dir: &tempfile::TempDir,
    llm: Arc<ScriptedLlm>,
    index: Arc<StaticIndex>,
) -> Arc<AppState> {
    AppState::from_parts(
        Arc::new(AppPaths::at(dir.path())),
        Settings::default(),
        llm,
        index,
    )
}
