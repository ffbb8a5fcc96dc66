use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use super::provider::{ChunkReceiver, LlmProvider};
use super::types::ChatRequest;
use crate::core::config::settings::{EmbeddingSettings, LlmSettings};
use crate::core::errors::ApiError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for any OpenAI-compatible `/v1/chat/completions` + `/v1/embeddings` API.
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
    request_timeout: Duration,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(llm: &LlmSettings, embedding: &EmbeddingSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: llm.base_url.trim_end_matches('/').to_string(),
            api_key: llm.api_key.clone(),
            chat_model: llm.model.clone(),
            embedding_model: embedding.model.clone(),
            request_timeout: Duration::from_secs(llm.request_timeout_secs),
            client,
        })
    }

    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    fn completion_body(&self, request: &ChatRequest, stream: bool) -> Value {
        let mut body = json!({
            "model": self.chat_model,
            "messages": request.messages,
            "stream": stream,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature { obj.insert("temperature".to_string(), json!(t)); }
            if let Some(t) = request.max_tokens { obj.insert("max_tokens".to_string(), json!(t)); }
        }
        body
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.completion_body(&request, false);

        let res = self.client.post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!("chat completion failed ({}): {}", status, text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|content| content.to_string())
            .ok_or_else(|| ApiError::Upstream("chat completion returned no content".to_string()))
    }

    async fn stream_chat(&self, request: ChatRequest) -> Result<ChunkReceiver, ApiError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.completion_body(&request, true);

        // no overall timeout here: it would cut long answers off mid-stream
        let res = self.client.post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!("chat stream failed ({}): {}", status, text)));
        }

        let (tx, rx) = mpsc::channel(32);
        let mut stream = res.bytes_stream();

        tokio::spawn(async move {
            let mut lines = SseLineBuffer::default();
            while let Some(item) = stream.next().await {
                match item {
                    Ok(bytes) => {
                        for line in lines.push(&bytes) {
                            match parse_sse_line(&line) {
                                SseEvent::Content(content) => {
                                    if tx.send(Ok(content)).await.is_err() {
                                        // receiver dropped: the client went away
                                        return;
                                    }
                                }
                                SseEvent::Error(message) => {
                                    let _ = tx
                                        .send(Err(ApiError::Upstream(format!(
                                            "chat stream reported an error: {}",
                                            message
                                        ))))
                                        .await;
                                    return;
                                }
                                SseEvent::Done => return,
                                SseEvent::Skip => {}
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(ApiError::upstream(e))).await;
                        return;
                    }
                }
            }

            // a body that closes without [DONE] is a truncated answer
            let _ = tx
                .send(Err(ApiError::Upstream(
                    "chat stream ended before [DONE]".to_string(),
                )))
                .await;
        });

        Ok(rx)
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        let url = format!("{}/v1/embeddings", self.base_url);

        let body = json!({
            "model": self.embedding_model,
            "input": inputs,
        });

        let res = self.client.post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!("embedding request failed ({}): {}", status, text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;

        let mut indexed = Vec::new();
        if let Some(data) = payload["data"].as_array() {
            for (position, item) in data.iter().enumerate() {
                let index = item["index"].as_u64().map(|i| i as usize).unwrap_or(position);
                if let Some(vals) = item["embedding"].as_array() {
                    let vec: Vec<f32> = vals.iter().filter_map(|v| v.as_f64().map(|f| f as f32)).collect();
                    indexed.push((index, vec));
                }
            }
        }
        indexed.sort_by_key(|(index, _)| *index);

        if indexed.len() != inputs.len() {
            return Err(ApiError::Upstream(format!(
                "embedding response had {} vectors for {} inputs",
                indexed.len(),
                inputs.len()
            )));
        }

        Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SseEvent {
    Content(String),
    Error(String),
    Done,
    Skip,
}

fn parse_sse_line(line: &str) -> SseEvent {
    let line = line.trim();
    if line == "data: [DONE]" {
        return SseEvent::Done;
    }
    let Some(data) = line.strip_prefix("data:") else {
        return SseEvent::Skip;
    };
    let Ok(json) = serde_json::from_str::<Value>(data.trim_start()) else {
        return SseEvent::Skip;
    };
    if let Some(error) = json.get("error").filter(|e| !e.is_null()) {
        let message = error["message"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return SseEvent::Error(message);
    }
    match json["choices"][0]["delta"]["content"].as_str() {
        Some(content) if !content.is_empty() => SseEvent::Content(content.to_string()),
        _ => SseEvent::Skip,
    }
}

/// Reassembles complete lines from network chunks that may split a line
/// (or a multi-byte character) anywhere.
#[derive(Default)]
struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line).trim_end().to_string();
            if !text.is_empty() {
                lines.push(text);
            }
        }
        lines
    }
}
