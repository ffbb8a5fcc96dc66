//! History-aware retrieval.
//!
//! Turns the latest question into a standalone query using the session's
//! transcript, then looks that query up in the passage index.

use std::sync::Arc;

use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::rag::{PassageIndex, RetrievedPassage};
use crate::session::Turn;

const CONTEXTUALIZE_SYSTEM_PROMPT: &str = "Given a chat history and the latest user question \
which might reference context in the chat history, \
formulate a standalone question which can be understood \
without the chat history. Do NOT answer the question, \
just reformulate it if needed and otherwise return it as is.";

#[derive(Debug, Clone)]
pub struct Retrieval {
    pub standalone_query: String,
    pub passages: Vec<RetrievedPassage>,
}

pub struct HistoryAwareRetriever {
    llm: Arc<dyn LlmProvider>,
    index: Arc<dyn PassageIndex>,
    top_k: usize,
}

impl HistoryAwareRetriever {
    pub fn new(llm: Arc<dyn LlmProvider>, index: Arc<dyn PassageIndex>, top_k: usize) -> Self {
        Self { llm, index, top_k }
    }

    pub async fn retrieve(
        &self,
        question: &str,
        transcript: &[Turn],
    ) -> Result<Retrieval, ApiError> {
        let standalone_query = self.contextualize(question, transcript).await?;

        let mut passages = self
            .index
            .similarity_search(&standalone_query, self.top_k)
            .await?;
        passages.truncate(self.top_k);

        tracing::info!(
            "Retrieved {} passage(s) for query: {}",
            passages.len(),
            standalone_query
        );
        Ok(Retrieval {
            standalone_query,
            passages,
        })
    }

    /// Rewrites `question` so it no longer depends on earlier turns.
    ///
    /// With no history there is nothing to resolve and the model is skipped.
    pub async fn contextualize(
        &self,
        question: &str,
        transcript: &[Turn],
    ) -> Result<String, ApiError> {
        if transcript.is_empty() {
            return Ok(question.to_string());
        }

        let mut messages = Vec::with_capacity(transcript.len() + 2);
        messages.push(ChatMessage::system(CONTEXTUALIZE_SYSTEM_PROMPT));
        messages.extend(transcript.iter().map(Turn::to_chat_message));
        messages.push(ChatMessage::user(question));

        let reply = self
            .llm
            .chat(ChatRequest::new(messages).with_temperature(Some(0.0)))
            .await?;
        let reply = reply.trim();

        if reply.is_empty() {
            Ok(question.to_string())
        } else {
            tracing::debug!("Standalone query: {}", reply);
            Ok(reply.to_string())
        }
    }
}
