//! Conversation orchestration: normalize → retrieve → generate → commit.

mod stream;

use std::sync::Arc;

pub use stream::{AnswerStream, TurnTrace};

use crate::answer::{default_examples, AnswerGenerator};
use crate::core::config::Settings;
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;
use crate::normalizer::{SynonymDictionary, VocabularyNormalizer};
use crate::rag::PassageIndex;
use crate::retriever::HistoryAwareRetriever;
use crate::session::SessionStore;

pub struct ConversationOrchestrator {
    sessions: SessionStore,
    normalizer: VocabularyNormalizer,
    retriever: HistoryAwareRetriever,
    generator: AnswerGenerator,
}

impl ConversationOrchestrator {
    pub fn new(
        sessions: SessionStore,
        normalizer: VocabularyNormalizer,
        retriever: HistoryAwareRetriever,
        generator: AnswerGenerator,
    ) -> Self {
        Self {
            sessions,
            normalizer,
            retriever,
            generator,
        }
    }

    /// Wires the default dictionary, examples and `top_k` from settings.
    pub fn from_settings(
        settings: &Settings,
        sessions: SessionStore,
        llm: Arc<dyn LlmProvider>,
        index: Arc<dyn PassageIndex>,
    ) -> Self {
        Self::new(
            sessions,
            VocabularyNormalizer::new(llm.clone(), SynonymDictionary::default()),
            HistoryAwareRetriever::new(llm.clone(), index, settings.vector_index.top_k),
            AnswerGenerator::new(llm, default_examples()).with_sampling(&settings.llm),
        )
    }

    /// Runs one turn and returns its answer stream.
    ///
    /// Waits for any earlier turn of the same session to finish first. Any
    /// stage failure aborts the turn without touching the transcript.
    pub async fn answer(
        &self,
        question: &str,
        session_id: &str,
    ) -> Result<AnswerStream, ApiError> {
        if question.trim().is_empty() {
            return Err(ApiError::BadRequest("question must not be empty".to_string()));
        }
        if session_id.trim().is_empty() {
            return Err(ApiError::BadRequest("session_id must not be empty".to_string()));
        }

        let turn = self.sessions.turn_lock(session_id).lock_owned().await;
        let transcript = self.sessions.get_or_create(session_id);
        tracing::info!(
            "Starting turn for session {} ({} prior turn(s))",
            session_id,
            transcript.len()
        );

        let normalized_question = self.normalizer.normalize(question).await?;
        let retrieval = self
            .retriever
            .retrieve(&normalized_question, &transcript)
            .await?;
        let rx = self
            .generator
            .generate(&normalized_question, &retrieval.passages, &transcript)
            .await?;

        let trace = TurnTrace {
            session_id: session_id.to_string(),
            question: question.to_string(),
            normalized_question,
            standalone_query: retrieval.standalone_query,
            passages: retrieval.passages,
        };
        Ok(AnswerStream::new(rx, self.sessions.clone(), trace, turn))
    }
}
