//! Grounded answer generation.
//!
//! Builds the statute-expert prompt (system instruction with the retrieved
//! passages, few-shot examples, conversation history, the question) and
//! streams the model's reply.

mod citation;
mod examples;

use std::sync::Arc;

pub use citation::CitationCheck;
pub use examples::{default_examples, FewShotExample};

use crate::core::config::settings::LlmSettings;
use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, ChatRequest, ChunkReceiver, LlmProvider};
use crate::rag::RetrievedPassage;
use crate::session::Turn;

const SYSTEM_PROMPT: &str = "당신은 주택임대차보호법 전문가입니다. 사용자의 주택임대차보호법 관련 질문에 대해 답변해주세요. \
아래에 제공된 문서(주택임대차보호법)를 근거로만 답변해야 하며, \
문서에 근거가 없는 내용은 추측하지 말고 모른다고 답변해주세요. \
답변의 첫 문장은 반드시 '주택임대차보호법 제○조(조문명)에 따르면,'의 형식으로 시작해야 합니다. \
질문이 여러 법적 효과를 포함하는 경우(예: 대항력 + 임대인 지위 승계), 관련 항을 모두 명시해야 합니다. \
답변은 2~3문장의 간결한 설명으로 작성해주세요.\n\n{context}";

pub struct AnswerGenerator {
    llm: Arc<dyn LlmProvider>,
    examples: Vec<FewShotExample>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, examples: Vec<FewShotExample>) -> Self {
        Self {
            llm,
            examples,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_sampling(mut self, settings: &LlmSettings) -> Self {
        self.temperature = settings.temperature;
        self.max_tokens = settings.max_tokens;
        self
    }

    /// Starts streaming the answer to `question`.
    pub async fn generate(
        &self,
        question: &str,
        passages: &[RetrievedPassage],
        transcript: &[Turn],
    ) -> Result<ChunkReceiver, ApiError> {
        let messages = self.build_messages(question, passages, transcript);
        tracing::debug!(
            "Generating answer with {} passage(s), {} history turn(s)",
            passages.len(),
            transcript.len()
        );

        let request = ChatRequest::new(messages)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);
        self.llm.stream_chat(request).await
    }

    pub fn build_messages(
        &self,
        question: &str,
        passages: &[RetrievedPassage],
        transcript: &[Turn],
    ) -> Vec<ChatMessage> {
        let mut messages =
            Vec::with_capacity(1 + self.examples.len() * 2 + transcript.len() + 1);

        messages.push(ChatMessage::system(
            SYSTEM_PROMPT.replace("{context}", &format_context(passages)),
        ));
        for example in &self.examples {
            messages.push(ChatMessage::user(example.question.as_str()));
            messages.push(ChatMessage::assistant(example.answer.as_str()));
        }
        messages.extend(transcript.iter().map(Turn::to_chat_message));
        messages.push(ChatMessage::user(question));

        messages
    }
}

/// Passage texts in index order, separated by blank lines.
pub fn format_context(passages: &[RetrievedPassage]) -> String {
    passages
        .iter()
        .map(|passage| passage.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
