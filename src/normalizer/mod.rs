//! Vocabulary normalization.
//!
//! Rewrites a user's question into the statute's own terminology before
//! retrieval, so that colloquial words ("집주인", "전세집") match the wording
//! of the indexed passages ("임대인", "주택").

mod dictionary;

use std::sync::Arc;

pub use dictionary::{SynonymDictionary, SynonymEntry};

use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};

const NORMALIZE_TEMPLATE: &str = "사용자의 질문을 보고 아래 사전을 참고하여
법률 문서에서 사용하는 공식 용어로 질문을 정규화하세요.

- 의미가 같은 경우에만 변경하세요.
- 의미가 달라질 수 있으면 변경하지 마세요.
- 질문의 의도는 절대 바꾸지 마세요.
- 최종 결과는 수정된 질문 한 문장만 출력하세요.

사전:
{dictionary}

사용자 질문:
{question}";

pub struct VocabularyNormalizer {
    llm: Arc<dyn LlmProvider>,
    dictionary: SynonymDictionary,
}

impl VocabularyNormalizer {
    pub fn new(llm: Arc<dyn LlmProvider>, dictionary: SynonymDictionary) -> Self {
        Self { llm, dictionary }
    }

    /// Returns the question rewritten with canonical terms.
    ///
    /// Questions that contain no colloquial term are returned unchanged
    /// without a model call. Model failures propagate to the caller.
    pub async fn normalize(&self, question: &str) -> Result<String, ApiError> {
        if !self.dictionary.contains_synonym(question) {
            return Ok(question.to_string());
        }
        let question = question.trim();

        tracing::debug!(
            "Normalizing question with terms {:?}",
            self.dictionary.matched_synonyms(question)
        );

        let request = ChatRequest::new(vec![ChatMessage::user(self.build_prompt(question))])
            .with_temperature(Some(0.0));
        let raw = self.llm.chat(request).await?;

        let rewritten = clean_rewrite(&raw).unwrap_or_else(|| question.to_string());
        tracing::info!("Normalized question: {} -> {}", question, rewritten);
        Ok(rewritten)
    }

    fn build_prompt(&self, question: &str) -> String {
        NORMALIZE_TEMPLATE
            .replace("{dictionary}", &self.dictionary.to_prompt_text())
            .replace("{question}", question)
    }
}

/// Keeps the first non-empty line of the model output, without wrapping quotes.
fn clean_rewrite(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|line| !line.is_empty())?;
    let line = line
        .trim_matches(|c| matches!(c, '"' | '\'' | '“' | '”' | '`'))
        .trim();
    if line.is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}
