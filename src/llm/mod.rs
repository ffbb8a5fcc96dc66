pub mod openai;
pub mod provider;
pub mod types;

pub use openai::OpenAiProvider;
pub use provider::{ChunkReceiver, LlmProvider};
pub use types::{ChatMessage, ChatRequest};
