//! Typed view over the merged configuration value.

use serde::Deserialize;
use serde_json::Value;

use crate::core::errors::ApiError;

pub const DEFAULT_TOP_K: usize = 4;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub vector_index: VectorIndexSettings,
    pub chat_history: ChatHistorySettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub request_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o".to_string(),
            api_key: String::new(),
            temperature: None,
            max_tokens: None,
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model: String,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-large".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VectorIndexSettings {
    pub index_name: String,
    /// Data-plane host; resolved from `index_name` when empty.
    pub host: String,
    pub api_key: String,
    pub control_plane_url: String,
    pub namespace: String,
    /// Metadata key holding the passage text.
    pub text_key: String,
    pub top_k: usize,
}

impl Default for VectorIndexSettings {
    fn default() -> Self {
        Self {
            index_name: String::new(),
            host: String::new(),
            api_key: String::new(),
            control_plane_url: "https://api.pinecone.io".to_string(),
            namespace: String::new(),
            text_key: "text".to_string(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatHistorySettings {
    /// Sliding window per session, in turns.
    pub max_turns: usize,
    pub max_sessions: usize,
}

impl Default for ChatHistorySettings {
    fn default() -> Self {
        Self {
            max_turns: 40,
            max_sessions: 1000,
        }
    }
}

impl Settings {
    pub fn from_config(config: &Value) -> Result<Self, ApiError> {
        serde_json::from_value(config.clone()).map_err(|err| ApiError::Config(err.to_string()))
    }

    /// Credentials and index location must be present before any turn can run.
    pub fn require_credentials(&self) -> Result<(), ApiError> {
        if self.llm.api_key.trim().is_empty() {
            return Err(ApiError::Config(
                "llm.api_key is required (set OPENAI_API_KEY)".to_string(),
            ));
        }
        if self.vector_index.api_key.trim().is_empty() {
            return Err(ApiError::Config(
                "vector_index.api_key is required (set PINECONE_API_KEY)".to_string(),
            ));
        }
        if self.vector_index.index_name.trim().is_empty()
            && self.vector_index.host.trim().is_empty()
        {
            return Err(ApiError::Config(
                "vector_index.index_name or vector_index.host is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_fill_missing_sections() {
        let settings = Settings::from_config(&json!({
            "llm": { "api_key": "sk-test" }
        }))
        .expect("settings parse");

        assert_eq!(settings.llm.model, "gpt-4o");
        assert_eq!(settings.llm.api_key, "sk-test");
        assert_eq!(settings.embedding.model, "text-embedding-3-large");
        assert_eq!(settings.vector_index.top_k, DEFAULT_TOP_K);
        assert_eq!(settings.vector_index.text_key, "text");
        assert_eq!(settings.chat_history.max_turns, 40);
        assert_eq!(settings.server.port, 8000);
    }

    #[test]
    fn missing_credentials_are_reported() {
        let settings = Settings::default();
        let err = settings.require_credentials().expect_err("no keys configured");
        assert!(err.to_string().contains("llm.api_key"));

        let settings = Settings::from_config(&json!({
            "llm": { "api_key": "sk-test" },
            "vector_index": { "api_key": "pc-test" }
        }))
        .expect("settings parse");
        let err = settings.require_credentials().expect_err("no index configured");
        assert!(err.to_string().contains("index_name"));
    }

    #[test]
    fn host_alone_satisfies_index_location() {
        let settings = Settings::from_config(&json!({
            "llm": { "api_key": "sk-test" },
            "vector_index": { "api_key": "pc-test", "host": "https://statute.svc.pinecone.io" }
        }))
        .expect("settings parse");
        assert!(settings.require_credentials().is_ok());
    }
}
