//! Pinecone-backed passage index.
//!
//! Embeds the query through the configured `LlmProvider` and runs a `topK`
//! query against an existing index. The data-plane host is either configured
//! directly or resolved once from the index name via the control plane.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::OnceCell;

use super::store::{PassageIndex, RetrievedPassage};
use crate::core::config::settings::VectorIndexSettings;
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;

const API_VERSION: &str = "2024-07";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct PineconeIndex {
    client: Client,
    embedder: Arc<dyn LlmProvider>,
    api_key: String,
    index_name: String,
    control_plane_url: String,
    namespace: String,
    text_key: String,
    host: OnceCell<String>,
}

impl PineconeIndex {
    pub fn new(
        settings: &VectorIndexSettings,
        embedder: Arc<dyn LlmProvider>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ApiError::internal)?;

        let host = OnceCell::new();
        if !settings.host.trim().is_empty() {
            let _ = host.set(normalize_host(&settings.host));
        }

        Ok(Self {
            client,
            embedder,
            api_key: settings.api_key.clone(),
            index_name: settings.index_name.clone(),
            control_plane_url: settings.control_plane_url.trim_end_matches('/').to_string(),
            namespace: settings.namespace.clone(),
            text_key: settings.text_key.clone(),
            host,
        })
    }

    async fn host(&self) -> Result<&str, ApiError> {
        let host = self
            .host
            .get_or_try_init(|| self.describe_index_host())
            .await?;
        Ok(host.as_str())
    }

    async fn describe_index_host(&self) -> Result<String, ApiError> {
        if self.index_name.trim().is_empty() {
            return Err(ApiError::Config(
                "vector_index.index_name is required to resolve the index host".to_string(),
            ));
        }

        let url = format!("{}/indexes/{}", self.control_plane_url, self.index_name);
        let res = self
            .client
            .get(&url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "describe index '{}' failed ({}): {}",
                self.index_name, status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        let host = payload
            .get("host")
            .and_then(|v| v.as_str())
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                ApiError::Upstream(format!("index '{}' has no host", self.index_name))
            })?;

        tracing::info!("Resolved index '{}' to host {}", self.index_name, host);
        Ok(normalize_host(host))
    }

    fn passage_from_match(&self, item: &Value) -> Option<RetrievedPassage> {
        let metadata = item.get("metadata")?;
        let text = metadata.get(&self.text_key).and_then(|v| v.as_str())?;
        Some(RetrievedPassage {
            id: item
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            text: text.to_string(),
            score: item.get("score").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32,
            source: metadata
                .get("source")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
        })
    }
}

#[async_trait]
impl PassageIndex for PineconeIndex {
    async fn similarity_search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RetrievedPassage>, ApiError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let vector = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Upstream("embedding response was empty".to_string()))?;

        let host = self.host().await?;
        let url = format!("{}/query", host);
        let mut body = json!({
            "vector": vector,
            "topK": limit,
            "includeMetadata": true,
            "includeValues": false,
        });
        if !self.namespace.is_empty() {
            if let Some(obj) = body.as_object_mut() {
                obj.insert("namespace".to_string(), json!(self.namespace));
            }
        }

        let res = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "index query failed ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        let matches = payload
            .get("matches")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let mut passages = Vec::with_capacity(matches.len().min(limit));
        for item in &matches {
            match self.passage_from_match(item) {
                Some(passage) => passages.push(passage),
                None => tracing::warn!(
                    "Skipping match without '{}' metadata: {}",
                    self.text_key,
                    item.get("id").and_then(|v| v.as_str()).unwrap_or("?")
                ),
            }
        }
        passages.truncate(limit);

        tracing::debug!("Index returned {} passage(s)", passages.len());
        Ok(passages)
    }

    fn describe(&self) -> String {
        if self.index_name.is_empty() {
            self.host.get().cloned().unwrap_or_default()
        } else {
            self.index_name.clone()
        }
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}
