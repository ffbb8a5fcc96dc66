//! PassageIndex trait: query interface over the statute vector index.
//!
//! The index is populated out of band; this crate only queries it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// A statute passage returned by the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    /// Identifier assigned by the index.
    pub id: String,
    /// The passage text.
    pub text: String,
    /// Similarity score as reported by the index (higher = better).
    pub score: f32,
    /// Optional source label from the passage metadata.
    pub source: Option<String>,
}

#[async_trait]
pub trait PassageIndex: Send + Sync {
    /// Returns at most `limit` passages nearest to `query`, in index order.
    async fn similarity_search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RetrievedPassage>, ApiError>;

    /// Human-readable name for status output.
    fn describe(&self) -> String;
}
