//! Statute retrieval backends.
//!
//! - `PassageIndex`: query interface over an existing vector index
//! - `PineconeIndex`: hosted implementation (embedding + `topK` query)

mod pinecone;
mod store;

pub use pinecone::PineconeIndex;
pub use store::{PassageIndex, RetrievedPassage};
