pub mod answer;
pub mod chat;
pub mod core;
pub mod llm;
pub mod normalizer;
pub mod rag;
pub mod retriever;
pub mod server;
pub mod session;
pub mod state;

#[cfg(test)]
mod test_support;
