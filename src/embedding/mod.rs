//! Embeddings for policy chunks and audit queries.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::error::Result;
use async_trait::async_trait;

/// Turns policy text and audit queries into vectors in the same space.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a retrieval query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed policy chunks. Output order matches input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
