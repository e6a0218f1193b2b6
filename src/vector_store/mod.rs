//! Policy vector store for Brand Guardian.
//!
//! Provides a trait-based interface for different vector database backends holding
//! chunked compliance documents.

mod memory;
mod sqlite;

pub use memory::MemoryPolicyStore;
pub use sqlite::SqlitePolicyStore;

use crate::error::{GuardianError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A chunk of a policy document stored in the vector database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyChunk {
    /// Unique chunk ID.
    pub id: Uuid,
    /// Source document file name.
    pub source: String,
    /// Text content of this chunk.
    pub content: String,
    /// Order of this chunk within its source.
    pub chunk_order: i32,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// When this chunk was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl PolicyChunk {
    /// Create a new policy chunk.
    pub fn new(source: String, content: String, chunk_order: i32, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            content,
            chunk_order,
            embedding,
            indexed_at: Utc::now(),
        }
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched chunk.
    pub chunk: PolicyChunk,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Summary information about an indexed policy document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedSource {
    /// Source file name.
    pub source: String,
    /// Number of indexed chunks.
    pub chunk_count: u32,
    /// When the source was last indexed.
    pub indexed_at: DateTime<Utc>,
}

/// Trait for policy store implementations.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Bulk upsert chunks.
    async fn upsert_batch(&self, chunks: &[PolicyChunk]) -> Result<usize>;

    /// Search for the `limit` most similar chunks.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>>;

    /// Delete all chunks of a source document.
    async fn delete_by_source(&self, source: &str) -> Result<usize>;

    /// Swap a source's chunks for `chunks` in one step. On error the earlier chunks remain.
    async fn replace_source(&self, source: &str, chunks: &[PolicyChunk]) -> Result<usize>;

    /// List all indexed source documents.
    async fn list_sources(&self) -> Result<Vec<IndexedSource>>;

    /// Get total chunk count.
    async fn chunk_count(&self) -> Result<usize>;
}

/// Every chunk handed to `replace_source` must belong to that source.
pub(crate) fn check_source(source: &str, chunk: &PolicyChunk) -> Result<()> {
    if chunk.source != source {
        return Err(GuardianError::VectorStore(format!(
            "Chunk {} belongs to {}, not {}",
            chunk.id, chunk.source, source
        )));
    }
    Ok(())
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Score, sort descending and truncate.
pub(crate) fn rank<I>(chunks: I, query_embedding: &[f32], limit: usize) -> Vec<SearchResult>
where
    I: IntoIterator<Item = PolicyChunk>,
{
    let mut results: Vec<SearchResult> = chunks
        .into_iter()
        .map(|chunk| {
            let score = cosine_similarity(query_embedding, &chunk.embedding);
            SearchResult { chunk, score }
        })
        .collect();

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(limit);
    results
}
