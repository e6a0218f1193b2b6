//! In-memory policy store implementation.
//!
//! Useful for testing and small knowledge bases.

use super::{check_source, rank, IndexedSource, PolicyChunk, PolicyStore, SearchResult};
use crate::error::{GuardianError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory policy store.
pub struct MemoryPolicyStore {
    chunks: RwLock<HashMap<String, PolicyChunk>>,
}

impl MemoryPolicyStore {
    /// Create a new in-memory policy store.
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, PolicyChunk>>> {
        self.chunks
            .read()
            .map_err(|e| GuardianError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, PolicyChunk>>> {
        self.chunks
            .write()
            .map_err(|e| GuardianError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

impl Default for MemoryPolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PolicyStore for MemoryPolicyStore {
    async fn upsert_batch(&self, chunks: &[PolicyChunk]) -> Result<usize> {
        let mut store = self.write()?;
        for chunk in chunks {
            store.insert(chunk.id.to_string(), chunk.clone());
        }
        Ok(chunks.len())
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        let chunks = self.read()?;
        Ok(rank(chunks.values().cloned(), query_embedding, limit))
    }

    async fn delete_by_source(&self, source: &str) -> Result<usize> {
        let mut chunks = self.write()?;
        let initial_len = chunks.len();
        chunks.retain(|_, c| c.source != source);
        Ok(initial_len - chunks.len())
    }

    async fn replace_source(&self, source: &str, chunks: &[PolicyChunk]) -> Result<usize> {
        for chunk in chunks {
            check_source(source, chunk)?;
        }

        let mut store = self.write()?;
        store.retain(|_, c| c.source != source);
        for chunk in chunks {
            store.insert(chunk.id.to_string(), chunk.clone());
        }
        Ok(chunks.len())
    }

    async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        let chunks = self.read()?;

        let mut sources: HashMap<String, IndexedSource> = HashMap::new();
        for chunk in chunks.values() {
            let entry = sources
                .entry(chunk.source.clone())
                .or_insert_with(|| IndexedSource {
                    source: chunk.source.clone(),
                    chunk_count: 0,
                    indexed_at: chunk.indexed_at,
                });

            entry.chunk_count += 1;
            if chunk.indexed_at > entry.indexed_at {
                entry.indexed_at = chunk.indexed_at;
            }
        }

        let mut list: Vec<IndexedSource> = sources.into_values().collect();
        list.sort_by(|a, b| a.source.cmp(&b.source));
        Ok(list)
    }

    async fn chunk_count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_policy_store() {
        let store = MemoryPolicyStore::new();

        let claims = PolicyChunk::new(
            "health.pdf".to_string(),
            "Medical claims must be substantiated".to_string(),
            0,
            vec![1.0, 0.0, 0.0],
        );
        let disclosure = PolicyChunk::new(
            "ads.pdf".to_string(),
            "Sponsored content must be disclosed".to_string(),
            0,
            vec![0.0, 1.0, 0.0],
        );

        store.upsert_batch(&[claims, disclosure]).await.unwrap();
        assert_eq!(store.chunk_count().await.unwrap(), 2);

        let results = store.search(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.source, "health.pdf");
        assert!(results[0].score > results[1].score);

        let sources = store.list_sources().await.unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].source, "ads.pdf");

        assert_eq!(store.delete_by_source("ads.pdf").await.unwrap(), 1);
        assert_eq!(store.chunk_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_replace_source_rejects_foreign_chunks() {
        let store = MemoryPolicyStore::new();
        let original = PolicyChunk::new("ads.pdf".into(), "Disclose sponsors".into(), 0, vec![1.0]);
        store.upsert_batch(&[original]).await.unwrap();

        let foreign = PolicyChunk::new("other.pdf".into(), "x".into(), 0, vec![1.0]);
        assert!(store.replace_source("ads.pdf", &[foreign]).await.is_err());
        assert_eq!(store.list_sources().await.unwrap()[0].source, "ads.pdf");

        let update = PolicyChunk::new("ads.pdf".into(), "Label ads".into(), 0, vec![1.0]);
        assert_eq!(store.replace_source("ads.pdf", &[update]).await.unwrap(), 1);
        let results = store.search(&[1.0], 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.content, "Label ads");
    }
}
