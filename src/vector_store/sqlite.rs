//! SQLite-based policy store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust. Knowledge bases of policy
//! documents are small enough that a full scan per query is fine.

use super::{check_source, rank, IndexedSource, PolicyChunk, PolicyStore, SearchResult};
use crate::error::{GuardianError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS policy_chunks (
        id TEXT PRIMARY KEY,
        source TEXT NOT NULL,
        content TEXT NOT NULL,
        chunk_order INTEGER NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_policy_chunks_source ON policy_chunks(source);
"#;

/// SQLite-based policy store.
pub struct SqlitePolicyStore {
    conn: Mutex<Connection>,
}

impl SqlitePolicyStore {
    /// Open (or create) a SQLite policy store.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite policy store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite policy store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| GuardianError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn insert_chunk(tx: &Transaction<'_>, chunk: &PolicyChunk) -> Result<()> {
        tx.execute(
            r#"
            INSERT OR REPLACE INTO policy_chunks
            (id, source, content, chunk_order, embedding, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                chunk.id.to_string(),
                chunk.source,
                chunk.content,
                chunk.chunk_order,
                Self::embedding_to_bytes(&chunk.embedding),
                chunk.indexed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn parse_timestamp(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }
}

#[async_trait]
impl PolicyStore for SqlitePolicyStore {
    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    async fn upsert_batch(&self, chunks: &[PolicyChunk]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for chunk in chunks {
            Self::insert_chunk(&tx, chunk)?;
        }

        tx.commit()?;
        info!("Batch upserted {} policy chunks", chunks.len());
        Ok(chunks.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, source, content, chunk_order, embedding, indexed_at FROM policy_chunks",
        )?;

        let rows = stmt.query_map([], |row| {
            let id_str: String = row.get(0)?;
            let embedding_bytes: Vec<u8> = row.get(4)?;
            let indexed_at_str: String = row.get(5)?;

            Ok(PolicyChunk {
                id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
                source: row.get(1)?,
                content: row.get(2)?,
                chunk_order: row.get(3)?,
                embedding: Self::bytes_to_embedding(&embedding_bytes),
                indexed_at: Self::parse_timestamp(&indexed_at_str),
            })
        })?;

        let chunks: Vec<PolicyChunk> = rows.filter_map(|r| r.ok()).collect();
        let results = rank(chunks, query_embedding, limit);

        debug!("Found {} matching policy chunks", results.len());
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn delete_by_source(&self, source: &str) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM policy_chunks WHERE source = ?1",
            params![source],
        )?;

        info!("Deleted {} chunks for source {}", deleted, source);
        Ok(deleted)
    }

    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    async fn replace_source(&self, source: &str, chunks: &[PolicyChunk]) -> Result<usize> {
        let conn = self.lock()?;
        // Dropping the transaction on any error rolls the delete back.
        let tx = conn.unchecked_transaction()?;

        let deleted = tx.execute(
            "DELETE FROM policy_chunks WHERE source = ?1",
            params![source],
        )?;
        for chunk in chunks {
            check_source(source, chunk)?;
            Self::insert_chunk(&tx, chunk)?;
        }

        tx.commit()?;
        info!(
            "Replaced {} chunks for source {} with {}",
            deleted,
            source,
            chunks.len()
        );
        Ok(chunks.len())
    }

    #[instrument(skip(self))]
    async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT source, COUNT(*) as chunk_count, MAX(indexed_at) as indexed_at
            FROM policy_chunks
            GROUP BY source
            ORDER BY source
            "#,
        )?;

        let sources = stmt.query_map([], |row| {
            let indexed_at_str: String = row.get(2)?;
            Ok(IndexedSource {
                source: row.get(0)?,
                chunk_count: row.get(1)?,
                indexed_at: Self::parse_timestamp(&indexed_at_str),
            })
        })?;

        Ok(sources.filter_map(|s| s.ok()).collect())
    }

    async fn chunk_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM policy_chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_roundtrip_bytes() {
        let embedding = vec![0.25_f32, -1.5, 3.0];
        let bytes = SqlitePolicyStore::embedding_to_bytes(&embedding);
        assert_eq!(bytes.len(), 12);
        assert_eq!(SqlitePolicyStore::bytes_to_embedding(&bytes), embedding);
    }

    #[tokio::test]
    async fn test_sqlite_search_and_replace_source() {
        let store = SqlitePolicyStore::in_memory().unwrap();

        let chunks = vec![
            PolicyChunk::new("fda.pdf".into(), "No unverified cure claims".into(), 0, vec![1.0, 0.0]),
            PolicyChunk::new("fda.pdf".into(), "Side effects must be listed".into(), 1, vec![0.7, 0.7]),
            PolicyChunk::new("ftc.pdf".into(), "Disclose paid endorsements".into(), 0, vec![0.0, 1.0]),
        ];
        assert_eq!(store.upsert_batch(&chunks).await.unwrap(), 3);

        let results = store.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.content, "No unverified cure claims");
        assert_eq!(results[0].chunk.embedding, vec![1.0, 0.0]);

        let sources = store.list_sources().await.unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].source, "fda.pdf");
        assert_eq!(sources[0].chunk_count, 2);

        assert_eq!(store.delete_by_source("fda.pdf").await.unwrap(), 2);
        assert_eq!(store.chunk_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sqlite_replace_source_is_atomic() {
        let store = SqlitePolicyStore::in_memory().unwrap();
        let original = vec![
            PolicyChunk::new("fda.pdf".into(), "No cure claims".into(), 0, vec![1.0, 0.0]),
            PolicyChunk::new("fda.pdf".into(), "List side effects".into(), 1, vec![0.0, 1.0]),
        ];
        store.upsert_batch(&original).await.unwrap();

        // The second chunk fails validation after the delete has already run.
        let broken = vec![
            PolicyChunk::new("fda.pdf".into(), "New rule".into(), 0, vec![1.0, 0.0]),
            PolicyChunk::new("ftc.pdf".into(), "Wrong source".into(), 1, vec![1.0, 0.0]),
        ];
        assert!(matches!(
            store.replace_source("fda.pdf", &broken).await,
            Err(GuardianError::VectorStore(_))
        ));
        assert_eq!(store.chunk_count().await.unwrap(), 2);
        let kept: Vec<String> = store
            .search(&[1.0, 0.0], 5)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.chunk.content)
            .collect();
        assert!(kept.contains(&"No cure claims".to_string()));
        assert!(!kept.contains(&"New rule".to_string()));

        let update = vec![PolicyChunk::new("fda.pdf".into(), "New rule".into(), 0, vec![1.0, 0.0])];
        assert_eq!(store.replace_source("fda.pdf", &update).await.unwrap(), 1);
        let sources = store.list_sources().await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].chunk_count, 1);
    }

    #[tokio::test]
    async fn test_sqlite_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("policies.db");

        {
            let store = SqlitePolicyStore::new(&path).unwrap();
            store
                .upsert_batch(&[PolicyChunk::new("a.pdf".into(), "rule".into(), 0, vec![1.0])])
                .await
                .unwrap();
        }

        let reopened = SqlitePolicyStore::new(&path).unwrap();
        assert_eq!(reopened.chunk_count().await.unwrap(), 1);
    }
}
