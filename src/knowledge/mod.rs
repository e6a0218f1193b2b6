//! Knowledge base ingestion: policy PDFs into the vector store.
//!
//! Runs out of band from audits. Each PDF is split into overlapping chunks, embedded and
//! stored under its file name; re-ingesting a file replaces its earlier chunks.

mod pdf;
mod splitter;

pub use pdf::load_pdf_text;
pub use splitter::{RecursiveCharacterSplitter, DEFAULT_SEPARATORS};

use crate::embedding::Embedder;
use crate::error::{GuardianError, Result};
use crate::vector_store::{PolicyChunk, PolicyStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Outcome of ingesting a directory.
#[derive(Debug, Default, Clone)]
pub struct IngestReport {
    /// Sources indexed, with their chunk counts.
    pub indexed: Vec<(String, usize)>,
    /// Sources that could not be processed, with the reason.
    pub failed: Vec<(String, String)>,
}

impl IngestReport {
    pub fn total_chunks(&self) -> usize {
        self.indexed.iter().map(|(_, n)| n).sum()
    }
}

/// Loads policy documents into a [`PolicyStore`].
pub struct KnowledgeBaseIngestor {
    store: Arc<dyn PolicyStore>,
    embedder: Arc<dyn Embedder>,
    splitter: RecursiveCharacterSplitter,
}

impl KnowledgeBaseIngestor {
    pub fn new(
        store: Arc<dyn PolicyStore>,
        embedder: Arc<dyn Embedder>,
        splitter: RecursiveCharacterSplitter,
    ) -> Self {
        Self {
            store,
            embedder,
            splitter,
        }
    }

    /// List the PDFs directly inside `dir`, sorted by name.
    pub fn find_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(GuardianError::InvalidInput(format!(
                "Knowledge base directory not found: {}",
                dir.display()
            )));
        }

        let mut pdfs: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
            })
            .collect();
        pdfs.sort();
        Ok(pdfs)
    }

    /// Ingest every PDF in `dir`. Files that fail are reported and skipped.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub async fn ingest_dir(&self, dir: &Path) -> Result<IngestReport> {
        let pdfs = Self::find_pdfs(dir)?;
        if pdfs.is_empty() {
            warn!("No PDFs found in {}", dir.display());
        } else {
            info!("Found {} PDFs to process", pdfs.len());
        }

        let mut report = IngestReport::default();
        for path in pdfs {
            let source = source_name(&path);
            info!("Loading: {}", source);

            let loaded = {
                let path = path.clone();
                tokio::task::spawn_blocking(move || load_pdf_text(&path))
                    .await
                    .map_err(|e| GuardianError::Pdf(format!("PDF task failed: {}", e)))
                    .and_then(|r| r)
            };

            let text = match loaded {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to process {}: {}", source, e);
                    report.failed.push((source, e.to_string()));
                    continue;
                }
            };

            match self.ingest_text(&source, &text).await {
                Ok(0) => {
                    warn!("{} contains no extractable text", source);
                    report.failed.push((source, "no extractable text".to_string()));
                }
                Ok(count) => report.indexed.push((source, count)),
                Err(e) => {
                    warn!("Failed to index {}: {}", source, e);
                    report.failed.push((source, e.to_string()));
                }
            }
        }

        info!(
            "Indexing complete: {} chunks from {} document(s)",
            report.total_chunks(),
            report.indexed.len()
        );
        Ok(report)
    }

    /// Split, embed and store one document's text under `source`, replacing earlier chunks.
    pub async fn ingest_text(&self, source: &str, text: &str) -> Result<usize> {
        let pieces = self.splitter.split(text);
        if pieces.is_empty() {
            return Ok(0);
        }

        let embeddings = self.embedder.embed_documents(&pieces).await?;
        if embeddings.len() != pieces.len() {
            return Err(GuardianError::Embedding(format!(
                "Expected {} embeddings, got {}",
                pieces.len(),
                embeddings.len()
            )));
        }

        let chunks: Vec<PolicyChunk> = pieces
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(order, (content, embedding))| {
                PolicyChunk::new(source.to_string(), content, order as i32, embedding)
            })
            .collect();

        let stored = self.store.replace_source(source, &chunks).await?;
        info!("Split {} into {} chunks", source, stored);
        Ok(stored)
    }
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::MemoryPolicyStore;
    use async_trait::async_trait;
    use tokio_test::{assert_err, assert_ok};

    struct LengthEmbedder;

    #[async_trait]
    impl Embedder for LengthEmbedder {
        async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }

        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    fn ingestor(store: Arc<MemoryPolicyStore>) -> KnowledgeBaseIngestor {
        KnowledgeBaseIngestor::new(
            store,
            Arc::new(LengthEmbedder),
            RecursiveCharacterSplitter::new(40, 10).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_ingest_text_replaces_source() {
        let store = Arc::new(MemoryPolicyStore::new());
        let kb = ingestor(store.clone());

        let text = "Claims about health must be backed by evidence.\n\nPrices must include tax.";
        let first = assert_ok!(kb.ingest_text("guidelines.pdf", text).await);
        assert!(first >= 2);
        assert_eq!(store.chunk_count().await.unwrap(), first);

        let second = assert_ok!(kb.ingest_text("guidelines.pdf", "Short replacement.").await);
        assert_eq!(second, 1);
        assert_eq!(store.chunk_count().await.unwrap(), 1);

        let sources = store.list_sources().await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].source, "guidelines.pdf");
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
            Err(GuardianError::Embedding("rate limited".into()))
        }

        async fn embed_documents(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(GuardianError::Embedding("rate limited".into()))
        }
    }

    #[tokio::test]
    async fn test_failed_reingest_keeps_previous_chunks() {
        let store = Arc::new(MemoryPolicyStore::new());
        let first = assert_ok!(
            ingestor(store.clone())
                .ingest_text("guidelines.pdf", "Prices must include tax.")
                .await
        );

        let failing = KnowledgeBaseIngestor::new(
            store.clone(),
            Arc::new(FailingEmbedder),
            RecursiveCharacterSplitter::new(40, 10).unwrap(),
        );
        assert_err!(failing.ingest_text("guidelines.pdf", "Replacement text.").await);

        assert_eq!(store.chunk_count().await.unwrap(), first);
        let results = store.search(&[24.0, 1.0], 1).await.unwrap();
        assert_eq!(results[0].chunk.content, "Prices must include tax.");
    }

    #[tokio::test]
    async fn test_empty_text_stores_nothing() {
        let store = Arc::new(MemoryPolicyStore::new());
        assert_eq!(ingestor(store.clone()).ingest_text("empty.pdf", "  \n ").await.unwrap(), 0);
        assert_eq!(store.chunk_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ingest_dir_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.pdf"), b"not a pdf").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let store = Arc::new(MemoryPolicyStore::new());
        let report = ingestor(store.clone()).ingest_dir(dir.path()).await.unwrap();

        assert!(report.indexed.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "broken.pdf");
        assert_eq!(store.chunk_count().await.unwrap(), 0);
    }

    #[test]
    fn test_find_pdfs() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.PDF", "c.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let names: Vec<String> = KnowledgeBaseIngestor::find_pdfs(dir.path())
            .unwrap()
            .iter()
            .map(|p| source_name(p))
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);

        assert_err!(KnowledgeBaseIngestor::find_pdfs(Path::new("/nonexistent/kb")));
    }
}
