//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::knowledge::{KnowledgeBaseIngestor, RecursiveCharacterSplitter};
use crate::vector_store::{PolicyStore, SqlitePolicyStore};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// Run the ingest command.
pub async fn run_ingest(dir: Option<String>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'brand-guardian doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let dir = dir
        .map(|d| Settings::expand_path(&d))
        .unwrap_or_else(|| settings.knowledge_base_dir());
    let pdfs = KnowledgeBaseIngestor::find_pdfs(&dir)?;
    if pdfs.is_empty() {
        Output::warning(&format!("No PDFs found in {}. Please add files.", dir.display()));
        return Ok(());
    }

    Output::info(&format!("Found {} PDFs to process:", pdfs.len()));
    for name in file_names(&pdfs) {
        Output::list_item(&name);
    }

    let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::new(&settings.embedding)?);
    let store: Arc<dyn PolicyStore> = Arc::new(SqlitePolicyStore::new(&settings.sqlite_path())?);
    let splitter = RecursiveCharacterSplitter::new(
        settings.knowledge_base.chunk_size,
        settings.knowledge_base.chunk_overlap,
    )?;
    let ingestor = KnowledgeBaseIngestor::new(store.clone(), embedder, splitter);

    let spinner = Output::spinner("Splitting and embedding documents...");
    let report = ingestor.ingest_dir(&dir).await;
    spinner.finish_and_clear();
    let report = report?;

    for (source, chunks) in &report.indexed {
        Output::success(&format!("{}: {} chunks", source, chunks));
    }
    for (source, reason) in &report.failed {
        Output::warning(&format!("{}: {}", source, reason));
    }

    if report.indexed.is_empty() {
        Output::warning("No documents were processed.");
    } else {
        Output::success(&format!(
            "Indexing complete. Knowledge base holds {} chunks ({} added).",
            store.chunk_count().await?,
            report.total_chunks()
        ));
    }

    Ok(())
}

fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect()
}
