//! Sources command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::{PolicyStore, SqlitePolicyStore};
use anyhow::Result;

/// Run the sources command.
pub async fn run_sources(settings: Settings) -> Result<()> {
    preflight::check(Operation::Sources, &settings)?;

    let store = SqlitePolicyStore::new(&settings.sqlite_path())?;

    match store.list_sources().await {
        Ok(sources) => {
            if sources.is_empty() {
                Output::info(
                    "No policy documents indexed yet. Use 'brand-guardian ingest' to add PDFs.",
                );
            } else {
                Output::header(&format!("Policy Documents ({})", sources.len()));
                println!();

                for source in &sources {
                    Output::source_info(
                        &source.source,
                        source.chunk_count,
                        &source.indexed_at.format("%Y-%m-%d %H:%M").to_string(),
                    );
                }

                let total_chunks: u32 = sources.iter().map(|s| s.chunk_count).sum();
                println!();
                Output::kv("Total documents", &sources.len().to_string());
                Output::kv("Total chunks", &total_chunks.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list sources: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
