//! Policy retrieval over the vector store.

use super::{PolicyPassage, RuleRetriever};
use crate::embedding::Embedder;
use crate::error::{GuardianError, Result};
use crate::vector_store::PolicyStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Retrieves policy passages by embedding similarity.
pub struct PolicyRetriever {
    store: Arc<dyn PolicyStore>,
    embedder: Arc<dyn Embedder>,
}

impl PolicyRetriever {
    /// Create a new retriever.
    pub fn new(store: Arc<dyn PolicyStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }
}

#[async_trait]
impl RuleRetriever for PolicyRetriever {
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<PolicyPassage>> {
        let query_embedding = self
            .embedder
            .embed_query(query)
            .await
            .map_err(|e| GuardianError::Retrieval(e.to_string()))?;

        let results = self
            .store
            .search(&query_embedding, k)
            .await
            .map_err(|e| GuardianError::Retrieval(e.to_string()))?;

        debug!("Retrieved {} policy passages", results.len());
        Ok(results.into_iter().map(PolicyPassage::from).collect())
    }
}

/// Join passages into the rules block of the audit prompt.
pub fn format_rules_for_prompt(passages: &[PolicyPassage]) -> String {
    passages
        .iter()
        .map(|p| p.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
