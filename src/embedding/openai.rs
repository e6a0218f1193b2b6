//! OpenAI embeddings.

use super::Embedder;
use crate::config::EmbeddingSettings;
use crate::error::{GuardianError, Result};
use crate::openai::{create_client, EMBEDDING_TIMEOUT};
use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_openai::Client;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Maximum inputs per embeddings request.
const MAX_INPUTS_PER_REQUEST: usize = 100;

/// Embeds text with an OpenAI embedding model.
pub struct OpenAIEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    dimensions: u32,
}

impl OpenAIEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        if settings.dimensions == 0 {
            return Err(GuardianError::Config(
                "embedding.dimensions must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            client: create_client(EMBEDDING_TIMEOUT)?,
            model: settings.model.clone(),
            dimensions: settings.dimensions,
        })
    }

    async fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(inputs.to_vec()))
            .dimensions(self.dimensions)
            .build()
            .map_err(|e| GuardianError::Embedding(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| GuardianError::OpenAI(format!("Embedding API error: {}", e)))?;

        let mut data = response.data;
        data.sort_by_key(|e| e.index);

        if data.len() != inputs.len() {
            return Err(GuardianError::Embedding(format!(
                "Requested {} embeddings, received {}",
                inputs.len(),
                data.len()
            )));
        }

        data.into_iter()
            .map(|e| self.check_dimensions(e.embedding))
            .collect()
    }

    /// Reject vectors whose width differs from the configured dimensions.
    fn check_dimensions(&self, embedding: Vec<f32>) -> Result<Vec<f32>> {
        if embedding.len() != self.dimensions as usize {
            return Err(GuardianError::Embedding(format!(
                "Model {} returned {} dimensions, expected {}",
                self.model,
                embedding.len(),
                self.dimensions
            )));
        }
        Ok(embedding)
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text), fields(model = %self.model))]
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.request(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| GuardianError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(model = %self.model, count = texts.len()))]
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_INPUTS_PER_REQUEST) {
            embeddings.extend(self.request(batch).await?);
            debug!("Embedded {}/{} chunks", embeddings.len(), texts.len());
        }
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_dimensions() {
        let settings = EmbeddingSettings {
            dimensions: 0,
            ..Default::default()
        };
        assert!(matches!(
            OpenAIEmbedder::new(&settings),
            Err(GuardianError::Config(_))
        ));
    }

    #[test]
    fn test_dimension_check() {
        let embedder = OpenAIEmbedder::new(&EmbeddingSettings {
            model: "text-embedding-3-small".into(),
            dimensions: 3,
        })
        .unwrap();

        assert_eq!(embedder.check_dimensions(vec![0.1, 0.2, 0.3]).unwrap().len(), 3);
        assert!(embedder.check_dimensions(vec![0.1; 1536]).is_err());
    }

    #[tokio::test]
    async fn test_no_documents_makes_no_request() {
        let embedder = OpenAIEmbedder::new(&EmbeddingSettings::default()).unwrap();
        assert!(embedder.embed_documents(&[]).await.unwrap().is_empty());
    }
}
