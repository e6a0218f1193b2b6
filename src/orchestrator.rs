//! Pipeline orchestrator for Brand Guardian.
//!
//! Runs one audit as a fixed sequence: START, Ingesting, Auditing, DONE. Each stage's
//! outcome is merged into the running [`PipelineState`]; the orchestrator never branches
//! on state contents and never returns an error.

use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::Result;
use crate::pipeline::{ComplianceAuditor, IngestionStage, PipelineState, StateUpdate};
use crate::rag::{OpenAIChatModel, PolicyRetriever};
use crate::source::YtDlpDownloader;
use crate::vector_store::{PolicyStore, SqlitePolicyStore};
use crate::video_indexer::{credential_from_settings, VideoIndexerClient};
use std::sync::Arc;
use tracing::{info, instrument};

/// The main orchestrator for the audit pipeline.
pub struct Orchestrator {
    ingestion: IngestionStage,
    auditor: ComplianceAuditor,
}

impl Orchestrator {
    /// Create an orchestrator backed by Video Indexer, OpenAI and the local policy store.
    pub fn new(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let credential = credential_from_settings(&settings.credentials, reqwest::Client::new())?;
        let indexer = Arc::new(VideoIndexerClient::new(&settings.video_indexer, credential)?);
        let downloader = Arc::new(YtDlpDownloader::new());

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::new(&settings.embedding)?);
        let store: Arc<dyn PolicyStore> = Arc::new(SqlitePolicyStore::new(&settings.sqlite_path())?);
        let retriever = Arc::new(PolicyRetriever::new(store, embedder));
        let model = Arc::new(OpenAIChatModel::new(
            &settings.audit.model,
            settings.audit.temperature,
        )?);

        info!(
            "Auditing with {} (top {} rules, indexer account {})",
            settings.audit.model, settings.audit.top_k, settings.video_indexer.account_name
        );

        let ingestion = IngestionStage::new(downloader, indexer, settings.temp_dir());
        let auditor = ComplianceAuditor::new(retriever, model)
            .with_prompts(prompts)
            .with_top_k(settings.audit.top_k);

        Ok(Self::with_components(ingestion, auditor))
    }

    /// Create an orchestrator from pre-built stages.
    pub fn with_components(ingestion: IngestionStage, auditor: ComplianceAuditor) -> Self {
        Self { ingestion, auditor }
    }

    /// Run a full audit and return the terminal state.
    #[instrument(skip(self), fields(video_id = %video_id))]
    pub async fn run(&self, video_url: &str, video_id: &str) -> PipelineState {
        let mut state = PipelineState::new(video_url, video_id);
        info!("Starting audit of {}", video_url);

        info!("Stage: ingesting");
        let update: StateUpdate = self.ingestion.run(&state).await.into();
        state.merge(update);

        info!("Stage: auditing");
        let update: StateUpdate = self.auditor.run(&state).await.into();
        state.merge(update);

        state.finalize();
        info!(
            "Audit complete: {} ({} finding(s), {} error(s))",
            state.status(),
            state.compliance_findings.len(),
            state.errors.len()
        );
        state
    }
}
