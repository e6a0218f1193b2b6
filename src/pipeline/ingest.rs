//! Ingestion stage: video URL to indexed evidence.

use super::{PipelineState, StageOutcome};
use crate::error::Result;
use crate::source::{VideoDownloader, YoutubeSource};
use crate::video_indexer::{Evidence, IndexingService};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Downloads a video, indexes it and extracts evidence.
pub struct IngestionStage {
    source: YoutubeSource,
    downloader: Arc<dyn VideoDownloader>,
    indexer: Arc<dyn IndexingService>,
    temp_root: PathBuf,
}

impl IngestionStage {
    /// Create a stage that stages downloads under `temp_root`.
    pub fn new(
        downloader: Arc<dyn VideoDownloader>,
        indexer: Arc<dyn IndexingService>,
        temp_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source: YoutubeSource::new(),
            downloader,
            indexer,
            temp_root: temp_root.into(),
        }
    }

    /// Run the stage. Failures are returned as [`StageOutcome::Failed`], never raised.
    #[instrument(skip(self, state), fields(video_id = %state.video_id))]
    pub async fn run(&self, state: &PipelineState) -> StageOutcome<Evidence> {
        info!("[Indexer] Processing: {}", state.video_url);

        match self.ingest(&state.video_url, &state.video_id).await {
            Ok(evidence) if !evidence.has_transcript() => {
                warn!(
                    "Indexing produced no transcript ({} OCR lines); audit will be skipped",
                    evidence.ocr_text.len()
                );
                StageOutcome::Completed(evidence)
            }
            Ok(evidence) => {
                info!(
                    "Extracted {} transcript chars and {} OCR lines",
                    evidence.transcript.len(),
                    evidence.ocr_text.len()
                );
                StageOutcome::Completed(evidence)
            }
            Err(e) => {
                error!("Ingestion failed: {}", e);
                StageOutcome::Failed(e)
            }
        }
    }

    async fn ingest(&self, video_url: &str, video_id: &str) -> Result<Evidence> {
        self.source.validate(video_url)?;

        tokio::fs::create_dir_all(&self.temp_root).await?;
        let workspace = tempfile::Builder::new()
            .prefix("audit-")
            .tempdir_in(&self.temp_root)?;

        let result = self.process(video_url, video_id, workspace.path()).await;

        let workspace_path = workspace.path().to_path_buf();
        if let Err(e) = workspace.close() {
            warn!("Failed to remove {}: {}", workspace_path.display(), e);
        }

        result
    }

    async fn process(&self, video_url: &str, video_id: &str, workdir: &Path) -> Result<Evidence> {
        let local_path = self.downloader.download(video_url, workdir).await?;

        let job_id = self.indexer.submit(&local_path, video_id).await?;

        if let Err(e) = tokio::fs::remove_file(&local_path).await {
            warn!("Could not delete {} after upload: {}", local_path.display(), e);
        }

        let raw = self.indexer.await_completion(&job_id).await?;
        Ok(self.indexer.extract(&raw))
    }
}
