//! In-process fakes for the pipeline's external services.

use crate::config::TranscriptSources;
use crate::error::{GuardianError, Result};
use crate::rag::{ChatModel, PolicyPassage, RuleRetriever};
use crate::source::VideoDownloader;
use crate::video_indexer::{extract, Evidence, IndexingService};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Writes a placeholder video file and records where.
#[derive(Default)]
pub struct FakeDownloader {
    pub calls: AtomicUsize,
    pub last_path: Mutex<Option<PathBuf>>,
    pub fail: bool,
}

impl FakeDownloader {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn downloaded_path(&self) -> Option<PathBuf> {
        self.last_path.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoDownloader for FakeDownloader {
    async fn download(&self, _url: &str, output_dir: &Path) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let path = output_dir.join("source_video.mp4");
        tokio::fs::write(&path, b"not really a video").await?;
        *self.last_path.lock().unwrap() = Some(path.clone());
        if self.fail {
            return Err(GuardianError::Download("yt-dlp failed: HTTP Error 403".into()));
        }
        Ok(path)
    }
}

/// How the fake indexer ends a job.
pub enum IndexOutcome {
    Processed(Value),
    Failed,
    Quarantined,
    UploadRejected,
}

pub struct FakeIndexer {
    pub outcome: IndexOutcome,
    pub submits: AtomicUsize,
    pub waits: AtomicUsize,
}

impl FakeIndexer {
    pub fn new(outcome: IndexOutcome) -> Self {
        Self {
            outcome,
            submits: AtomicUsize::new(0),
            waits: AtomicUsize::new(0),
        }
    }

    /// An indexer that returns the given transcript segments and OCR lines.
    pub fn processed(transcript: &[&str], ocr: &[&str]) -> Self {
        let transcript: Vec<Value> = transcript.iter().map(|t| json!({ "text": t })).collect();
        let ocr: Vec<Value> = ocr.iter().map(|t| json!({ "text": t })).collect();
        Self::new(IndexOutcome::Processed(json!({
            "id": "job-1",
            "state": "Processed",
            "summarizedInsights": { "duration": { "seconds": 30.0 } },
            "videos": [{ "insights": { "transcript": transcript, "ocr": ocr } }]
        })))
    }

    pub fn submits(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn waits(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndexingService for FakeIndexer {
    async fn submit(&self, path: &Path, _name: &str) -> Result<String> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        if !path.exists() {
            return Err(GuardianError::Upload(format!("{} missing", path.display())));
        }
        match self.outcome {
            IndexOutcome::UploadRejected => Err(GuardianError::Upload(
                "401 Unauthorized: {\"ErrorType\":\"USER_NOT_ALLOWED\"}".into(),
            )),
            _ => Ok("job-1".to_string()),
        }
    }

    async fn await_completion(&self, job_id: &str) -> Result<Value> {
        self.waits.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            IndexOutcome::Processed(payload) => Ok(payload.clone()),
            IndexOutcome::Failed => Err(GuardianError::Indexing(format!(
                "Video Indexing Failed in Azure (job {})",
                job_id
            ))),
            IndexOutcome::Quarantined => Err(GuardianError::ContentPolicy(format!(
                "job {} reported state Quarantined",
                job_id
            ))),
            IndexOutcome::UploadRejected => Err(GuardianError::Indexing("no job".into())),
        }
    }

    fn extract(&self, raw: &Value) -> Evidence {
        extract(raw, TranscriptSources::Primary)
    }
}

/// Returns fixed passages.
#[derive(Default)]
pub struct FakeRetriever {
    pub passages: Vec<PolicyPassage>,
    pub calls: AtomicUsize,
    pub fail: bool,
    pub last_query: Mutex<Option<String>>,
}

impl FakeRetriever {
    pub fn with_rules(rules: &[&str]) -> Self {
        Self {
            passages: rules
                .iter()
                .map(|r| PolicyPassage {
                    source: "rules.pdf".to_string(),
                    content: r.to_string(),
                    score: 0.9,
                })
                .collect(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RuleRetriever for FakeRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<PolicyPassage>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query.to_string());
        if self.fail {
            return Err(GuardianError::Retrieval("vector store unavailable".into()));
        }
        Ok(self.passages.iter().take(k).cloned().collect())
    }
}

/// Replies with a fixed response and records the prompts it saw.
pub struct FakeModel {
    pub response: std::result::Result<String, String>,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<(String, String)>>,
}

impl FakeModel {
    pub fn replying(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn erroring(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for FakeModel {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap()
            .push((system.to_string(), user.to_string()));
        self.response.clone().map_err(GuardianError::OpenAI)
    }
}
