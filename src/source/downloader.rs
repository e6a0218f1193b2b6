//! Video download using yt-dlp.

use super::VideoDownloader;
use crate::error::{GuardianError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{info, instrument};

/// Downloads videos with the `yt-dlp` command-line tool.
pub struct YtDlpDownloader {
    binary: String,
    format: String,
}

impl YtDlpDownloader {
    /// Create a downloader that fetches the best single-file MP4.
    pub fn new() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            format: "best[ext=mp4]".to_string(),
        }
    }

    /// Use a different yt-dlp binary path.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

impl Default for YtDlpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoDownloader for YtDlpDownloader {
    #[instrument(skip(self, output_dir), fields(url = %url))]
    async fn download(&self, url: &str, output_dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(output_dir).await?;

        let target_path = output_dir.join("source_video.mp4");
        info!("Downloading video from {}", url);

        let result = Command::new(&self.binary)
            .arg("--format").arg(&self.format)
            .arg("--output").arg(&target_path)
            .arg("--force-overwrites")
            .arg("--no-playlist")
            .arg("--quiet")
            .arg("--no-warnings")
            .arg(url)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GuardianError::ToolNotFound(self.binary.clone()));
            }
            Err(e) => {
                return Err(GuardianError::Download(format!("yt-dlp execution failed: {e}")));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GuardianError::Download(format!("yt-dlp failed: {}", stderr.trim())));
        }

        if !target_path.exists() {
            return Err(GuardianError::Download(
                "Video file not found after download".into(),
            ));
        }

        info!("Download completed");
        Ok(target_path)
    }
}
