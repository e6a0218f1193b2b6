//! Video source handling: URL validation and download.

mod downloader;
mod youtube;

pub use downloader::YtDlpDownloader;
pub use youtube::YoutubeSource;

use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Platform tag recorded in evidence metadata.
pub const PLATFORM: &str = "youtube";

/// Trait for fetching a source video to local disk.
#[async_trait]
pub trait VideoDownloader: Send + Sync {
    /// Download the video at `url` into `output_dir`, returning the file path.
    async fn download(&self, url: &str, output_dir: &Path) -> Result<PathBuf>;
}
