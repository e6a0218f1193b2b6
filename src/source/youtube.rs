//! YouTube URL validation.

use crate::error::{GuardianError, Result};
use regex::Regex;

/// Validates YouTube video URLs and extracts their video IDs.
pub struct YoutubeSource {
    video_url_regex: Regex,
}

impl YoutubeSource {
    pub fn new() -> Self {
        // Only full video URLs are accepted; bare IDs and playlists are not auditable inputs
        let video_url_regex = Regex::new(concat!(
            r"^\s*(?:https?://)?(?:www\.|m\.)?",
            r"(?:youtube\.com/(?:watch\?(?:.*&)?v=|embed/|v/|shorts/)|youtu\.be/)",
            r"([a-zA-Z0-9_-]{11})",
            r"(?:[?&#/].*)?\s*$",
        ))
        .expect("Invalid regex");

        Self { video_url_regex }
    }

    /// Extract the video ID from a supported YouTube URL.
    pub fn extract_video_id(&self, url: &str) -> Option<String> {
        self.video_url_regex
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Check whether a URL is a supported YouTube video URL.
    pub fn can_handle(&self, url: &str) -> bool {
        self.extract_video_id(url).is_some()
    }

    /// Validate a URL, returning its video ID.
    pub fn validate(&self, url: &str) -> Result<String> {
        self.extract_video_id(url).ok_or_else(|| {
            GuardianError::InvalidInput(format!(
                "Unsupported video URL '{}'. Please provide a valid YouTube video URL.",
                url
            ))
        })
    }
}

impl Default for YoutubeSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_video_id() {
        let source = YoutubeSource::new();

        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?v=dQw4w9WgXcQ&t=42s",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?si=abc",
            "https://youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
            "youtube.com/watch?v=dQw4w9WgXcQ",
        ] {
            assert_eq!(
                source.extract_video_id(url),
                Some("dQw4w9WgXcQ".to_string()),
                "{}",
                url
            );
        }
    }

    #[test]
    fn test_rejects_unsupported_urls() {
        let source = YoutubeSource::new();

        for url in [
            "",
            "dQw4w9WgXcQ",
            "https://vimeo.com/123456789",
            "https://example.com/watch?v=dQw4w9WgXcQ",
            "https://notyoutube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/playlist?list=PLtest",
            "/path/to/video.mp4",
        ] {
            assert!(!source.can_handle(url), "{}", url);
        }
    }

    #[test]
    fn test_validate_error_names_url() {
        let source = YoutubeSource::new();
        let err = source.validate("https://vimeo.com/1").unwrap_err();
        assert!(matches!(err, GuardianError::InvalidInput(_)));
        assert!(err.to_string().contains("vimeo.com"));
    }
}
