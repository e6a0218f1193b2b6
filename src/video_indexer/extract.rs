//! Normalization of Video Indexer results into audit evidence.

use crate::config::TranscriptSources;
use crate::source::PLATFORM;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Evidence extracted from an indexed video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Spoken text, segments joined with spaces.
    pub transcript: String,
    /// On-screen text fragments in time order.
    pub ocr_text: Vec<String>,
    /// Duration, platform and related facts.
    pub video_metadata: BTreeMap<String, Value>,
}

impl Evidence {
    /// Whether there is any speech to audit.
    pub fn has_transcript(&self) -> bool {
        !self.transcript.trim().is_empty()
    }
}

/// Convert a raw index payload into [`Evidence`].
///
/// Pure and deterministic: the same payload always yields the same evidence. Missing or
/// malformed fields produce empty values instead of errors.
pub fn extract(raw: &Value, sources: TranscriptSources) -> Evidence {
    let primary = segment_texts(per_video_insights(raw).flat_map(|i| array_at(i, "transcript")));
    let secondary = segment_texts(
        raw.get("summarizedInsights")
            .into_iter()
            .flat_map(|s| array_at(s, "transcript")),
    );

    let transcript_lines = match sources {
        TranscriptSources::Primary if primary.is_empty() => secondary,
        TranscriptSources::Primary => primary,
        TranscriptSources::Concatenate => {
            if !primary.is_empty() && !secondary.is_empty() {
                warn!(
                    "Transcript present in both per-video and summarized insights; \
                     concatenating may duplicate text"
                );
            }
            primary.into_iter().chain(secondary).collect()
        }
    };

    let ocr_text = segment_texts(per_video_insights(raw).flat_map(|i| array_at(i, "ocr")));

    let mut video_metadata = BTreeMap::new();
    if let Some(duration) = raw.get("summarizedInsights").and_then(|s| s.get("duration")) {
        let duration = duration.get("seconds").unwrap_or(duration);
        if !duration.is_null() {
            video_metadata.insert("duration".to_string(), duration.clone());
        }
    }
    video_metadata.insert("platform".to_string(), Value::String(PLATFORM.to_string()));
    if let Some(id) = raw.get("id").and_then(Value::as_str) {
        video_metadata.insert("indexer_video_id".to_string(), Value::String(id.to_string()));
    }

    Evidence {
        transcript: transcript_lines.join(" "),
        ocr_text,
        video_metadata,
    }
}

fn per_video_insights(raw: &Value) -> impl Iterator<Item = &Value> {
    raw.get("videos")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|v| v.get("insights"))
}

fn array_at<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    value
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn segment_texts<'a>(segments: impl Iterator<Item = &'a Value>) -> Vec<String> {
    segments
        .filter_map(|seg| seg.get("text").and_then(Value::as_str))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
