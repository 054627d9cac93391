//! Format ordering and label helpers
//!
//! Video rows are listed best quality first, audio rows smallest file first.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{AudioFormat, VideoFormat};

static QUALITY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)").expect("Invalid regex"));

static SIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(KB|MB|GB)").expect("Invalid regex"));

static CODECS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"codecs="([^"]+)""#).expect("Invalid regex"));

/// First run of digits in a quality label ("1080p60" -> 1080), 0 when absent
///
/// Runs too long for a `u64` saturate instead of wrapping to 0.
pub fn quality_number(quality: &str) -> u64 {
    QUALITY_RE
        .captures(quality)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().parse().unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Estimated bytes from a label like "1.5 MB", 0 when it does not parse
pub fn size_in_bytes(size: &str) -> f64 {
    let Some(captures) = SIZE_RE.captures(size) else {
        return 0.0;
    };

    let value: f64 = captures[1].parse().unwrap_or(0.0);
    match captures[2].to_ascii_uppercase().as_str() {
        "KB" => value * 1024.0,
        "MB" => value * 1024.0 * 1024.0,
        "GB" => value * 1024.0 * 1024.0 * 1024.0,
        _ => value,
    }
}

/// Highest quality first; equal qualities keep their input order
pub fn sort_video_formats(formats: &[VideoFormat]) -> Vec<VideoFormat> {
    let mut sorted = formats.to_vec();
    sorted.sort_by_key(|f| std::cmp::Reverse(quality_number(&f.quality)));
    sorted
}

/// Smallest estimated size first; equal sizes keep their input order
pub fn sort_audio_formats(formats: &[AudioFormat]) -> Vec<AudioFormat> {
    let mut sorted = formats.to_vec();
    sorted.sort_by(|a, b| size_in_bytes(&a.size).total_cmp(&size_in_bytes(&b.size)));
    sorted
}

/// Short codec name from a mime type's `codecs="..."` parameter
pub fn codec_label(mime_type: &str) -> String {
    let Some(codec) = CODECS_RE.captures(mime_type).and_then(|c| c.get(1)) else {
        return "Unknown".into();
    };
    let codec = codec.as_str();

    let known = [
        ("avc1", "H.264"),
        ("vp9", "VP9"),
        ("av01", "AV1"),
        ("mp4a", "AAC"),
        ("opus", "Opus"),
    ];
    known
        .iter()
        .find(|(needle, _)| codec.contains(needle))
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| codec.to_string())
}

/// Container name from a mime type
pub fn container_label(mime_type: &str) -> &'static str {
    if mime_type.contains("mp4") {
        "MP4"
    } else if mime_type.contains("webm") {
        "WebM"
    } else {
        "Unknown"
    }
}
