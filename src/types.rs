//! Type definitions for jenisaver
//!
//! Wire types mirror the backend's JSON (camelCase), everything else is
//! transient client state.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, SaverError};

// ============================================
// Backend Types
// ============================================

/// Metadata for one video, as returned by `/getinfo`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub title: String,
    /// Human readable, e.g. "3:45"
    #[serde(deserialize_with = "string_or_number")]
    pub duration: String,
    /// URL to thumbnail image
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub video_formats: Vec<VideoFormat>,
    #[serde(default)]
    pub audio_formats: Vec<AudioFormat>,
}

impl VideoInfo {
    /// Size label of a format by itag, searching the list for `kind`
    pub fn size_of(&self, itag: u32, kind: MediaKind) -> Option<&str> {
        match kind {
            MediaKind::Video => self
                .video_formats
                .iter()
                .find(|f| f.itag == itag)
                .map(|f| f.size.as_str()),
            MediaKind::Audio => self
                .audio_formats
                .iter()
                .find(|f| f.itag == itag)
                .map(|f| f.size.as_str()),
        }
    }
}

/// A downloadable video variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoFormat {
    pub itag: u32,
    /// e.g. `video/mp4; codecs="avc1.640028"`
    pub mime_type: String,
    /// "1080p60", "720p", etc.
    pub quality: String,
    #[serde(default)]
    pub fps: Option<u32>,
    /// e.g. "45.2 MB"
    pub size: String,
}

/// A downloadable audio-only variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioFormat {
    pub itag: u32,
    pub mime_type: String,
    pub quality: String,
    pub size: String,
}

/// Response envelope shared by backend JSON endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// Unwrap `data`, treating `ok: false` or a missing payload as a failure
    pub fn into_result(self) -> Result<T> {
        match (self.ok, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err(SaverError::MalformedResponse(
                "response has no data".into(),
            )),
            (false, _) => Err(SaverError::Api(
                self.error
                    .unwrap_or_else(|| "Failed to fetch video information".into()),
            )),
        }
    }
}

/// Body of `/getinfo`
#[derive(Debug, Clone, Serialize)]
pub struct InfoRequest<'a> {
    pub url: &'a str,
}

/// Body of `/merge`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    pub url: String,
    pub itag: u32,
    pub is_audio_only: bool,
    /// Push channel session, so the backend can route progress events
    pub sid: String,
}

// ============================================
// Download State Types
// ============================================

/// Which tab a format came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Video => "Video",
            MediaKind::Audio => "Audio",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            MediaKind::Video => "mp4",
            MediaKind::Audio => "mp3",
        }
    }

    pub fn is_audio_only(self) -> bool {
        self == MediaKind::Audio
    }
}

/// The format the user picked
#[derive(Debug, Clone, PartialEq)]
pub struct FormatChoice {
    pub itag: u32,
    pub quality: String,
    pub kind: MediaKind,
}

impl From<&VideoFormat> for FormatChoice {
    fn from(format: &VideoFormat) -> Self {
        Self {
            itag: format.itag,
            quality: format.quality.clone(),
            kind: MediaKind::Video,
        }
    }
}

impl From<&AudioFormat> for FormatChoice {
    fn from(format: &AudioFormat) -> Self {
        Self {
            itag: format.itag,
            quality: format.quality.clone(),
            kind: MediaKind::Audio,
        }
    }
}

/// Latest progress reported by the push channel
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadProgress {
    /// 0 to 100
    pub progress: f64,
    /// Human readable, e.g. "12.4MB"
    pub size: String,
}

impl DownloadProgress {
    pub fn started() -> Self {
        Self {
            progress: 0.0,
            size: "0MB".into(),
        }
    }
}

/// Labels describing the in-flight download
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveDownload {
    pub title: String,
    pub quality: String,
    /// "Video" or "Audio"
    pub format: String,
}

// ============================================
// Config Types
// ============================================

/// Menu selector type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SelectorType {
    /// Arrow-key list
    #[default]
    Plain,
    /// Type-to-filter list
    Fuzzy,
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend origin for `/getinfo` and `/merge`
    pub api_url: String,
    /// Push channel origin (defaults to `api_url`)
    pub socket_url: Option<String>,
    /// Download directory path
    pub download_dir: String,
    /// Menu selector
    pub selector: SelectorType,
    /// Seconds a finished download stays on screen (default: 3)
    pub display_delay_secs: u64,
    /// Editor command (default: "nvim")
    pub editor: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: crate::core::api::DEFAULT_API_URL.into(),
            socket_url: None,
            download_dir: String::new(), // Set at runtime to ~/Downloads
            selector: SelectorType::default(),
            display_delay_secs: 3,
            editor: "nvim".into(),
        }
    }
}

impl Config {
    /// Where the push channel connects
    pub fn push_origin(&self) -> &str {
        self.socket_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.api_url)
    }
}

/// Session id persisted between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub sid: String,
    /// Unix timestamp when the push channel issued it
    pub updated_at: i64,
}

// ============================================
// Selector Types
// ============================================

/// Item displayed in selector menu
#[derive(Debug, Clone)]
pub struct MenuItem<T> {
    /// Display text
    pub label: String,
    /// Underlying value
    pub value: T,
}

// ============================================
// State Machine Types
// ============================================

/// Application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Ask for a URL
    Init,
    /// Fetch metadata for the URL
    FetchInfo,
    /// Pick video or audio formats
    SelectKind,
    /// Pick a format from the chosen list
    SelectFormat(MediaKind),
    /// Run the merge request
    Download,
    /// Exit application
    Exit,
}

/// Accept `"3:45"` or `225` for text fields the backend is loose about
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Loose::deserialize(deserializer)? {
        Loose::Text(s) => s,
        Loose::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const INFO_JSON: &str = r#"{
        "ok": true,
        "data": {
            "title": "Lofi Beats",
            "duration": "3:45",
            "thumbnail": "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg",
            "videoFormats": [
                {"itag": 137, "mimeType": "video/mp4; codecs=\"avc1.640028\"", "quality": "1080p", "fps": 30, "size": "45.2 MB"},
                {"itag": 299, "mimeType": "video/mp4; codecs=\"avc1.64002a\"", "quality": "1080p60", "fps": 60, "size": "80 MB"}
            ],
            "audioFormats": [
                {"itag": 140, "mimeType": "audio/mp4; codecs=\"mp4a.40.2\"", "quality": "128kbps", "size": "3.4 MB"}
            ]
        }
    }"#;

    #[test]
    fn test_info_envelope_parses() {
        let envelope: ApiEnvelope<VideoInfo> = serde_json::from_str(INFO_JSON).unwrap();
        let info = envelope.into_result().unwrap();
        assert_eq!(info.title, "Lofi Beats");
        assert_eq!(info.video_formats.len(), 2);
        assert_eq!(info.video_formats[1].fps, Some(60));
        assert_eq!(info.audio_formats[0].mime_type, "audio/mp4; codecs=\"mp4a.40.2\"");
        assert_eq!(info.size_of(140, MediaKind::Audio), Some("3.4 MB"));
        assert_eq!(info.size_of(140, MediaKind::Video), None);
    }

    #[test]
    fn test_numeric_duration_is_kept_as_text() {
        let info: VideoInfo =
            serde_json::from_str(r#"{"title": "t", "duration": 225}"#).unwrap();
        assert_eq!(info.duration, "225");
        assert!(info.video_formats.is_empty());
    }

    #[test]
    fn test_error_envelope_carries_message() {
        let envelope: ApiEnvelope<VideoInfo> =
            serde_json::from_str(r#"{"ok": false, "error": "Video unavailable"}"#).unwrap();
        let err = envelope.into_result().unwrap_err();
        assert_eq!(err.to_string(), "Backend error: Video unavailable");
    }

    #[test]
    fn test_ok_without_data_is_malformed() {
        let envelope: ApiEnvelope<VideoInfo> = serde_json::from_str(r#"{"ok": true}"#).unwrap();
        assert!(matches!(
            envelope.into_result(),
            Err(SaverError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_merge_request_uses_backend_field_names() {
        let req = MergeRequest {
            url: "https://youtu.be/dQw4w9WgXcQ".into(),
            itag: 140,
            is_audio_only: true,
            sid: "abc".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["isAudioOnly"], true);
        assert_eq!(json["itag"], 140);
        assert_eq!(json["sid"], "abc");
    }
}
