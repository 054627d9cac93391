//! Thumbnail URLs with a single fallback tier

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::debug;

static VIDEO_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[?&]v=|youtu\.be/|/shorts/|/embed/|/vi(?:_webp)?/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)")
        .expect("Invalid regex")
});

/// Upper bound on the availability check for the primary image
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Pull an 11-character YouTube video id out of a page or image URL
pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Highest resolution still for a video id
pub fn max_res_url(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{}/maxresdefault.jpg", video_id)
}

/// Always-present 480x360 still for a video id
pub fn hq_url(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{}/hqdefault.jpg", video_id)
}

/// Primary image plus what to show if it fails to load
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub primary: String,
    pub fallback: Option<String>,
}

impl Thumbnail {
    /// Backend thumbnail first; the fallback comes from whichever URL yields an id
    pub fn for_video(thumbnail: &str, page_url: &str) -> Option<Self> {
        let video_id = extract_video_id(thumbnail).or_else(|| extract_video_id(page_url));

        let primary = if thumbnail.is_empty() {
            max_res_url(video_id.as_deref()?)
        } else {
            thumbnail.to_string()
        };

        let fallback = video_id.map(|id| hq_url(&id)).filter(|f| *f != primary);
        Some(Self { primary, fallback })
    }

    /// Probe the primary image, dropping to the fallback when it is missing
    pub async fn resolve(&self, client: &reqwest::Client) -> Option<String> {
        self.resolve_within(client, PROBE_TIMEOUT).await
    }

    /// [`Thumbnail::resolve`] with an explicit limit; a slow host counts as missing
    pub async fn resolve_within(&self, client: &reqwest::Client, limit: Duration) -> Option<String> {
        let available = match client.head(&self.primary).timeout(limit).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Thumbnail probe failed: {}", e);
                false
            }
        };

        if available {
            Some(self.primary.clone())
        } else {
            self.fallback.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_video_id() {
        let id = Some("dQw4w9WgXcQ".to_string());
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), id);
        assert_eq!(extract_video_id("https://www.youtube.com/watch?list=PL1&v=dQw4w9WgXcQ&t=3"), id);
        assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQ?si=abc"), id);
        assert_eq!(extract_video_id("https://youtube.com/shorts/dQw4w9WgXcQ"), id);
        assert_eq!(extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"), id);
        assert_eq!(extract_video_id("https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg"), id);
        assert_eq!(extract_video_id("https://i.ytimg.com/vi_webp/dQw4w9WgXcQ/sddefault.webp"), id);
        assert_eq!(extract_video_id("https://example.com/video.mp4"), None);
        assert_eq!(extract_video_id("https://youtu.be/short"), None);
    }

    #[test]
    fn test_backend_thumbnail_falls_back_to_hq() {
        let thumb = Thumbnail::for_video(
            "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg",
            "https://youtu.be/dQw4w9WgXcQ",
        )
        .unwrap();
        assert_eq!(thumb.primary, "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg");
        assert_eq!(
            thumb.fallback.as_deref(),
            Some("https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg")
        );
    }

    #[test]
    fn test_missing_thumbnail_uses_page_id() {
        let thumb = Thumbnail::for_video("", "https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap();
        assert_eq!(thumb.primary, max_res_url("dQw4w9WgXcQ"));
        assert_eq!(thumb.fallback, Some(hq_url("dQw4w9WgXcQ")));
    }

    #[test]
    fn test_unknown_thumbnail_has_no_fallback() {
        let thumb = Thumbnail::for_video("https://cdn.example.com/poster.png", "https://example.com/v/1").unwrap();
        assert_eq!(thumb.primary, "https://cdn.example.com/poster.png");
        assert_eq!(thumb.fallback, None);

        assert_eq!(Thumbnail::for_video("", "https://example.com/v/1"), None);
    }

    #[tokio::test]
    async fn test_stalled_image_host_uses_fallback() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let thumb = Thumbnail {
            primary: format!("http://{addr}/vi/dQw4w9WgXcQ/maxresdefault.jpg"),
            fallback: Some(hq_url("dQw4w9WgXcQ")),
        };
        let resolved = tokio::time::timeout(
            Duration::from_secs(5),
            thumb.resolve_within(&reqwest::Client::new(), Duration::from_millis(200)),
        )
        .await
        .unwrap();
        assert_eq!(resolved, Some(hq_url("dQw4w9WgXcQ")));
    }

    #[test]
    fn test_hq_primary_has_no_duplicate_fallback() {
        let thumb = Thumbnail::for_video(&hq_url("dQw4w9WgXcQ"), "").unwrap();
        assert_eq!(thumb.fallback, None);
    }
}
