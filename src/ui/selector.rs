//! Selector factory and format menus

use super::menu::pick;
use super::render::{audio_format_label, video_format_label};
use crate::core::formats::{sort_audio_formats, sort_video_formats};
use crate::types::{FormatChoice, MediaKind, MenuItem, SelectorType, VideoInfo};

/// Interactive menu in the configured style
#[derive(Debug, Clone, Copy)]
pub struct Selector {
    kind: SelectorType,
}

impl Selector {
    /// Select an item from the menu
    pub fn select<T: Clone>(&self, items: &[MenuItem<T>], prompt: &str) -> Option<T> {
        pick(items, prompt, self.kind == SelectorType::Fuzzy)
    }

    /// Pick one format of `kind`, listed in display order
    pub fn select_format(&self, info: &VideoInfo, kind: MediaKind) -> Option<FormatChoice> {
        let items = format_menu(info, kind);
        let prompt = match kind {
            MediaKind::Video => "Select Video Format",
            MediaKind::Audio => "Select Audio Format",
        };
        self.select(&items, prompt)
    }
}

/// Create a selector based on type
pub fn create_selector(selector_type: SelectorType) -> Selector {
    Selector { kind: selector_type }
}

/// Menu rows for one tab: video by quality, audio by size
pub fn format_menu(info: &VideoInfo, kind: MediaKind) -> Vec<MenuItem<FormatChoice>> {
    match kind {
        MediaKind::Video => sort_video_formats(&info.video_formats)
            .iter()
            .map(|f| MenuItem {
                label: video_format_label(f),
                value: FormatChoice::from(f),
            })
            .collect(),
        MediaKind::Audio => sort_audio_formats(&info.audio_formats)
            .iter()
            .map(|f| MenuItem {
                label: audio_format_label(f),
                value: FormatChoice::from(f),
            })
            .collect(),
    }
}

/// Find a format by itag in either list, video first
pub fn find_format(info: &VideoInfo, itag: u32, prefer: Option<MediaKind>) -> Option<FormatChoice> {
    let video = info.video_formats.iter().find(|f| f.itag == itag).map(FormatChoice::from);
    let audio = info.audio_formats.iter().find(|f| f.itag == itag).map(FormatChoice::from);

    match prefer {
        Some(MediaKind::Audio) => audio,
        Some(MediaKind::Video) => video,
        None => video.or(audio),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AudioFormat, VideoFormat};

    fn info() -> VideoInfo {
        let video = |itag, quality: &str| VideoFormat {
            itag,
            mime_type: "video/webm; codecs=\"vp9\"".into(),
            quality: quality.into(),
            fps: Some(30),
            size: "10 MB".into(),
        };
        let audio = |itag, size: &str| AudioFormat {
            itag,
            mime_type: "audio/webm; codecs=\"opus\"".into(),
            quality: "medium".into(),
            size: size.into(),
        };
        VideoInfo {
            title: "t".into(),
            duration: "1:00".into(),
            thumbnail: String::new(),
            video_formats: vec![video(134, "360p"), video(248, "1080p"), video(247, "720p")],
            audio_formats: vec![audio(251, "2 MB"), audio(249, "600 KB")],
        }
    }

    #[test]
    fn test_format_menu_orders_rows() {
        let itags: Vec<u32> = format_menu(&info(), MediaKind::Video)
            .into_iter()
            .map(|i| i.value.itag)
            .collect();
        assert_eq!(itags, vec![248, 247, 134]);

        let audio = format_menu(&info(), MediaKind::Audio);
        assert_eq!(audio[0].value.itag, 249);
        assert_eq!(audio[0].value.kind, MediaKind::Audio);
    }

    #[test]
    fn test_find_format() {
        let info = info();
        assert_eq!(find_format(&info, 247, None).unwrap().quality, "720p");
        assert_eq!(find_format(&info, 251, None).unwrap().kind, MediaKind::Audio);
        assert!(find_format(&info, 251, Some(MediaKind::Video)).is_none());
        assert!(find_format(&info, 1, None).is_none());
    }
}
