//! Terminal rendering: format rows, video summary, notices, progress bar

use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::core::formats::{codec_label, container_label};
use crate::core::shell::Notice;
use crate::types::{ActiveDownload, AudioFormat, DownloadProgress, VideoFormat, VideoInfo};

/// `1080p60 [60fps] MP4 H.264 - Size: 80 MB`; the fps badge only above 30
pub fn video_format_label(format: &VideoFormat) -> String {
    let fps = match format.fps {
        Some(fps) if fps > 30 => format!(" {}", format!("[{}fps]", fps).yellow()),
        _ => String::new(),
    };
    format!(
        "{}{} {} {} - {}",
        format.quality.bold(),
        fps,
        container_label(&format.mime_type).cyan(),
        codec_label(&format.mime_type).cyan(),
        format!("Size: {}", format.size).dimmed()
    )
}

/// `160kbps WebM Opus - Size: 4.1 MB`
pub fn audio_format_label(format: &AudioFormat) -> String {
    format!(
        "{} {} {} - {}",
        format.quality.bold(),
        container_label(&format.mime_type).cyan(),
        codec_label(&format.mime_type).cyan(),
        format!("Size: {}", format.size).dimmed()
    )
}

/// Title block shown after a successful lookup
pub fn print_video_info(info: &VideoInfo, thumbnail: Option<&str>) {
    println!();
    println!("{}", info.title.bold());
    println!("{} {}", "Duration:".dimmed(), info.duration);
    if let Some(thumbnail) = thumbnail {
        println!("{} {}", "Thumbnail:".dimmed(), thumbnail);
    }
    println!(
        "{} {} video, {} audio",
        "Formats:".dimmed(),
        info.video_formats.len(),
        info.audio_formats.len()
    );
    println!();
}

/// Toast-style one-liner
pub fn print_notice(notice: Notice) {
    if notice.is_error() {
        eprintln!("{} {}", format!("{}:", notice.title()).red(), notice.description());
    } else {
        println!("{} {}", format!("{}:", notice.title()).green(), notice.description());
    }
}

/// Spinner shown while metadata loads
pub fn loading_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Progress bar for the in-flight download, 0 to 100
pub struct DownloadBar {
    bar: ProgressBar,
}

impl DownloadBar {
    pub fn new(active: &ActiveDownload) -> Self {
        let bar = ProgressBar::new(100);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{prefix} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_prefix(format!("{} {}", active.quality, active.format));
        bar.println(format!("{} {}", "Downloading:".dimmed(), active.title));
        bar.enable_steady_tick(Duration::from_millis(200));
        Self { bar }
    }

    pub fn update(&self, progress: &DownloadProgress) {
        self.bar.set_position(bar_position(progress.progress));
        self.bar.set_message(progress.size.clone());
    }

    pub fn finish(&self) {
        self.bar.finish();
    }

    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

fn bar_position(progress: f64) -> u64 {
    if progress.is_nan() {
        return 0;
    }
    progress.clamp(0.0, 100.0).round() as u64
}
