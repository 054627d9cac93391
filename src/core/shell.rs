//! Interaction state for one client session
//!
//! Holds what the user is looking at: the URL, fetched metadata and the
//! in-flight download. Every transition that the user should hear about
//! yields a [`Notice`].

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::watch;
use tracing::{error, info};

use super::api::Backend;
use super::downloader::{cancel_pair, run_merge, save_artifact, CancelHandle, CancelToken};
use crate::error::Result;
use crate::types::{ActiveDownload, DownloadProgress, FormatChoice, MergeRequest, VideoInfo};

/// Short message for the user, shown once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    MissingUrl,
    InfoFailed,
    DownloadComplete,
    DownloadCancelled,
    DownloadFailed,
}

impl Notice {
    pub fn title(self) -> &'static str {
        match self {
            Notice::MissingUrl | Notice::InfoFailed => "Error",
            Notice::DownloadComplete => "Download Complete",
            Notice::DownloadCancelled => "Download Cancelled",
            Notice::DownloadFailed => "Download Failed",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Notice::MissingUrl => "Please enter a YouTube URL",
            Notice::InfoFailed => {
                "Failed to fetch video information. Please check the URL and try again."
            }
            Notice::DownloadComplete => "Your file has been downloaded successfully.",
            Notice::DownloadCancelled => "Download was cancelled by user.",
            Notice::DownloadFailed => {
                "There was an error downloading your file. Please try again."
            }
        }
    }

    pub fn is_error(self) -> bool {
        matches!(
            self,
            Notice::MissingUrl | Notice::InfoFailed | Notice::DownloadFailed
        )
    }
}

/// How a download ended
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadOutcome {
    Completed(PathBuf),
    Cancelled,
    Failed,
}

impl DownloadOutcome {
    pub fn notice(&self) -> Notice {
        match self {
            DownloadOutcome::Completed(_) => Notice::DownloadComplete,
            DownloadOutcome::Cancelled => Notice::DownloadCancelled,
            DownloadOutcome::Failed => Notice::DownloadFailed,
        }
    }
}

/// Inputs that arrive while a download is running
pub struct DownloadEvents<I, F> {
    /// Push channel feed, if connected
    pub updates: Option<watch::Receiver<Option<DownloadProgress>>>,
    /// Resolves when the user asks to abort
    pub interrupt: I,
    /// Called with every progress value the shell stores
    pub on_progress: F,
}

/// A started download: what to send and how to notice cancellation
struct PendingDownload {
    request: MergeRequest,
    token: CancelToken,
}

pub struct Shell {
    url: String,
    is_loading: bool,
    video_info: Option<VideoInfo>,
    downloading: bool,
    progress: Option<DownloadProgress>,
    active_download: Option<ActiveDownload>,
    cancel: Option<CancelHandle>,
    output_dir: PathBuf,
    display_delay: Duration,
}

impl Shell {
    pub fn new(output_dir: impl Into<PathBuf>, display_delay: Duration) -> Self {
        Self {
            url: String::new(),
            is_loading: false,
            video_info: None,
            downloading: false,
            progress: None,
            active_download: None,
            cancel: None,
            output_dir: output_dir.into(),
            display_delay,
        }
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into().trim().to_string();
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn video_info(&self) -> Option<&VideoInfo> {
        self.video_info.as_ref()
    }

    pub fn is_downloading(&self) -> bool {
        self.downloading
    }

    pub fn progress(&self) -> Option<&DownloadProgress> {
        self.progress.as_ref()
    }

    pub fn active_download(&self) -> Option<&ActiveDownload> {
        self.active_download.as_ref()
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Replace `video_info` with a fresh lookup of the current URL
    pub async fn fetch_video_info<B>(&mut self, backend: &B) -> std::result::Result<(), Notice>
    where
        B: Backend + ?Sized,
    {
        if self.url.is_empty() {
            return Err(Notice::MissingUrl);
        }

        self.is_loading = true;
        self.video_info = None;

        let result = backend.get_info(&self.url).await;
        self.is_loading = false;

        match result {
            Ok(info) => {
                info!(title = %info.title, "Fetched video info");
                self.video_info = Some(info);
                Ok(())
            }
            Err(e) => {
                error!("Error fetching video info: {}", e);
                Err(Notice::InfoFailed)
            }
        }
    }

    /// Overwrite the progress pair; the last update wins
    ///
    /// Stored whether or not a download is running. The pair is only shown
    /// while `is_downloading` holds and a new download starts from zero.
    pub fn apply_progress(&mut self, progress: DownloadProgress) {
        self.progress = Some(progress);
    }

    /// Fire the cancellation handle of the running download, if any
    pub fn cancel_download(&mut self) {
        if let Some(handle) = self.cancel.take() {
            info!("Cancelling download");
            handle.cancel();
        }
    }

    /// Trigger the merge for `choice` and drive it to an outcome
    ///
    /// Returns `None` when there is nothing to download (no URL or metadata).
    /// On success the progress and active download stay visible until
    /// [`Shell::settle`] runs.
    pub async fn download<B, I, F>(
        &mut self,
        backend: &B,
        choice: &FormatChoice,
        sid: &str,
        events: DownloadEvents<I, F>,
    ) -> Option<DownloadOutcome>
    where
        B: Backend + ?Sized,
        I: Future<Output = ()>,
        F: FnMut(&DownloadProgress),
    {
        let PendingDownload { request, token } = self.start_download(choice, sid)?;

        let DownloadEvents {
            mut updates,
            interrupt,
            mut on_progress,
        } = events;

        // Only events sent after this point belong to this download
        if let Some(rx) = updates.as_mut() {
            rx.borrow_and_update();
        }
        if let Some(progress) = &self.progress {
            on_progress(progress);
        }

        let merge = run_merge(backend, &request, token);
        tokio::pin!(merge);
        tokio::pin!(interrupt);
        let mut interrupted = false;

        let result = loop {
            tokio::select! {
                result = &mut merge => break result,
                _ = &mut interrupt, if !interrupted => {
                    interrupted = true;
                    self.cancel_download();
                }
                update = next_update(&mut updates) => match update {
                    Some(progress) => {
                        on_progress(&progress);
                        self.apply_progress(progress);
                    }
                    None => updates = None,
                },
            }
        };

        let outcome = self.finish_download(result, choice).await;
        if let Some(progress) = &self.progress {
            on_progress(progress);
        }
        Some(outcome)
    }

    /// Keep a finished download on screen for the display delay, then clear it
    pub async fn settle(&mut self) {
        if self.downloading {
            tokio::time::sleep(self.display_delay).await;
        }
        self.reset_download();
    }

    fn start_download(&mut self, choice: &FormatChoice, sid: &str) -> Option<PendingDownload> {
        if self.url.is_empty() {
            return None;
        }
        let info = self.video_info.as_ref()?;

        let (handle, token) = cancel_pair();
        self.cancel = Some(handle);
        self.downloading = true;
        self.progress = Some(DownloadProgress::started());
        self.active_download = Some(ActiveDownload {
            title: info.title.clone(),
            quality: choice.quality.clone(),
            format: choice.kind.label().to_string(),
        });

        info!(itag = choice.itag, kind = choice.kind.label(), "Starting download");
        Some(PendingDownload {
            request: MergeRequest {
                url: self.url.clone(),
                itag: choice.itag,
                is_audio_only: choice.kind.is_audio_only(),
                sid: sid.to_string(),
            },
            token,
        })
    }

    async fn finish_download(&mut self, result: Result<Bytes>, choice: &FormatChoice) -> DownloadOutcome {
        self.cancel = None;

        let bytes = match result {
            Ok(bytes) => bytes,
            Err(e) if e.is_cancelled() => {
                self.reset_download();
                return DownloadOutcome::Cancelled;
            }
            Err(e) => {
                error!("Error downloading: {}", e);
                self.reset_download();
                return DownloadOutcome::Failed;
            }
        };

        let title = self
            .video_info
            .as_ref()
            .map(|info| info.title.clone())
            .unwrap_or_default();

        match save_artifact(&self.output_dir, &title, choice.kind, &bytes).await {
            Ok(path) => {
                let size = self
                    .video_info
                    .as_ref()
                    .and_then(|info| info.size_of(choice.itag, choice.kind))
                    .unwrap_or("0")
                    .to_string();
                self.progress = Some(DownloadProgress {
                    progress: 100.0,
                    size,
                });
                DownloadOutcome::Completed(path)
            }
            Err(e) => {
                error!("Error saving download: {}", e);
                self.reset_download();
                DownloadOutcome::Failed
            }
        }
    }

    fn reset_download(&mut self) {
        self.downloading = false;
        self.progress = None;
        self.active_download = None;
        self.cancel = None;
    }
}

/// Next progress value from the feed; `None` once the feed is gone
async fn next_update(
    updates: &mut Option<watch::Receiver<Option<DownloadProgress>>>,
) -> Option<DownloadProgress> {
    let Some(rx) = updates.as_mut() else {
        return std::future::pending().await;
    };

    loop {
        if rx.changed().await.is_err() {
            return None;
        }
        if let Some(progress) = rx.borrow_and_update().clone() {
            return Some(progress);
        }
    }
}
