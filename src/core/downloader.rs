//! Downloader module - merge trigger, cancellation and saving the artifact

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::fs;
use tokio::sync::watch;
use tracing::{debug, info};

use super::api::Backend;
use crate::error::{Result, SaverError};
use crate::types::{MediaKind, MergeRequest};
use crate::utils::paths::ensure_dir;

/// Aborts the download it was created for
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

/// Resolves once the matching [`CancelHandle`] fires
#[derive(Debug, Clone)]
pub struct CancelToken(watch::Receiver<bool>);

/// A fresh handle/token pair for one download
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(tx), CancelToken(rx))
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Wait for cancellation. Never resolves if the handle is dropped unfired.
    pub async fn cancelled(&mut self) {
        if self.0.wait_for(|c| *c).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Run the merge request until it finishes or the token fires
pub async fn run_merge<B>(backend: &B, request: &MergeRequest, mut token: CancelToken) -> Result<Bytes>
where
    B: Backend + ?Sized,
{
    if token.is_cancelled() {
        return Err(SaverError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = token.cancelled() => {
            debug!(itag = request.itag, "Merge request aborted");
            Err(SaverError::Cancelled)
        }
        result = backend.merge(request) => result,
    }
}

/// `{title}.{mp3|mp4}`, falling back to `download` for blank titles
pub fn artifact_file_name(title: &str, kind: MediaKind) -> String {
    let decoded = html_escape::decode_html_entities(title);
    let cleaned: String = decoded
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_matches('.');

    let stem = if cleaned.is_empty() { "download" } else { cleaned };
    format!("{}.{}", stem, kind.extension())
}

/// Write the finished file into `dir`, returning its path
pub async fn save_artifact(dir: &Path, title: &str, kind: MediaKind, bytes: &[u8]) -> Result<PathBuf> {
    ensure_dir(&dir.to_string_lossy()).await?;

    let path = dir.join(artifact_file_name(title, kind));
    fs::write(&path, bytes).await?;

    info!(path = %path.display(), bytes = bytes.len(), "Saved download");
    Ok(path)
}
