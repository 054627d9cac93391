//! Push channel session id, kept between runs

use crate::error::Result;
use crate::types::SessionRecord;
use crate::utils::paths::ensure_dir;
use chrono::Utc;
use std::path::PathBuf;
use tokio::fs;
use tracing::warn;

/// Session store backed by a small JSON file
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: &str) -> Self {
        Self {
            path: PathBuf::from(path),
        }
    }

    /// Last stored session id, if any
    pub async fn load(&self) -> Option<String> {
        let content = fs::read_to_string(&self.path).await.ok()?;
        let record: SessionRecord = serde_json::from_str(&content).ok()?;
        Some(record.sid).filter(|sid| !sid.is_empty())
    }

    /// Store the id the push channel just issued
    pub async fn save(&self, sid: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(&parent.to_string_lossy()).await?;
        }
        let record = SessionRecord {
            sid: sid.to_string(),
            updated_at: Utc::now().timestamp(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&record)?).await?;
        Ok(())
    }

    /// Stored id, or the empty string the backend treats as "no session"
    pub async fn sid_or_empty(&self) -> String {
        self.load().await.unwrap_or_default()
    }

    /// Id for the next merge request
    ///
    /// A live channel's id always wins and is written back for later runs; the
    /// stored id is only used when no channel is connected.
    pub async fn current_sid(&self, live: Option<String>) -> String {
        let Some(sid) = live else {
            return self.sid_or_empty().await;
        };

        if self.load().await.as_deref() != Some(sid.as_str()) {
            if let Err(e) = self.save(&sid).await {
                warn!("Could not store session id: {}", e);
            }
        }
        sid
    }
}
