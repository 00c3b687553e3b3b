//! The seen-post ledger.
//!
//! A small JSON file remembers the posts already handled, newest first,
//! capped at [`MAX_RECORDS`].  Eviction is plain truncation: once a record
//! falls off the end, a post matching it is new again.
//!
//! ```json
//! {
//!   "lastCheckAt": "2024-01-01T00:00:00Z",
//!   "records": [ { "identity": "p1", "message": "Hello\nworld" } ]
//! }
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::fingerprint::FingerprintPolicy;
use crate::source::{NotifiedPost, Post};

/// Maximum number of records kept on disk.
pub const MAX_RECORDS: usize = 100;

/// One previously observed post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenRecord {
    pub identity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Everything persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenState {
    pub last_check_at: DateTime<Utc>,
    #[serde(default)]
    pub records: Vec<SeenRecord>,
}

impl SeenState {
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            last_check_at: now,
            records: Vec::new(),
        }
    }

    /// Prepend a record per post (in the given order) and keep the newest
    /// [`MAX_RECORDS`].
    ///
    /// Identity collisions inside `posts` are not collapsed; the detector
    /// never hands over a post whose identity is already stored.
    pub fn record_seen(mut self, posts: &[Post], policy: FingerprintPolicy) -> Self {
        let mut records: Vec<SeenRecord> = posts.iter().map(|p| policy.record_for(p)).collect();
        records.append(&mut self.records);
        records.truncate(MAX_RECORDS);
        self.records = records;
        self
    }

    /// The newest `n` records that carry text, shaped for a dashboard.
    ///
    /// Records do not keep a timestamp, so the last check time stands in.
    pub fn recent_posts(&self, n: usize) -> Vec<NotifiedPost> {
        self.records
            .iter()
            .filter(|r| r.message.is_some())
            .take(n)
            .map(|r| {
                let post = Post::new(r.identity.clone(), r.message.clone(), Some(self.last_check_at));
                post.to_notified()
            })
            .collect()
    }
}

/// File-backed store for [`SeenState`].
#[derive(Debug, Clone)]
pub struct SeenStore {
    path: PathBuf,
}

impl SeenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the ledger, creating (and persisting) an empty one on first run.
    pub async fn load(&self) -> Result<SeenState, StoreError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no seen-post file yet, starting empty");
                let state = SeenState::fresh(Utc::now());
                self.save(&state).await?;
                return Ok(state);
            }
            Err(e) => return Err(StoreError::unavailable(&self.path, e)),
        };

        let state: SeenState =
            serde_json::from_str(&raw).map_err(|e| StoreError::unavailable(&self.path, e))?;
        debug!(records = state.records.len(), "loaded seen-post file");
        Ok(state)
    }

    /// Replace the ledger on disk.
    ///
    /// The new content goes to a sibling temp file first and is renamed over
    /// the target, so readers never observe a half-written file.
    pub async fn save(&self, state: &SeenState) -> Result<(), StoreError> {
        let body =
            serde_json::to_vec_pretty(state).map_err(|e| StoreError::unavailable(&self.path, e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::unavailable(&self.path, e))?;
        }

        let tmp = self.temp_path();
        fs::write(&tmp, &body)
            .await
            .map_err(|e| StoreError::unavailable(&self.path, e))?;
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StoreError::unavailable(&self.path, e));
        }

        debug!(records = state.records.len(), path = %self.path.display(), "saved seen-post file");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "seen_posts.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
