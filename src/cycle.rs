//! One check cycle: fetch → detect → notify → persist.
//!
//! ```text
//! IDLE ─► FETCHING ─► DETECTING ─► NOTIFYING ─► PERSISTING ─► IDLE
//!             │                 └──────────────────┘ (nothing new)
//!             └─► IDLE   (source failed or returned nothing)
//! ```
//!
//! A failed or empty fetch is a no-op: the store is not even loaded.  A
//! storage failure aborts the cycle without writing anything.  Neither ever
//! propagates out of [`CheckCycle::run`]; the caller gets a
//! [`CycleOutcome`] and a status line instead.

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use tracing::{debug, error, info, warn};

use crate::detector::{self, Partition};
use crate::error::CycleError;
use crate::fingerprint::FingerprintPolicy;
use crate::notify::NotifierMux;
use crate::source::{NotifiedPost, Post, PostSource};
use crate::store::SeenStore;

/// Dashboard time format, e.g. `Jan 5, 2025 3:07 PM`.
pub const DISPLAY_TIME_FORMAT: &str = "%b %-d, %Y %-I:%M %p";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The source failed; nothing was loaded or written.
    SourceUnavailable { source: String, reason: String },
    /// The source worked but returned no posts; nothing was written.
    NoPosts { source: String },
    /// Every candidate was already seen; the check time was persisted.
    NoNewPosts { checked_at: DateTime<Utc> },
    /// New posts were notified (newest first) and recorded.
    NewPosts {
        posts: Vec<NotifiedPost>,
        checked_at: DateTime<Utc>,
    },
    /// Loading or saving the store failed; the store is unchanged.
    Failed { error: String },
}

impl CycleOutcome {
    /// Time of the completed check, when the cycle got that far.
    pub fn checked_at(&self) -> Option<DateTime<Utc>> {
        match self {
            CycleOutcome::NoNewPosts { checked_at } | CycleOutcome::NewPosts { checked_at, .. } => {
                Some(*checked_at)
            }
            _ => None,
        }
    }

    pub fn new_posts(&self) -> &[NotifiedPost] {
        match self {
            CycleOutcome::NewPosts { posts, .. } => posts,
            _ => &[],
        }
    }

    /// Human-readable summary for logs and dashboards.
    pub fn status_line(&self) -> String {
        match self {
            CycleOutcome::SourceUnavailable { source, reason } => {
                format!("No posts fetched from {source}: {reason}")
            }
            CycleOutcome::NoPosts { source } => format!("No posts fetched from {source}"),
            CycleOutcome::NoNewPosts { checked_at } => {
                format!("No new posts found. Last checked: {}", display_time(*checked_at))
            }
            CycleOutcome::NewPosts { posts, checked_at } => format!(
                "Found {} new post{}! Last checked: {}",
                posts.len(),
                if posts.len() == 1 { "" } else { "s" },
                display_time(*checked_at)
            ),
            CycleOutcome::Failed { error } => format!("Error checking for posts: {error}"),
        }
    }
}

pub fn display_time(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format(DISPLAY_TIME_FORMAT).to_string()
}

pub struct CheckCycle {
    store: SeenStore,
    notifier: Arc<NotifierMux>,
}

impl CheckCycle {
    pub fn new(store: SeenStore, notifier: Arc<NotifierMux>) -> Self {
        Self { store, notifier }
    }

    #[cfg(test)]
    pub fn store(&self) -> &SeenStore {
        &self.store
    }

    pub async fn run(&self, source: &dyn PostSource) -> CycleOutcome {
        info!(source = source.name(), "checking for new posts");

        let candidates = match source.fetch().await {
            Ok(posts) if posts.is_empty() => {
                info!(source = source.name(), "no posts fetched");
                return CycleOutcome::NoPosts {
                    source: source.name().to_string(),
                };
            }
            Ok(posts) => posts,
            Err(e) => {
                let e = CycleError::from(e);
                warn!(source = source.name(), error = %e, "fetch failed, skipping cycle");
                return CycleOutcome::SourceUnavailable {
                    source: source.name().to_string(),
                    reason: e.to_string(),
                };
            }
        };

        match self.process(source.policy(), candidates).await {
            Ok(outcome) => {
                info!(new = outcome.new_posts().len(), "check cycle complete");
                outcome
            }
            Err(e) => {
                error!(error = %e, "check cycle aborted");
                CycleOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn process(
        &self,
        policy: FingerprintPolicy,
        candidates: Vec<Post>,
    ) -> Result<CycleOutcome, CycleError> {
        let state = self.store.load().await?;

        let Partition {
            mut new_posts,
            already_seen,
        } = detector::partition(&candidates, &state.records, policy);
        debug!(new = new_posts.len(), seen = already_seen.len(), "partitioned candidates");

        // Stable: equal timestamps keep source order.
        new_posts.sort();

        let mut notified = Vec::with_capacity(new_posts.len());
        for post in &new_posts {
            let n = post.to_notified();
            self.notifier.notify(&n).await;
            notified.push(n);
        }

        let checked_at = Utc::now();
        let mut next = state.record_seen(&new_posts, policy);
        next.last_check_at = checked_at;
        self.store.save(&next).await?;

        Ok(if notified.is_empty() {
            CycleOutcome::NoNewPosts { checked_at }
        } else {
            CycleOutcome::NewPosts {
                posts: notified,
                checked_at,
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
