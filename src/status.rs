//! Service status shared with dashboards.
//!
//! The monitor owns the only writable copy and publishes snapshots over a
//! `tokio::sync::watch` channel; the terminal UI and the HTTP API only ever
//! read them.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cycle::CycleOutcome;
use crate::source::{NotifiedPost, SourceKind};
use crate::store::SeenState;

/// How many posts dashboards keep on screen.
pub const RECENT_POSTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub is_running: bool,
    /// Source of the current session, or of the last one once stopped.
    pub source: Option<SourceKind>,
    pub last_check: Option<DateTime<Utc>>,
    /// Newest first.
    pub recent_posts: Vec<NotifiedPost>,
    pub check_interval_secs: u64,
    pub page_id: String,
    pub status_message: String,
    pub cycle_in_progress: bool,
}

impl ServiceStatus {
    pub fn new(page_id: impl Into<String>, check_interval_secs: u64) -> Self {
        Self {
            is_running: false,
            source: None,
            last_check: None,
            recent_posts: Vec::new(),
            check_interval_secs,
            page_id: page_id.into(),
            status_message: "Service not started".into(),
            cycle_in_progress: false,
        }
    }

    /// Pre-fill the last check time and recent posts from the ledger.
    pub fn with_history(mut self, state: &SeenState) -> Self {
        self.last_check = Some(state.last_check_at);
        self.recent_posts = state.recent_posts(RECENT_POSTS);
        self
    }

    /// Put a newest-first batch on top of the recent list.
    pub fn push_recent(&mut self, posts: &[NotifiedPost]) {
        if posts.is_empty() {
            return;
        }
        let mut merged: Vec<NotifiedPost> = posts.to_vec();
        merged.append(&mut self.recent_posts);
        merged.truncate(RECENT_POSTS);
        self.recent_posts = merged;
    }

    /// Fold a finished cycle into the snapshot.
    pub fn apply(&mut self, outcome: &CycleOutcome) {
        self.cycle_in_progress = false;
        if let Some(t) = outcome.checked_at() {
            self.last_check = Some(t);
        }
        self.push_recent(outcome.new_posts());
        self.status_message = outcome.status_line();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Post;
    use crate::store::SeenRecord;
    use chrono::TimeZone;

    fn notified(id: &str) -> NotifiedPost {
        Post::new(id, Some(format!("post {id}")), None).to_notified()
    }

    #[test]
    fn new_status_is_idle() {
        let s = ServiceStatus::new("zamcelco", 900);
        assert!(!s.is_running);
        assert_eq!(s.status_message, "Service not started");
        assert!(s.recent_posts.is_empty());
    }

    #[test]
    fn history_seeds_recent_posts_and_last_check() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let mut state = SeenState::fresh(t);
        state.records = (0..15)
            .map(|i| SeenRecord { identity: format!("p{i}"), message: Some(format!("m{i}")) })
            .collect();

        let s = ServiceStatus::new("page", 60).with_history(&state);
        assert_eq!(s.last_check, Some(t));
        assert_eq!(s.recent_posts.len(), RECENT_POSTS);
        assert_eq!(s.recent_posts[0].id, "p0");
    }

    #[test]
    fn push_recent_keeps_newest_ten() {
        let mut s = ServiceStatus::new("page", 60);
        for i in 0..8 {
            s.push_recent(&[notified(&format!("old{i}"))]);
        }
        s.push_recent(&[notified("a"), notified("b"), notified("c")]);

        assert_eq!(s.recent_posts.len(), RECENT_POSTS);
        let ids: Vec<_> = s.recent_posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(&ids[..4], ["a", "b", "c", "old7"]);
    }

    #[test]
    fn apply_updates_message_and_clears_progress() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let mut s = ServiceStatus::new("page", 60);
        s.cycle_in_progress = true;

        s.apply(&CycleOutcome::NewPosts { posts: vec![notified("p1")], checked_at: t });
        assert!(!s.cycle_in_progress);
        assert_eq!(s.last_check, Some(t));
        assert_eq!(s.recent_posts[0].id, "p1");
        assert!(s.status_message.starts_with("Found 1 new post!"));

        s.apply(&CycleOutcome::Failed { error: "disk full".into() });
        assert_eq!(s.last_check, Some(t), "failed cycles keep the previous check time");
        assert_eq!(s.status_message, "Error checking for posts: disk full");
    }

    #[test]
    fn serializes_for_the_http_api() {
        let s = ServiceStatus::new("page", 60);
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["is_running"], false);
        assert_eq!(v["page_id"], "page");
        assert!(v["source"].is_null());
    }
}
