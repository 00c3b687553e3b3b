//! Notification sinks.
//!
//! A check cycle hands every new post, newest first, to a [`NotifierMux`],
//! which forwards it to each configured [`Notifier`] in turn.  A failing
//! notifier is logged and skipped; it never aborts the cycle.

pub mod webhook;

use anyhow::Result;
use tracing::{info, warn};

use crate::source::NotifiedPost;

pub use webhook::WebhookNotifier;

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self, post: &NotifiedPost) -> Result<()>;
}

/// Writes each new post to the log.
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, post: &NotifiedPost) -> Result<()> {
        let created = post
            .created_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "unknown".into());
        info!(target: "alert", id = %post.id, created_at = %created, header = %post.header, "new post detected");
        Ok(())
    }
}

/// Fans a post out to every notifier, one at a time.
#[derive(Default)]
pub struct NotifierMux {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new() -> Self {
        Self::default()
    }

    /// The log notifier plus a webhook when a URL is configured.
    pub fn from_settings(webhook_url: Option<&str>, timeout_secs: u64) -> Self {
        let mut mux = Self::new().with(LogNotifier);
        if let Some(url) = webhook_url.filter(|u| !u.trim().is_empty()) {
            mux = mux.with(WebhookNotifier::new(url).with_timeout(timeout_secs));
        }
        mux
    }

    pub fn with(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifiers.push(Box::new(notifier));
        self
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub async fn notify(&self, post: &NotifiedPost) {
        for n in &self.notifiers {
            if let Err(e) = n.notify(post).await {
                warn!(notifier = n.name(), id = %post.id, "notification failed: {e:#}");
            }
        }
    }
}
