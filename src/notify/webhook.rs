use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;

use super::Notifier;
use crate::source::NotifiedPost;

/// POSTs a JSON payload per new post to a configured URL.
#[derive(Clone)]
pub struct WebhookNotifier {
    url: String,
    client: Client,
    timeout: Duration,
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    title: &'static str,
    id: &'a str,
    header: &'a str,
    message: Option<&'a str>,
    created_at: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: Client::new(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, post: &NotifiedPost) -> Result<()> {
        let payload = WebhookPayload {
            title: "New post detected",
            id: &post.id,
            header: &post.header,
            message: post.message.as_deref(),
            created_at: post.created_at.map(|t| t.to_rfc3339()),
        };

        self.client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .context("webhook post")?
            .error_for_status()
            .context("webhook non-2xx")?;
        Ok(())
    }
}
