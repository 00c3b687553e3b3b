//! Public-page scraping source.
//!
//! Used when the Graph API is unavailable.  The page HTML is fetched with a
//! browser-like User-Agent and each `div[role="article"]` becomes a post.
//! No JavaScript is executed, so only server-rendered markup is seen.
//!
//! Scraped posts have no real id or timestamp: the id is synthesized from
//! the capture time and the element index, and `created_at` is the capture
//! time.  Because the id changes every run, matching falls back to the
//! message text ([`FingerprintPolicy::ContentFallback`]).

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument};

use super::{Post, PostSource};
use crate::error::SourceError;
use crate::fingerprint::FingerprintPolicy;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

const ARTICLE_SELECTOR: &str = r#"div[role="article"]"#;

/// Message selectors, most specific first.  The page markup changes often;
/// update these when extraction starts coming back empty.
const MESSAGE_SELECTORS: [&str; 3] = [
    "div.xdj266r",
    r#"div[data-ad-comet-preview="message"]"#,
    "p",
];

pub struct ScrapeSource {
    client: Client,
    base_url: String,
    page_id: String,
    limit: usize,
}

impl ScrapeSource {
    pub fn new(
        base_url: impl Into<String>,
        page_id: impl Into<String>,
        limit: usize,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let page_id = page_id.into();
        if page_id.trim().is_empty() {
            return Err(SourceError::NotConfigured("page id is empty".into()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            page_id,
            limit,
        })
    }

    /// Extract up to `limit` posts from page HTML.  Pure (no I/O).
    ///
    /// Articles without extractable text are skipped, but they still count
    /// towards `limit` and the index used in the synthesized id.
    pub fn parse_page(
        html: &str,
        limit: usize,
        captured_at: DateTime<Utc>,
    ) -> Result<Vec<Post>, SourceError> {
        let document = Html::parse_document(html);
        let articles = selector(ARTICLE_SELECTOR)?;
        let message_selectors = MESSAGE_SELECTORS
            .iter()
            .map(|s| selector(s))
            .collect::<Result<Vec<_>, _>>()?;

        let stamp = captured_at.timestamp_millis();
        let posts = document
            .select(&articles)
            .take(limit)
            .enumerate()
            .filter_map(|(index, article)| {
                let message = extract_message(article, &message_selectors);
                if message.is_none() {
                    debug!(index, "skipping article without text");
                }
                message.map(|m| Post::new(format!("scraped_{stamp}_{index}"), Some(m), Some(captured_at)))
            })
            .collect();

        Ok(posts)
    }
}

fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|e| SourceError::Parse(format!("selector {css}: {e:?}")))
}

/// Text of the first selector that yields anything.
///
/// The first selector uses only its first match; the fallbacks join the
/// text of every match.
fn extract_message(article: ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    selectors.iter().enumerate().find_map(|(i, sel)| {
        let text: String = if i == 0 {
            article
                .select(sel)
                .next()
                .map(|el| el.text().collect())
                .unwrap_or_default()
        } else {
            article.select(sel).flat_map(|el| el.text()).collect()
        };
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    })
}

#[async_trait::async_trait]
impl PostSource for ScrapeSource {
    fn name(&self) -> &str {
        "scraper"
    }

    fn policy(&self) -> FingerprintPolicy {
        FingerprintPolicy::ContentFallback
    }

    #[instrument(skip(self), fields(page_id = %self.page_id, limit = self.limit))]
    async fn fetch(&self) -> Result<Vec<Post>, SourceError> {
        let url = format!("{}/{}", self.base_url, self.page_id);
        let resp = self.client.get(&url).send().await?.error_for_status()?;
        let html = resp.text().await?;

        let posts = Self::parse_page(&html, self.limit, Utc::now())?;
        info!(count = posts.len(), "scraped posts from page");
        Ok(posts)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const PAGE: &str = r#"<html><body>
      <div role="article">
        <div class="xdj266r">Power interruption notice
Feeder 3, 1pm to 4pm</div>
        <div class="xdj266r">second block is ignored</div>
      </div>
      <div role="article">
        <div data-ad-comet-preview="message"><span>Billing </span><span>update</span></div>
      </div>
      <div role="article"><img src="photo.jpg"></div>
      <div role="article"><p>First paragraph.</p><p> Second.</p></div>
    </body></html>"#;

    fn captured() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 3, 4, 5, 6).unwrap()
    }

    #[test]
    fn parse_page_extracts_articles_in_order() {
        let posts = ScrapeSource::parse_page(PAGE, 10, captured()).unwrap();

        assert_eq!(posts.len(), 3, "the image-only article is dropped");
        assert_eq!(posts[0].message.as_deref(), Some("Power interruption notice\nFeeder 3, 1pm to 4pm"));
        assert_eq!(posts[1].message.as_deref(), Some("Billing update"));
        assert_eq!(posts[2].message.as_deref(), Some("First paragraph. Second."));
    }

    #[test]
    fn synthesized_ids_use_capture_time_and_index() {
        let posts = ScrapeSource::parse_page(PAGE, 10, captured()).unwrap();
        let stamp = captured().timestamp_millis();

        assert_eq!(posts[0].id, format!("scraped_{stamp}_0"));
        assert_eq!(posts[1].id, format!("scraped_{stamp}_1"));
        assert_eq!(posts[2].id, format!("scraped_{stamp}_3"));
        assert!(posts.iter().all(|p| p.created_at == Some(captured())));
    }

    #[test]
    fn limit_caps_articles_examined() {
        let posts = ScrapeSource::parse_page(PAGE, 2, captured()).unwrap();
        assert_eq!(posts.len(), 2);
    }

    #[test]
    fn page_without_articles_is_empty() {
        let posts = ScrapeSource::parse_page("<html><body>Log in</body></html>", 5, captured()).unwrap();
        assert!(posts.is_empty());
    }

    #[test]
    fn empty_page_id_is_rejected() {
        let result = ScrapeSource::new("https://example.com", "", 5, Duration::from_secs(1));
        assert!(matches!(result, Err(SourceError::NotConfigured(_))));
    }

    #[tokio::test]
    async fn fetch_reads_page_over_http() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", "/zamcelco")
            .match_header("user-agent", USER_AGENT)
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(PAGE)
            .create_async()
            .await;

        let source = ScrapeSource::new(server.url(), "zamcelco", 5, Duration::from_secs(5)).unwrap();
        let posts = source.fetch().await.unwrap();
        m.assert_async().await;
        assert_eq!(posts.len(), 3);
        assert!(posts[0].id.starts_with("scraped_"));
    }

    #[tokio::test]
    async fn fetch_http_error_is_source_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server.mock("GET", "/zamcelco").with_status(403).create_async().await;

        let source = ScrapeSource::new(server.url(), "zamcelco", 5, Duration::from_secs(5)).unwrap();
        assert!(matches!(source.fetch().await, Err(SourceError::Request(_))));
    }
}
