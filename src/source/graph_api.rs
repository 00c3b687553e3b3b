//! Graph API post source.
//!
//! Reads `/{page-id}/posts` with a page access token.  Post ids from this
//! endpoint are stable, so the source uses [`FingerprintPolicy::StableId`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::{Post, PostSource};
use crate::error::SourceError;
use crate::fingerprint::FingerprintPolicy;

/// Token value shipped in the sample `.env`; treated as "not configured".
const PLACEHOLDER_TOKEN: &str = "YOUR_VALID_FACEBOOK_TOKEN_HERE";

const POST_FIELDS: &str = "id,message,created_time";

pub struct GraphApiSource {
    client: Client,
    base_url: String,
    page_id: String,
    access_token: String,
    limit: u32,
}

#[derive(Deserialize)]
struct PostsPage {
    #[serde(default)]
    data: Vec<GraphPost>,
}

#[derive(Deserialize)]
struct GraphPost {
    id: String,
    message: Option<String>,
    created_time: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: i64,
}

#[derive(Deserialize)]
struct DebugTokenEnvelope {
    data: DebugTokenData,
}

#[derive(Deserialize)]
struct DebugTokenData {
    #[serde(default)]
    is_valid: bool,
    expires_at: Option<i64>,
    error: Option<ErrorBody>,
}

impl GraphApiSource {
    pub fn new(
        base_url: impl Into<String>,
        page_id: impl Into<String>,
        access_token: impl Into<String>,
        limit: u32,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let page_id = page_id.into();
        let access_token = access_token.into();
        if page_id.trim().is_empty() {
            return Err(SourceError::NotConfigured("page id is empty".into()));
        }
        if access_token.trim().is_empty() || access_token == PLACEHOLDER_TOKEN {
            return Err(SourceError::NotConfigured(
                "access token is missing or still the placeholder".into(),
            ));
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            page_id,
            access_token,
            limit,
        })
    }

    /// Parse a `/posts` response body.  Pure, so tests can feed fixtures.
    pub fn parse_posts(body: &str) -> Result<Vec<Post>, SourceError> {
        let page: PostsPage =
            serde_json::from_str(body).map_err(|e| SourceError::Parse(e.to_string()))?;

        Ok(page
            .data
            .into_iter()
            .map(|p| {
                let created_at = p.created_time.as_deref().and_then(parse_graph_time);
                Post::new(p.id, p.message, created_at)
            })
            .collect())
    }

    fn decode_error(status: StatusCode, body: &str) -> SourceError {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(ErrorEnvelope { error }) => {
                if let Some(hint) = hint_for(error.code, &error.message) {
                    warn!(code = error.code, "{hint}");
                }
                SourceError::Api {
                    code: error.code,
                    message: error.message,
                }
            }
            Err(_) => SourceError::Api {
                code: i64::from(status.as_u16()),
                message: body.chars().take(200).collect(),
            },
        }
    }
}

/// Graph timestamps look like `2024-01-01T00:00:00+0000`; accept RFC 3339
/// as well.
fn parse_graph_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Operator-facing advice for well-known Graph error codes.
fn hint_for(code: i64, message: &str) -> Option<&'static str> {
    if message.contains("Feature Unavailable") {
        Some("the Graph API is restricted for this app or token; try `--source scrape`")
    } else {
        match code {
            190 => Some("access token is invalid or expired; request a new one with the pages_read_engagement permission"),
            100 => Some("page id not found; check FACEBOOK_PAGE_ID"),
            _ => None,
        }
    }
}

#[async_trait::async_trait]
impl PostSource for GraphApiSource {
    fn name(&self) -> &str {
        "graph-api"
    }

    fn policy(&self) -> FingerprintPolicy {
        FingerprintPolicy::StableId
    }

    #[instrument(skip(self), fields(page_id = %self.page_id))]
    async fn preflight(&self) -> Result<(), SourceError> {
        let url = format!("{}/debug_token", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("input_token", self.access_token.as_str()),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(Self::decode_error(status, &body));
        }

        let token: DebugTokenEnvelope =
            serde_json::from_str(&body).map_err(|e| SourceError::Parse(e.to_string()))?;
        if !token.data.is_valid {
            let reason = token
                .data
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| "unknown error".into());
            return Err(SourceError::InvalidToken(reason));
        }

        let expires = match token.data.expires_at {
            Some(secs) if secs > 0 => DateTime::<Utc>::from_timestamp(secs, 0)
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| secs.to_string()),
            _ => "never".to_string(),
        };
        info!(expires = %expires, "access token is valid");
        Ok(())
    }

    #[instrument(skip(self), fields(page_id = %self.page_id, limit = self.limit))]
    async fn fetch(&self) -> Result<Vec<Post>, SourceError> {
        let url = format!("{}/{}/posts", self.base_url, self.page_id);
        let limit = self.limit.to_string();
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("access_token", self.access_token.as_str()),
                ("limit", limit.as_str()),
                ("fields", POST_FIELDS),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(Self::decode_error(status, &body));
        }

        let posts = Self::parse_posts(&body)?;
        if posts.is_empty() {
            info!("no posts found for page");
        } else {
            info!(count = posts.len(), "fetched posts");
        }
        Ok(posts)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
