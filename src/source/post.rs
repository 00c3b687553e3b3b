//! The candidate post type shared by every source.
//!
//! `Post` is what a source hands to the check cycle.  The API source fills
//! it from the Graph response; the scrape source synthesizes the `id` and
//! stamps `created_at` with the capture time.  The rest of the application
//! (detection, sorting, notification) never needs to know which source
//! produced a post.
//!
//! `NotifiedPost` is the shape notifiers and dashboards receive once a post
//! has been classified as new.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::CycleError;

/// Header shown when a post has no extractable text.
pub const NO_CONTENT_HEADER: &str = "No message content";

/// Headers longer than this are cut down.
const HEADER_MAX_CHARS: usize = 100;
/// Characters kept from an over-long header before the ellipsis.
const HEADER_KEEP_CHARS: usize = 97;

/// A single candidate post, normalised from any source.
///
/// ## Sorting
///
/// `Post` implements [`Ord`] newest first: later `created_at` sorts before
/// earlier, and undated posts sink to the bottom.  `slice::sort` is stable,
/// so posts with equal timestamps keep the order the source gave them.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Post {
    /// Source identifier.  Stable for the API, synthesized per run when
    /// scraping.
    pub id: String,

    /// Post body.  `None` or empty means nothing could be extracted.
    pub message: Option<String>,

    /// Event time.  For scraped posts this is the capture time.
    pub created_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn new(
        id: impl Into<String>,
        message: Option<String>,
        created_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: id.into(),
            message,
            created_at,
        }
    }

    /// The message text, or `MalformedPost` when there is nothing usable.
    pub fn content(&self) -> Result<&str, CycleError> {
        match self.message.as_deref() {
            Some(m) if !m.trim().is_empty() => Ok(m),
            _ => Err(CycleError::MalformedPost {
                id: self.id.clone(),
            }),
        }
    }

    /// One-line summary used as the notification title.
    pub fn header(&self) -> String {
        match self.content() {
            Ok(message) => extract_header(message),
            Err(e) => {
                tracing::debug!(error = %e, "using placeholder header");
                NO_CONTENT_HEADER.to_string()
            }
        }
    }

    /// Build the payload handed to notifiers.
    pub fn to_notified(&self) -> NotifiedPost {
        NotifiedPost {
            id: self.id.clone(),
            header: self.header(),
            message: self.message.clone(),
            created_at: self.created_at,
        }
    }
}

/// First line of `message`, trimmed, capped at 100 characters.
///
/// Only the first line counts: a message opening with a blank line yields an
/// empty header.  Blank messages never get here; [`Post::header`] gives them
/// [`NO_CONTENT_HEADER`].
pub fn extract_header(message: &str) -> String {
    let first_line = message.lines().next().unwrap_or_default().trim();
    if first_line.chars().count() > HEADER_MAX_CHARS {
        let kept: String = first_line.chars().take(HEADER_KEEP_CHARS).collect();
        format!("{kept}...")
    } else {
        first_line.to_string()
    }
}

impl Ord for Post {
    fn cmp(&self, other: &Self) -> Ordering {
        // `other` first so that newer timestamps come first; `None` is less
        // than any `Some`, so undated posts end up last.
        other.created_at.cmp(&self.created_at)
    }
}

impl PartialOrd for Post {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A new post as seen by notifiers and dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotifiedPost {
    pub id: String,
    pub header: String,
    pub message: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_post(id: &str, message: Option<&str>, created_at: Option<DateTime<Utc>>) -> Post {
        Post::new(id, message.map(String::from), created_at)
    }

    #[test]
    fn header_is_first_trimmed_line() {
        let post = make_post("p1", Some("  Hello  \nworld"), None);
        assert_eq!(post.header(), "Hello");
    }

    #[test]
    fn header_handles_crlf() {
        assert_eq!(extract_header("Outage notice\r\nDetails follow"), "Outage notice");
    }

    #[test]
    fn header_exactly_100_chars_is_kept() {
        let line = "a".repeat(100);
        assert_eq!(extract_header(&line), line);
    }

    #[test]
    fn long_header_is_truncated_with_ellipsis() {
        let line = "b".repeat(150);
        let header = extract_header(&line);
        assert_eq!(header.chars().count(), 100);
        assert!(header.ends_with("..."));
        assert_eq!(&header[..97], &line[..97]);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let line = "é".repeat(120);
        let header = extract_header(&line);
        assert_eq!(header.chars().count(), 100);
        assert!(header.starts_with("ééé"));
    }

    #[test]
    fn missing_or_blank_message_uses_placeholder() {
        assert_eq!(make_post("a", None, None).header(), NO_CONTENT_HEADER);
        assert_eq!(make_post("b", Some(""), None).header(), NO_CONTENT_HEADER);
        assert_eq!(make_post("c", Some(" \n "), None).header(), NO_CONTENT_HEADER);
    }

    #[test]
    fn leading_blank_line_gives_empty_header() {
        assert_eq!(extract_header("\nHello"), "");
        assert_eq!(make_post("p2", Some("   \nHello"), None).header(), "");
    }

    #[test]
    fn content_reports_malformed_post() {
        let err = make_post("empty", Some("   "), None).content().unwrap_err();
        assert!(matches!(err, CycleError::MalformedPost { ref id } if id == "empty"));
    }

    #[test]
    fn sort_newest_first_with_undated_last() {
        let old = make_post("old", None, Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        let new = make_post("new", None, Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));
        let undated = make_post("undated", None, None);

        let mut posts = vec![undated, old, new];
        posts.sort();

        let ids: Vec<_> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["new", "old", "undated"]);
    }

    #[test]
    fn sort_keeps_source_order_for_ties() {
        let ts = Some(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap());
        let mut posts = vec![
            make_post("first", None, ts),
            make_post("second", None, ts),
            make_post("third", None, ts),
        ];
        posts.sort();
        let ids: Vec<_> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["first", "second", "third"]);
    }

    #[test]
    fn to_notified_carries_header() {
        let post = make_post("p1", Some("Hello\nworld"), None);
        let n = post.to_notified();
        assert_eq!(n.id, "p1");
        assert_eq!(n.header, "Hello");
        assert_eq!(n.message.as_deref(), Some("Hello\nworld"));
    }
}
