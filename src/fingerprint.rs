//! Post identity.
//!
//! The two sources disagree about how trustworthy an `id` is.  The Graph API
//! promises stable ids, so an exact id match is authoritative.  The scraper
//! invents a fresh id on every run, so for scraped posts the real key is the
//! message text; the id comparison is kept only so the predicate is total
//! over both kinds of record.
//!
//! Two distinct scraped posts with identical text are therefore treated as
//! the same post for as long as the record survives in the store.

use crate::source::Post;
use crate::store::SeenRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintPolicy {
    /// Exact `id` match.
    StableId,
    /// Exact message match, or exact `id` match.
    ContentFallback,
}

impl FingerprintPolicy {
    /// The identity stored for `post` in its seen record.
    pub fn identity_of(self, post: &Post) -> String {
        post.id.clone()
    }

    /// Whether `candidate` is the post remembered by `record`.
    pub fn is_same_seen_item(self, candidate: &Post, record: &SeenRecord) -> bool {
        match self {
            FingerprintPolicy::StableId => record.identity == candidate.id,
            FingerprintPolicy::ContentFallback => {
                let seen = record.message.as_deref().unwrap_or_default();
                let text = candidate.message.as_deref().unwrap_or_default();
                seen == text || record.identity == candidate.id
            }
        }
    }

    /// Build the record remembering `post`.
    pub fn record_for(self, post: &Post) -> SeenRecord {
        SeenRecord {
            identity: self.identity_of(post),
            message: post.message.clone(),
        }
    }
}
