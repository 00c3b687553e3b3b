//! New-post detection: split a fetched batch into new and already-seen
//! posts.  Pure; the store is only read.

use crate::fingerprint::FingerprintPolicy;
use crate::source::Post;
use crate::store::SeenRecord;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Posts with no matching record, in source order.
    pub new_posts: Vec<Post>,
    /// Posts matching at least one record, in source order.
    pub already_seen: Vec<Post>,
}

pub fn partition(candidates: &[Post], records: &[SeenRecord], policy: FingerprintPolicy) -> Partition {
    let (already_seen, new_posts): (Vec<Post>, Vec<Post>) = candidates
        .iter()
        .cloned()
        .partition(|candidate| records.iter().any(|r| policy.is_same_seen_item(candidate, r)));

    Partition {
        new_posts,
        already_seen,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn post(id: &str, message: Option<&str>) -> Post {
        Post::new(id, message.map(String::from), None)
    }

    fn record(identity: &str, message: Option<&str>) -> SeenRecord {
        SeenRecord {
            identity: identity.into(),
            message: message.map(String::from),
        }
    }

    fn ids(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn empty_candidates_yield_empty_partition() {
        let out = partition(&[], &[record("p1", None)], FingerprintPolicy::StableId);
        assert_eq!(out, Partition::default());
    }

    #[test]
    fn everything_is_new_against_an_empty_store() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let candidates = vec![Post::new("p1", Some("Hello\nworld".into()), Some(ts))];
        let out = partition(&candidates, &[], FingerprintPolicy::StableId);
        assert_eq!(ids(&out.new_posts), ["p1"]);
        assert!(out.already_seen.is_empty());
    }

    #[test]
    fn stable_id_known_post_is_not_new() {
        let out = partition(&[post("p1", Some("x"))], &[record("p1", None)], FingerprintPolicy::StableId);
        assert!(out.new_posts.is_empty());
        assert_eq!(ids(&out.already_seen), ["p1"]);
    }

    #[test]
    fn stable_id_is_new_iff_no_record_has_its_id() {
        let records = vec![record("a", Some("same")), record("c", None)];
        let candidates = vec![post("a", None), post("b", Some("same")), post("c", None), post("d", None)];

        let out = partition(&candidates, &records, FingerprintPolicy::StableId);
        for candidate in &candidates {
            let known = records.iter().any(|r| r.identity == candidate.id);
            assert_eq!(out.new_posts.contains(candidate), !known, "candidate {}", candidate.id);
        }
    }

    #[test]
    fn content_fallback_is_new_iff_no_record_has_its_text() {
        let records = vec![record("scraped_1_0", Some("same text")), record("scraped_1_1", None)];
        let candidates = vec![
            post("scraped_999_0", Some("same text")),
            post("scraped_999_1", Some("fresh text")),
            post("scraped_999_2", None),
        ];

        let out = partition(&candidates, &records, FingerprintPolicy::ContentFallback);
        assert_eq!(ids(&out.new_posts), ["scraped_999_1"]);
        assert_eq!(ids(&out.already_seen), ["scraped_999_0", "scraped_999_2"]);
    }

    #[test]
    fn partition_is_stable() {
        let records = vec![record("b", None), record("d", None)];
        let candidates = vec![post("e", None), post("b", None), post("a", None), post("d", None), post("c", None)];

        let out = partition(&candidates, &records, FingerprintPolicy::StableId);
        assert_eq!(ids(&out.new_posts), ["e", "a", "c"]);
        assert_eq!(ids(&out.already_seen), ["b", "d"]);
    }

    #[test]
    fn detection_is_idempotent() {
        let records = vec![record("p1", Some("one"))];
        let candidates = vec![post("p1", Some("one")), post("p2", Some("two"))];

        let first = partition(&candidates, &records, FingerprintPolicy::ContentFallback);
        let second = partition(&candidates, &records, FingerprintPolicy::ContentFallback);
        assert_eq!(first, second);
    }
}
