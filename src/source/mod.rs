//! Post source abstraction.
//!
//! This module defines the [`PostSource`] trait and the [`Post`] type every
//! source produces.  There are two implementations:
//!
//! * [`GraphApiSource`]: the official page feed.  Ids are stable, so posts
//!   are matched by id.
//! * [`ScrapeSource`]: parses the public page HTML.  Ids are synthesized per
//!   run, so posts are matched by message text.
//!
//! A source carries its own [`FingerprintPolicy`]; the monitor picks one
//! source when a session starts and keeps it (and therefore its policy)
//! until the session is stopped.
//!
//! ## For contributors: adding a new source
//!
//! 1. Create a new file in this directory.
//! 2. Implement [`PostSource`] for your struct.  Return `Err` when the fetch
//!    fails and `Ok(vec![])` when it worked but found nothing; the cycle
//!    logs the two differently.
//! 3. Pick the policy that matches how stable your ids are.
//! 4. Add a [`SourceKind`] variant and wire it into [`SourceSet`].

mod graph_api;
mod post;
mod scrape;

pub use graph_api::GraphApiSource;
pub use post::{NotifiedPost, Post};
pub use scrape::ScrapeSource;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::fingerprint::FingerprintPolicy;

/// Trait that every post source implements.
///
/// Sources are shared with the monitor task, so implementations must be
/// [`Send`] + [`Sync`].  Request timeouts are the source's own business.
#[async_trait::async_trait]
pub trait PostSource: Send + Sync {
    /// Human-readable label used in logs and status lines.
    fn name(&self) -> &str;

    /// How posts from this source are matched against seen records.
    fn policy(&self) -> FingerprintPolicy;

    /// Check credentials before a monitoring session starts.
    async fn preflight(&self) -> Result<(), SourceError> {
        Ok(())
    }

    /// Fetch the latest batch of candidate posts.
    async fn fetch(&self) -> Result<Vec<Post>, SourceError>;
}

/// Which source a monitoring session uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Official Graph API.
    Api,
    /// HTML scraping of the public page.
    Scrape,
}

impl SourceKind {
    pub fn other(self) -> Self {
        match self {
            SourceKind::Api => SourceKind::Scrape,
            SourceKind::Scrape => SourceKind::Api,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            SourceKind::Api => "Graph API",
            SourceKind::Scrape => "web scraping",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Api => f.write_str("api"),
            SourceKind::Scrape => f.write_str("scrape"),
        }
    }
}

/// The sources available to the monitor.  A variant may be missing when its
/// configuration is incomplete (e.g. no access token).
#[derive(Clone, Default)]
pub struct SourceSet {
    pub api: Option<Arc<dyn PostSource>>,
    pub scrape: Option<Arc<dyn PostSource>>,
}

impl SourceSet {
    pub fn get(&self, kind: SourceKind) -> Result<Arc<dyn PostSource>, SourceError> {
        let found = match kind {
            SourceKind::Api => self.api.clone(),
            SourceKind::Scrape => self.scrape.clone(),
        };
        found.ok_or_else(|| SourceError::NotConfigured(format!("{kind} source is not configured")))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// A source that replays canned responses, then returns empty batches.
    pub struct ScriptedSource {
        pub policy: FingerprintPolicy,
        responses: Mutex<VecDeque<Result<Vec<Post>, SourceError>>>,
        pub preflight_error: Option<String>,
        pub calls: Mutex<usize>,
    }

    impl ScriptedSource {
        pub fn new(policy: FingerprintPolicy) -> Self {
            Self {
                policy,
                responses: Mutex::new(VecDeque::new()),
                preflight_error: None,
                calls: Mutex::new(0),
            }
        }

        pub fn then(self, response: Result<Vec<Post>, SourceError>) -> Self {
            self.responses.lock().unwrap().push_back(response);
            self
        }

        pub fn push(&self, response: Result<Vec<Post>, SourceError>) {
            self.responses.lock().unwrap().push_back(response);
        }

        pub fn call_count(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait::async_trait]
    impl PostSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        fn policy(&self) -> FingerprintPolicy {
            self.policy
        }

        async fn preflight(&self) -> Result<(), SourceError> {
            match &self.preflight_error {
                Some(msg) => Err(SourceError::InvalidToken(msg.clone())),
                None => Ok(()),
            }
        }

        async fn fetch(&self) -> Result<Vec<Post>, SourceError> {
            *self.calls.lock().unwrap() += 1;
            self.responses.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()))
        }
    }
}
