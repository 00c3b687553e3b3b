//! Error taxonomy.
//!
//! Every failure a check cycle can hit is one of the enums below.  None of
//! them ever escapes the monitor loop: the cycle turns them into a
//! [`CycleOutcome`](crate::cycle::CycleOutcome) and a status line, and the
//! next tick runs as usual.

use std::path::PathBuf;

use thiserror::Error;

/// A source could not produce a usable candidate list.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("access token is invalid or expired: {0}")]
    InvalidToken(String),

    #[error("could not parse response: {0}")]
    Parse(String),

    #[error("source not configured: {0}")]
    NotConfigured(String),
}

/// The seen-post file could not be read, parsed, or written.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage unavailable at {path}: {reason}")]
    StorageUnavailable { path: PathBuf, reason: String },
}

impl StoreError {
    pub fn unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        StoreError::StorageUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Everything a single check cycle can report.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),

    #[error(transparent)]
    StorageUnavailable(#[from] StoreError),

    /// The post carries no text to build a header from.  Never fatal.
    #[error("post {id} has no usable content")]
    MalformedPost { id: String },
}
