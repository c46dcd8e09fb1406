// src/error.rs
//! Error taxonomy.
//!
//! Errors are recovered at the narrowest scope: a [`SourceError`] during a probe
//! becomes an unknown hit count, during pagination it ends that one range, and
//! during attribute expansion it drops that one combo. [`StoreError`]s are
//! logged by the caller and never stop a crawl. Only [`ConfigError`] is fatal,
//! and only at startup.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Anything that went wrong talking to the upstream listing source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),

    /// The source answered, but with an explicit error payload.
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout
        } else if let Some(status) = e.status() {
            SourceError::Status(status.as_u16())
        } else if e.is_decode() {
            SourceError::Malformed(e.to_string())
        } else {
            SourceError::Transport(e.to_string())
        }
    }
}

/// Persisting pages or outcomes failed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("json encode failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io { path: path.into(), source }
    }
}

/// A range whose bounds are the wrong way round.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("range lower bound {lower} exceeds upper bound {upper}")]
pub struct RangeError {
    pub lower: i64,
    pub upper: i64,
}

/// Invalid or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("`{field}` must be at least 1")]
    Zero { field: &'static str },

    #[error("`{field}` delay bounds are inverted ({min_ms}ms > {max_ms}ms)")]
    InvertedDelay {
        field: &'static str,
        min_ms: u64,
        max_ms: u64,
    },

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error("dimension `{name}` has {size} values, at most {max} allowed")]
    VocabularyTooLarge { name: String, size: usize, max: usize },

    #[error("`{field}` is {value}, at most {max} allowed")]
    TooHigh { field: &'static str, value: u64, max: u64 },

    #[error("dimensions expand to {count} attribute combos, at most {max} allowed")]
    TooManyCombos { count: u128, max: u64 },

    #[error("dimension `{0}` has no values")]
    EmptyDimension(String),

    #[error("dimension `{0}` is listed more than once")]
    DuplicateDimension(String),

    #[error("source: {0}")]
    Source(String),
}
