//! Error taxonomy for collection, aggregation and configuration.
//!
//! Only [`ConfigError`] is fatal to a run. Everything a single source can produce
//! ([`FetchError`], [`SourceError`]) is recovered by the orchestrator, and
//! [`AggregationError`] only drops the offending item.

use thiserror::Error;

/// Failure inside one adapter call (transport, timeout, auth, HTTP status).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out after {0} ms")]
    Timeout(u64),

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),
}

/// Outcome class of an unsuccessful source attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Syntactically valid call that produced zero items.
    #[error("source returned no items")]
    Empty,

    /// Vendor payload could not be mapped into feedback items.
    #[error("malformed payload: {0}")]
    Parse(String),
}

impl SourceError {
    /// Transport failures and timeouts are worth another attempt; the rest are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SourceError::Fetch(FetchError::Transport(_))
                | SourceError::Fetch(FetchError::Timeout(_))
                | SourceError::Fetch(FetchError::Status(500..=599))
        )
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(err.to_string())
    }
}

impl From<quick_xml::DeError> for SourceError {
    fn from(err: quick_xml::DeError) -> Self {
        SourceError::Parse(err.to_string())
    }
}

/// A malformed item met during the merge; the item is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    #[error("item {id} from {origin} has empty text")]
    EmptyText { id: String, origin: String },

    #[error("item {id} from {origin} has rating {rating} outside 1..=5")]
    RatingOutOfRange {
        id: String,
        origin: String,
        rating: u8,
    },
}

/// Run-fatal configuration problems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("no sources configured")]
    NoSources,

    #[error("source {0}: limit must be positive")]
    InvalidLimit(String),

    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error("configuration error: {0}")]
    Load(String),
}
