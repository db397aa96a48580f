// src/ingest/types.rs
use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::model::{FeedbackItem, SourceResult};

/// Default item bound per source when a query does not set one.
pub const DEFAULT_LIMIT: usize = 25;

/// Source-specific key the adapter searches for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum SourceIdentifier {
    AppId(String),
    CompanyName(String),
    SearchQuery(String),
}

impl SourceIdentifier {
    pub fn as_str(&self) -> &str {
        match self {
            SourceIdentifier::AppId(s)
            | SourceIdentifier::CompanyName(s)
            | SourceIdentifier::SearchQuery(s) => s,
        }
    }
}

/// What to fetch from one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceQuery {
    pub identifier: SourceIdentifier,
    /// Always positive; see [`SourceQuery::new`].
    pub limit: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range_days: Option<u32>,
}

impl SourceQuery {
    /// A zero limit falls back to [`DEFAULT_LIMIT`].
    pub fn new(identifier: SourceIdentifier, limit: usize) -> Self {
        Self {
            identifier,
            limit: if limit == 0 { DEFAULT_LIMIT } else { limit },
            time_range_days: None,
        }
    }

    pub fn with_time_range_days(mut self, days: u32) -> Self {
        self.time_range_days = Some(days);
        self
    }
}

/// Capability to fetch feedback for one external source.
///
/// Implementations map vendor payloads into [`FeedbackItem`] with `Provenance::Real`
/// and report failures as values; they never panic past this boundary.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch_items(&self, query: &SourceQuery) -> Result<Vec<FeedbackItem>, SourceError>;

    /// Canonical source identifier, e.g. `"app_store"`.
    fn name(&self) -> &str;

    /// One attempt folded into a [`SourceResult`].
    async fn fetch(&self, query: &SourceQuery) -> SourceResult {
        let outcome = self.fetch_items(query).await;
        SourceResult::from_fetch(self.name(), outcome, 1)
    }
}
