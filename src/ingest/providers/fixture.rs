// src/ingest/providers/fixture.rs
//! In-memory adapter for tests, demos and offline runs. Can be told to fail,
//! to fail a number of times before succeeding, or to stall.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::error::{FetchError, SourceError};
use crate::ingest::normalize_text;
use crate::ingest::providers::apply_query_bounds;
use crate::ingest::types::{SourceAdapter, SourceQuery};
use crate::model::{FeedbackItem, Provenance};

enum Behaviour {
    Items(Vec<FeedbackItem>),
    Fail(SourceError),
    /// Transport failure for the first `failures` calls, then the items.
    Flaky { failures: u32, items: Vec<FeedbackItem> },
}

pub struct StaticAdapter {
    name: String,
    behaviour: Behaviour,
    delay: Option<Duration>,
    calls: AtomicU32,
}

/// One record of a fixture file; provenance and source are set by the adapter.
#[derive(Debug, Deserialize)]
struct FixtureRecord {
    text: String,
    #[serde(default)]
    rating: Option<u8>,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    author: Option<String>,
}

impl StaticAdapter {
    fn with_behaviour(name: impl Into<String>, behaviour: Behaviour) -> Self {
        Self {
            name: name.into(),
            behaviour,
            delay: None,
            calls: AtomicU32::new(0),
        }
    }

    pub fn new(name: impl Into<String>, items: Vec<FeedbackItem>) -> Self {
        Self::with_behaviour(name, Behaviour::Items(items))
    }

    pub fn failing(name: impl Into<String>, err: SourceError) -> Self {
        Self::with_behaviour(name, Behaviour::Fail(err))
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    pub fn flaky(name: impl Into<String>, failures: u32, items: Vec<FeedbackItem>) -> Self {
        Self::with_behaviour(name, Behaviour::Flaky { failures, items })
    }

    /// Sleep before answering (exercises per-attempt timeouts).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Load `[{"text", "rating"?, "timestamp", "author"?}, ...]` as real items for `name`.
    pub fn from_json_file(name: impl Into<String>, path: &Path) -> Result<Self> {
        let name = name.into();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixture {}", path.display()))?;
        let records: Vec<FixtureRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing fixture {}", path.display()))?;
        let items = records
            .into_iter()
            .map(|r| {
                let mut it =
                    FeedbackItem::new(name.as_str(), normalize_text(&r.text), r.timestamp, Provenance::Real);
                if let Some(rt) = r.rating {
                    it = it.with_rating(rt);
                }
                if let Some(a) = r.author {
                    it = it.with_author(a);
                }
                it
            })
            .collect();
        Ok(Self::new(name, items))
    }

    /// Number of `fetch_items` calls so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for StaticAdapter {
    async fn fetch_items(&self, query: &SourceQuery) -> Result<Vec<FeedbackItem>, SourceError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        match &self.behaviour {
            Behaviour::Items(items) => Ok(apply_query_bounds(items.clone(), query)),
            Behaviour::Fail(e) => Err(e.clone()),
            Behaviour::Flaky { failures, items } => {
                if n <= *failures {
                    Err(FetchError::Transport(format!("flaky failure #{n}")).into())
                } else {
                    Ok(apply_query_bounds(items.clone(), query))
                }
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
