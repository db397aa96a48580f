// src/ingest/providers/app_store.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::SourceError;
use crate::ingest::{headline_with_body, normalize_text};
use crate::ingest::providers::{apply_query_bounds, http::HttpFetcher};
use crate::ingest::types::{SourceAdapter, SourceQuery};
use crate::model::{Engagement, FeedbackItem, Provenance};

pub const DEFAULT_BASE_URL: &str = "https://itunes.apple.com";

// The iTunes customer-review feed wraps every scalar in `{"label": ...}` and
// collapses a one-entry list into a bare object.
#[derive(Debug, Deserialize)]
struct Feed {
    feed: Inner,
}

#[derive(Debug, Deserialize)]
struct Inner {
    #[serde(default)]
    entry: Option<OneOrMany<Entry>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

#[derive(Debug, Deserialize)]
struct Label {
    label: String,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: Option<Label>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    author: Option<Author>,
    updated: Option<Label>,
    #[serde(rename = "im:rating")]
    rating: Option<Label>,
    #[serde(rename = "im:voteSum")]
    vote_sum: Option<Label>,
    title: Option<Label>,
    content: Option<Label>,
}

/// Apple App Store reviews for one app id.
pub struct AppStoreAdapter {
    source: String,
    base_url: String,
    country: String,
    http: HttpFetcher,
}

impl AppStoreAdapter {
    pub fn new(source: impl Into<String>, http: HttpFetcher) -> Self {
        Self {
            source: source.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            country: "us".to_string(),
            http,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    /// Vendor ratings pass through as-is; aggregation rejects anything outside 1..=5.
    pub fn parse_payload(source: &str, json: &str) -> Result<Vec<FeedbackItem>, SourceError> {
        let feed: Feed = serde_json::from_str(json)?;
        let entries = match feed.feed.entry {
            None => Vec::new(),
            Some(OneOrMany::One(e)) => vec![e],
            Some(OneOrMany::Many(v)) => v,
        };

        let mut out = Vec::with_capacity(entries.len());
        for e in entries {
            // Entries without a rating are the app-description header, not reviews.
            let Some(rating) = e.rating.and_then(|r| r.label.trim().parse::<u8>().ok()) else {
                continue;
            };
            let Some(ts) = e
                .updated
                .and_then(|u| DateTime::parse_from_rfc3339(u.label.trim()).ok())
                .map(|d| d.with_timezone(&Utc))
            else {
                continue;
            };
            let text = normalize_text(&headline_with_body(
                &e.title.map(|l| l.label).unwrap_or_default(),
                &e.content.map(|l| l.label).unwrap_or_default(),
            ));
            if text.is_empty() {
                continue;
            }
            let mut item = FeedbackItem::new(source, text, ts, Provenance::Real).with_rating(rating);
            if let Some(name) = e.author.and_then(|a| a.name) {
                item = item.with_author(name.label);
            }
            if let Some(votes) = e.vote_sum.and_then(|v| v.label.parse::<u64>().ok()) {
                item = item.with_engagement(Engagement {
                    likes: Some(votes),
                    ..Default::default()
                });
            }
            out.push(item);
        }
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for AppStoreAdapter {
    async fn fetch_items(&self, query: &SourceQuery) -> Result<Vec<FeedbackItem>, SourceError> {
        let url = format!(
            "{}/{}/rss/customerreviews/page=1/id={}/sortby=mostrecent/json",
            self.base_url.trim_end_matches('/'),
            self.country,
            query.identifier.as_str()
        );
        let body = self.http.get_text(self.name(), &url, &[]).await?;
        let items = Self::parse_payload(&self.source, &body)?;
        Ok(apply_query_bounds(items, query))
    }

    fn name(&self) -> &str {
        &self.source
    }
}
