// src/ingest/providers/reddit.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::SourceError;
use crate::ingest::normalize_text;
use crate::ingest::providers::{apply_query_bounds, http::HttpFetcher};
use crate::ingest::types::{SourceAdapter, SourceQuery};
use crate::model::{Engagement, FeedbackItem, Provenance};

pub const DEFAULT_BASE_URL: &str = "https://www.reddit.com";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    author: Option<String>,
    created_utc: f64,
    #[serde(default)]
    ups: i64,
    #[serde(default)]
    num_comments: u64,
}

/// Reddit site-wide search for a product or company name.
pub struct RedditAdapter {
    source: String,
    base_url: String,
    http: HttpFetcher,
}

impl RedditAdapter {
    pub fn new(source: impl Into<String>, http: HttpFetcher) -> Self {
        Self {
            source: source.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn parse_payload(source: &str, json: &str) -> Result<Vec<FeedbackItem>, SourceError> {
        let listing: Listing = serde_json::from_str(json)?;
        let mut out = Vec::with_capacity(listing.data.children.len());
        for Child { data: p } in listing.data.children {
            let text = normalize_text(&format!("{}\n{}", p.title, p.selftext));
            let Some(ts) = DateTime::<Utc>::from_timestamp(p.created_utc as i64, 0) else {
                continue;
            };
            if text.is_empty() {
                continue;
            }
            let mut item = FeedbackItem::new(source, text, ts, Provenance::Real).with_engagement(
                Engagement {
                    upvotes: Some(p.ups.max(0) as u64),
                    replies: Some(p.num_comments),
                    ..Default::default()
                },
            );
            if let Some(a) = p.author {
                item = item.with_author(a);
            }
            out.push(item);
        }
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for RedditAdapter {
    async fn fetch_items(&self, query: &SourceQuery) -> Result<Vec<FeedbackItem>, SourceError> {
        let url = format!("{}/search.json", self.base_url.trim_end_matches('/'));
        let params = [
            ("q", query.identifier.as_str().to_string()),
            ("sort", "relevance".to_string()),
            ("limit", query.limit.to_string()),
        ];
        let body = self.http.get_text(self.name(), &url, &params).await?;
        let items = Self::parse_payload(&self.source, &body)?;
        Ok(apply_query_bounds(items, query))
    }

    fn name(&self) -> &str {
        &self.source
    }
}
