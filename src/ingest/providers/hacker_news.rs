// src/ingest/providers/hacker_news.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::SourceError;
use crate::ingest::{headline_with_body, normalize_text};
use crate::ingest::providers::{apply_query_bounds, http::HttpFetcher};
use crate::ingest::types::{SourceAdapter, SourceQuery};
use crate::model::{Engagement, FeedbackItem, Provenance};

pub const DEFAULT_BASE_URL: &str = "https://hn.algolia.com/api/v1";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    title: Option<String>,
    comment_text: Option<String>,
    story_text: Option<String>,
    author: Option<String>,
    created_at: String,
    points: Option<i64>,
    num_comments: Option<u64>,
}

/// Hacker News stories and comments via the Algolia search API.
pub struct HackerNewsAdapter {
    source: String,
    base_url: String,
    http: HttpFetcher,
}

impl HackerNewsAdapter {
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
        let resp: SearchResponse = serde_json::from_str(json)?;
        let mut out = Vec::with_capacity(resp.hits.len());
        for h in resp.hits {
            // comments carry their text in comment_text; stories in title (+ story_text)
            let raw = match (&h.comment_text, &h.title) {
                (Some(c), _) => c.clone(),
                (None, Some(t)) => headline_with_body(t, h.story_text.as_deref().unwrap_or_default()),
                (None, None) => continue,
            };
            let text = normalize_text(&raw);
            let Ok(ts) = DateTime::parse_from_rfc3339(&h.created_at) else {
                continue;
            };
            if text.is_empty() {
                continue;
            }
            let mut item = FeedbackItem::new(source, text, ts.with_timezone(&Utc), Provenance::Real)
                .with_engagement(Engagement {
                    likes: h.points.map(|p| p.max(0) as u64),
                    replies: h.num_comments,
                    ..Default::default()
                });
            if let Some(a) = h.author {
                item = item.with_author(a);
            }
            out.push(item);
        }
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for HackerNewsAdapter {
    async fn fetch_items(&self, query: &SourceQuery) -> Result<Vec<FeedbackItem>, SourceError> {
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        let params = [
            ("query", query.identifier.as_str().to_string()),
            ("tags", "(story,comment)".to_string()),
            ("hitsPerPage", query.limit.to_string()),
        ];
        let body = self.http.get_text(self.name(), &url, &params).await?;
        let items = Self::parse_payload(&self.source, &body)?;
        Ok(apply_query_bounds(items, query))
    }

    fn name(&self) -> &str {
        &self.source
    }
}
