// src/ingest/providers/rss.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::error::SourceError;
use crate::ingest::{headline_with_body, normalize_text};
use crate::ingest::providers::{apply_query_bounds, http::HttpFetcher};
use crate::ingest::types::{SourceAdapter, SourceQuery};
use crate::model::{FeedbackItem, Provenance};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    author: Option<String>,
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
}

/// Generic RSS 2.0 feed (forums, review sites exposing feeds, status blogs).
/// The feed URL comes from configuration; the source name is whatever the feed represents.
pub struct RssAdapter {
    source: String,
    url: String,
    http: HttpFetcher,
}

impl RssAdapter {
    pub fn new(source: impl Into<String>, url: impl Into<String>, http: HttpFetcher) -> Self {
        Self {
            source: source.into(),
            url: url.into(),
            http,
        }
    }

    /// Map an RSS document into items. Entries without usable text or date are skipped.
    pub fn parse_payload(source: &str, xml: &str) -> Result<Vec<FeedbackItem>, SourceError> {
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean)?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let text = normalize_text(&headline_with_body(
                it.title.as_deref().unwrap_or_default(),
                it.description.as_deref().unwrap_or_default(),
            ));
            let Some(ts) = it.pub_date.as_deref().and_then(parse_rfc2822) else {
                tracing::debug!(target: "ingest", source, "rss item without valid pubDate skipped");
                continue;
            };
            if text.is_empty() {
                continue;
            }
            let mut item = FeedbackItem::new(source, text, ts, Provenance::Real);
            if let Some(a) = it.author {
                item = item.with_author(a);
            }
            out.push(item);
        }
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for RssAdapter {
    async fn fetch_items(&self, query: &SourceQuery) -> Result<Vec<FeedbackItem>, SourceError> {
        let body = self.http.get_text(&self.source, &self.url, &[]).await?;
        let items = Self::parse_payload(&self.source, &body)?;
        Ok(apply_query_bounds(items, query))
    }

    fn name(&self) -> &str {
        &self.source
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Forum</title>
<item><title>App keeps crashing</title><description>Since the update it is &ldquo;slow&rdquo;</description>
<pubDate>Sat, 20 Jan 2024 10:00:00 +0000</pubDate><author>sam</author></item>
<item><title>No date here</title><description>skipped</description></item>
</channel></rss>"#;

    #[test]
    fn rss_items_map_to_feedback() {
        let items = RssAdapter::parse_payload("forum", FEED).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source(), "forum");
        assert_eq!(items[0].text(), r#"App keeps crashing. Since the update it is "slow""#);
        assert_eq!(items[0].author(), Some("sam"));
        assert_eq!(items[0].timestamp().timestamp(), 1_705_744_800);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = RssAdapter::parse_payload("forum", "<not-rss").unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }
}
