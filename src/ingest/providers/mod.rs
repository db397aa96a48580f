// src/ingest/providers/mod.rs
pub mod app_store;
pub mod fixture;
pub mod hacker_news;
pub mod http;
pub mod reddit;
pub mod rss;

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::error::ConfigError;
use crate::ingest::config::{SourceConfig, SourceKind};
use crate::ingest::sink::RawArchive;
use crate::ingest::types::{SourceAdapter, SourceQuery};
use crate::model::FeedbackItem;

/// Drop items outside the query's time range and cap at its limit.
pub fn apply_query_bounds(items: Vec<FeedbackItem>, query: &SourceQuery) -> Vec<FeedbackItem> {
    let cutoff = query
        .time_range_days
        .map(|d| Utc::now() - ChronoDuration::days(i64::from(d)));
    items
        .into_iter()
        .filter(|it| cutoff.is_none_or(|c| it.timestamp() >= c))
        .take(query.limit)
        .collect()
}

/// Build the adapter a source entry describes.
pub fn build_adapter(
    cfg: &SourceConfig,
    request_timeout: Duration,
    archive: Option<Arc<dyn RawArchive>>,
) -> Result<Arc<dyn SourceAdapter>, ConfigError> {
    let fetcher = || -> Result<http::HttpFetcher, ConfigError> {
        Ok(http::HttpFetcher::new(request_timeout)
            .map_err(|e| ConfigError::Load(e.to_string()))?
            .with_bearer(cfg.bearer_token.clone())
            .with_archive(archive.clone()))
    };

    let adapter: Arc<dyn SourceAdapter> = match cfg.kind {
        SourceKind::Static => {
            let path = cfg
                .fixture
                .as_deref()
                .ok_or_else(|| ConfigError::Load(format!("source {}: static kind needs `fixture`", cfg.name)))?;
            let a = fixture::StaticAdapter::from_json_file(cfg.name.as_str(), path)
                .map_err(|e| ConfigError::Load(format!("{e:#}")))?;
            Arc::new(a)
        }
        SourceKind::AppStore => {
            let mut a = app_store::AppStoreAdapter::new(cfg.name.as_str(), fetcher()?);
            if let Some(u) = &cfg.url {
                a = a.with_base_url(u.as_str());
            }
            Arc::new(a)
        }
        SourceKind::Reddit => {
            let mut a = reddit::RedditAdapter::new(cfg.name.as_str(), fetcher()?);
            if let Some(u) = &cfg.url {
                a = a.with_base_url(u.as_str());
            }
            Arc::new(a)
        }
        SourceKind::HackerNews => {
            let mut a = hacker_news::HackerNewsAdapter::new(cfg.name.as_str(), fetcher()?);
            if let Some(u) = &cfg.url {
                a = a.with_base_url(u.as_str());
            }
            Arc::new(a)
        }
        SourceKind::Rss => {
            let url = cfg
                .url
                .as_deref()
                .ok_or_else(|| ConfigError::Load(format!("source {}: rss kind needs `url`", cfg.name)))?;
            Arc::new(rss::RssAdapter::new(cfg.name.as_str(), url, fetcher()?))
        }
    };
    Ok(adapter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::SourceIdentifier;
    use crate::model::Provenance;

    #[test]
    fn bounds_filter_by_age_then_limit() {
        let now = Utc::now();
        let items: Vec<_> = (0..5)
            .map(|i| {
                FeedbackItem::new(
                    "x",
                    format!("item {i}"),
                    now - ChronoDuration::days(i * 10),
                    Provenance::Real,
                )
            })
            .collect();
        let q = SourceQuery::new(SourceIdentifier::SearchQuery("x".into()), 2).with_time_range_days(25);
        let kept = apply_query_bounds(items.clone(), &q);
        assert_eq!(kept.len(), 2);

        let q_all = SourceQuery::new(SourceIdentifier::SearchQuery("x".into()), 10).with_time_range_days(25);
        assert_eq!(apply_query_bounds(items, &q_all).len(), 3);
    }
}
